use std::collections::VecDeque;

use crate::models::StopReason;

pub const LOOP_WINDOW: usize = 4;

/// Stop conditions checked after every executed step. Loop detection runs
/// before block detection.
#[derive(Debug, Default)]
pub struct Guardrails {
    recent_urls: VecDeque<String>,
}

impl Guardrails {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&mut self, observed_url: &str, step_error: Option<&str>) -> Option<StopReason> {
        self.recent_urls.push_back(observed_url.to_string());
        if self.recent_urls.len() > LOOP_WINDOW {
            self.recent_urls.pop_front();
        }

        if self.recent_urls.len() == LOOP_WINDOW && self.recent_urls.iter().all(|u| u == observed_url) {
            return Some(StopReason::SameUrlLoop);
        }
        if step_error.is_some_and(|e| e.to_lowercase().contains("captcha")) {
            return Some(StopReason::CaptchaOrBlocked);
        }
        None
    }
}
