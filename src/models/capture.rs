use base64::Engine as _;
use serde::{Deserialize, Serialize};

/// Which screenshot strategy produced the capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreenshotMode {
    Requested,
    ViewportHigh,
    ViewportLow,
    FullLow,
    Pdf,
    None,
}

impl ScreenshotMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Requested => "requested",
            Self::ViewportHigh => "viewport_high",
            Self::ViewportLow => "viewport_low",
            Self::FullLow => "full_low",
            Self::Pdf => "pdf",
            Self::None => "none",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationMeta {
    pub requested_url: String,
    pub final_url: String,
    pub status_code: Option<u16>,
    pub title: String,
    pub wait_condition_used: String,
    pub screenshot_mode: ScreenshotMode,
    pub auto_scroll: bool,
    pub scroll_steps: u32,
    pub content_type: Option<String>,
}

/// Snapshot of one rendered resource. Built once by the capture engine and
/// never mutated afterwards.
#[derive(Debug, Clone)]
pub struct CaptureResult {
    /// JPEG bytes; empty for documents and raw fetches.
    pub screenshot: Vec<u8>,
    pub html: String,
    pub text: String,
    /// Serialized accessibility tree, empty when unavailable.
    pub accessibility: String,
    pub image_urls: Vec<String>,
    pub meta: NavigationMeta,
}

impl CaptureResult {
    pub fn has_screenshot(&self) -> bool {
        !self.screenshot.is_empty()
    }

    pub fn screenshot_base64(&self) -> Option<String> {
        if self.screenshot.is_empty() {
            None
        } else {
            Some(base64::engine::general_purpose::STANDARD.encode(&self.screenshot))
        }
    }
}
