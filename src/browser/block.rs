use regex::Regex;
use std::sync::LazyLock;

use crate::utils::head_chars;

static BLOCK_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    [
        r"\bcaptcha\b",
        r"cloudflare",
        r"access denied",
        r"attention required",
        r"verify you are human",
        r"incapsula",
        r"bot detection",
        r"unusual traffic",
    ]
    .into_iter()
    .filter_map(|p| Regex::new(p).ok().map(|re| (p, re)))
    .collect()
});

const BLOCKING_STATUSES: [u16; 4] = [401, 403, 429, 503];

/// Reason the page looks like an anti-bot wall, if it does.
pub fn detect_block_reason(
    html: &str,
    text: &str,
    title: &str,
    final_url: &str,
    status: Option<u16>,
) -> Option<String> {
    let candidate = [head_chars(html, 8_000), head_chars(text, 4_000), title, final_url]
        .join(" ")
        .to_lowercase();

    for (pattern, re) in BLOCK_PATTERNS.iter() {
        if re.is_match(&candidate) {
            return Some(format!("Possible block detected ({})", pattern));
        }
    }
    match status {
        Some(code) if BLOCKING_STATUSES.contains(&code) => {
            Some(format!("HTTP status indicates blocking: {}", code))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_page_passes() {
        assert_eq!(detect_block_reason("<html>shop</html>", "Products", "Shop", "https://shop.example", Some(200)), None);
    }

    #[test]
    fn test_captcha_word_boundary() {
        assert!(detect_block_reason("", "Please solve the CAPTCHA", "", "https://a.example", Some(200)).is_some());
        assert_eq!(detect_block_reason("", "recaptchas are fun", "", "https://a.example", Some(200)), None);
    }

    #[test]
    fn test_title_and_url_scanned() {
        let reason = detect_block_reason("", "", "Attention Required! | Cloudflare", "https://a.example", None).unwrap();
        assert!(reason.contains("cloudflare"));
        assert!(detect_block_reason("", "", "", "https://a.example/sorry/unusual traffic", None).is_some());
    }

    #[test]
    fn test_blocking_status_codes() {
        for code in [401, 403, 429, 503] {
            let reason = detect_block_reason("", "", "", "https://a.example", Some(code)).unwrap();
            assert!(reason.ends_with(&code.to_string()));
        }
        assert_eq!(detect_block_reason("", "", "", "https://a.example", Some(404)), None);
    }

    #[test]
    fn test_only_html_head_scanned() {
        let html = format!("{}access denied", "x".repeat(9_000));
        assert_eq!(detect_block_reason(&html, "", "", "https://a.example", Some(200)), None);
    }
}
