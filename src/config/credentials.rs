use tracing::warn;

const REDACTED: &str = "[REDACTED]";

/// Resolve `$NAME` or `${NAME}` references against the environment.
///
/// Plain values pass through. A reference to an unset or empty variable
/// yields `None` so the missing key surfaces as an auth failure instead of
/// being sent to the model endpoint verbatim.
pub fn resolve_credential(value: &str) -> Option<String> {
    let Some(reference) = value.strip_prefix('$') else {
        return Some(value.to_string());
    };
    let name = reference
        .strip_prefix('{')
        .and_then(|r| r.strip_suffix('}'))
        .unwrap_or(reference);
    match std::env::var(name) {
        Ok(resolved) if !resolved.trim().is_empty() => Some(resolved),
        _ => {
            warn!(var = %name, "Credential references an unset environment variable");
            None
        }
    }
}

/// Short display form of a key: first and last four characters.
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

/// Scrub secrets out of text bound for logs or error bodies.
/// Secrets shorter than 4 characters are ignored.
pub fn redact_credentials(text: &str, secrets: &[&str]) -> String {
    secrets
        .iter()
        .filter(|s| s.len() >= 4)
        .fold(text.to_string(), |acc, secret| acc.replace(secret, REDACTED))
}
