use crate::errors::ScrapeError;
use crate::utils::head_chars;

pub fn is_pdf(content_type: Option<&str>, url: &str) -> bool {
    content_type.map(|ct| ct.to_lowercase().contains("application/pdf")).unwrap_or(false)
        || url.to_lowercase().ends_with(".pdf")
}

/// Text of a PDF document. Parsing runs on the blocking pool.
pub async fn extract_pdf_text(bytes: Vec<u8>) -> Result<String, ScrapeError> {
    tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
        .await
        .map_err(|e| ScrapeError::Network(format!("PDF parser aborted: {}", e)))?
        .map_err(|e| ScrapeError::Network(format!("Could not read PDF: {}", e)))
}

/// Minimal HTML page standing in for a document with no DOM.
pub fn synthetic_html(url: &str, text: &str) -> String {
    format!(
        "<html><body><h1>PDF content: {}</h1><pre>{}...</pre></body></html>",
        url,
        head_chars(text, 2_000)
    )
}

pub fn document_title(url: &str) -> String {
    let last = url.trim_end_matches('/').rsplit('/').next().unwrap_or(url);
    format!("PDF: {}", last)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_pdf() {
        assert!(is_pdf(Some("application/pdf; charset=binary"), "https://a.example/doc"));
        assert!(is_pdf(None, "https://a.example/Report.PDF"));
        assert!(!is_pdf(Some("text/html"), "https://a.example/pdfs"));
    }

    #[test]
    fn test_synthetic_html_truncates() {
        let html = synthetic_html("https://a.example/x.pdf", &"z".repeat(5_000));
        assert!(html.starts_with("<html><body><h1>PDF content: https://a.example/x.pdf</h1><pre>"));
        assert!(html.contains(&format!("{}...</pre>", "z".repeat(2_000))));
        assert!(!html.contains(&"z".repeat(2_001)));
    }

    #[test]
    fn test_document_title() {
        assert_eq!(document_title("https://a.example/files/annual.pdf"), "PDF: annual.pdf");
    }

    #[tokio::test]
    async fn test_garbage_pdf_is_network_error() {
        let err = extract_pdf_text(b"not a pdf".to_vec()).await.unwrap_err();
        assert!(matches!(err, ScrapeError::Network(_)));
    }
}
