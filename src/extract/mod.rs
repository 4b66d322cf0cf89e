use log::{ info, warn };
use std::io::Write;

/// Extracts the text layer of an uploaded PDF.
///
/// The upload is staged in a uniquely named temporary file that is removed
/// when extraction finishes. Each non-blank page is prefixed with a page
/// banner. Any failure, including a parser panic on malformed input, yields
/// an empty string; callers treat that as "no extractable text".
pub async fn extract_text(bytes: Vec<u8>) -> String {
    if bytes.is_empty() {
        return String::new();
    }

    let result = tokio::task::spawn_blocking(move || extract_pages(&bytes)).await;
    match result {
        Ok(Ok(pages)) => {
            let text = join_pages(&pages);
            info!("Extracted {} characters from {} page(s)", text.len(), pages.len());
            text
        }
        Ok(Err(e)) => {
            warn!("Document extraction failed: {}", e);
            String::new()
        }
        Err(e) => {
            warn!("Document extraction aborted: {}", e);
            String::new()
        }
    }
}

fn extract_pages(bytes: &[u8]) -> Result<Vec<String>, String> {
    let mut staged = tempfile::Builder::new()
        .prefix("upload-")
        .suffix(".pdf")
        .tempfile()
        .map_err(|e| format!("failed to create temp file: {}", e))?;
    staged.write_all(bytes).map_err(|e| format!("failed to stage upload: {}", e))?;
    staged.flush().map_err(|e| format!("failed to stage upload: {}", e))?;

    let staged_bytes = std::fs::read(staged.path())
        .map_err(|e| format!("failed to read staged upload: {}", e))?;
    pdf_extract::extract_text_from_mem_by_pages(&staged_bytes).map_err(|e| e.to_string())
}

/// Joins page texts with `--- Page N ---` banners, skipping blank pages.
/// Returns an empty string when every page is blank.
pub fn join_pages(pages: &[String]) -> String {
    let mut out = String::new();
    for (i, text) in pages.iter().enumerate() {
        let text = text.trim();
        if text.is_empty() {
            continue;
        }
        out.push_str(&format!("--- Page {} ---\n{}\n\n", i + 1, text));
    }
    out.trim_end().to_string()
}


#[cfg(test)]
mod tests {
    use super::testing::one_page_pdf;
    use super::*;

    #[tokio::test]
    async fn text_layer_comes_back_under_page_banner() {
        let text = extract_text(one_page_pdf("Quarterly revenue grew")).await;
        assert!(text.starts_with("--- Page 1 ---\n"), "got {text:?}");
        assert!(text.contains("Quarterly revenue grew"), "got {text:?}");
        assert!(!text.contains("--- Page 2 ---"));
    }

    #[tokio::test]
    async fn empty_upload_yields_empty_text() {
        assert_eq!(extract_text(Vec::new()).await, "");
    }

    #[tokio::test]
    async fn corrupt_upload_yields_empty_text() {
        let garbage = b"%PDF-1.4\nthis is not really a pdf".to_vec();
        assert_eq!(extract_text(garbage).await, "");
        assert_eq!(extract_text(b"plain text file".to_vec()).await, "");
    }

    #[test]
    fn pages_get_numbered_banners() {
        let pages = vec!["First page".to_string(), "  ".to_string(), "Third\n".to_string()];
        assert_eq!(
            join_pages(&pages),
            "--- Page 1 ---\nFirst page\n\n--- Page 3 ---\nThird"
        );
    }

    #[test]
    fn all_blank_pages_join_to_empty() {
        let pages = vec![String::new(), " \n ".to_string()];
        assert_eq!(join_pages(&pages), "");
    }
}
