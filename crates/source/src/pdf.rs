//! PDF text extraction

use std::path::Path;
use summarist_common::{Result, SummaristError};
use tracing::{debug, info};

/// Check if file extension is PDF
pub fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

/// Concatenate page texts; pages without text contribute nothing
pub fn join_pages<I>(pages: I) -> String
where
    I: IntoIterator<Item = String>,
{
    pages
        .into_iter()
        .filter(|page| !page.trim().is_empty())
        .collect()
}

/// Extract the text of every page of a PDF file
///
/// Parsing is CPU-bound and runs on a blocking thread.
pub async fn extract_text(path: &Path) -> Result<String> {
    // Surface a missing file as IO, not as a parse failure
    tokio::fs::metadata(path).await?;

    let path_buf = path.to_path_buf();
    let pages = tokio::task::spawn_blocking(move || {
        pdf_extract::extract_text_by_pages(&path_buf)
            .map_err(|e| SummaristError::extraction(format!("{}: {}", path_buf.display(), e)))
    })
    .await
    .map_err(|e| anyhow::anyhow!("PDF extraction task failed: {}", e))??;

    let page_count = pages.len();
    let text = join_pages(pages);
    info!(
        "Extracted {} chars from {} pages of {}",
        text.chars().count(),
        page_count,
        path.display()
    );
    debug!("PDF text preview: {:?}", text.chars().take(80).collect::<String>());

    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_pdf() {
        assert!(is_pdf(Path::new("apjspeech.pdf")));
        assert!(is_pdf(Path::new("/tmp/REPORT.PDF")));
        assert!(!is_pdf(Path::new("speech.txt")));
        assert!(!is_pdf(Path::new("pdf")));
    }

    #[test]
    fn test_join_pages_skips_empty() {
        let pages = vec![
            "First page. ".to_string(),
            String::new(),
            "\n".to_string(),
            "Last page.".to_string(),
        ];
        assert_eq!(join_pages(pages), "First page. Last page.");
    }

    #[tokio::test]
    async fn test_missing_file() {
        let err = extract_text(Path::new("/nonexistent/speech.pdf")).await.unwrap_err();
        assert!(matches!(err, SummaristError::Io(_)));
    }
}
