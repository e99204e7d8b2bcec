use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::process::Command;

pub const PDF_MAX_PAGES: u32 = 100;
const PDF_TIMEOUT_SECS: u64 = 30;

/// Downloads `pdf_url` to `{save_dir}/{arxiv_id}.pdf`, reusing a file that is already there.
/// The body goes to `{arxiv_id}.pdf.part` first. Failures are logged and yield `None`.
pub async fn download_pdf(http: &reqwest::Client, pdf_url: &str, save_dir: &Path, arxiv_id: &str) -> Option<PathBuf> {
    let pdf_path = save_dir.join(format!("{}.pdf", arxiv_id.replace('/', "_")));
    if tokio::fs::try_exists(&pdf_path).await.unwrap_or(false) {
        tracing::debug!("[download_pdf] Reusing {}", pdf_path.display());
        return Some(pdf_path);
    }

    let response = http
        .get(pdf_url)
        .timeout(Duration::from_secs(PDF_TIMEOUT_SECS))
        .send()
        .await
        .and_then(|r| r.error_for_status());

    let bytes = match response {
        Ok(response) => match response.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!("[download_pdf] Failed to read {}: {}", pdf_url, e);
                return None;
            }
        },
        Err(e) => {
            tracing::warn!("[download_pdf] Failed to download {}: {}", pdf_url, e);
            return None;
        }
    };

    // Only a complete download is moved to `pdf_path`, which is what the reuse check looks for.
    let part_path = pdf_path.with_extension("pdf.part");
    let written = match tokio::fs::write(&part_path, &bytes).await {
        Ok(()) => tokio::fs::rename(&part_path, &pdf_path).await,
        Err(e) => Err(e),
    };
    if let Err(e) = written {
        tracing::warn!("[download_pdf] Failed to write {}: {}", pdf_path.display(), e);
        let _ = tokio::fs::remove_file(&part_path).await;
        return None;
    }

    tracing::info!("[download_pdf] Saved {} ({} bytes)", pdf_path.display(), bytes.len());
    Some(pdf_path)
}

/// Text of the first pages of a PDF via `pdftotext`. `None` when the tool fails or finds no text.
pub async fn extract_text(pdf_path: &Path) -> Option<String> {
    let output = Command::new("pdftotext")
        .arg("-l")
        .arg(PDF_MAX_PAGES.to_string())
        .arg("-enc")
        .arg("UTF-8")
        .arg(pdf_path)
        .arg("-")
        .output()
        .await;

    let output = match output {
        Ok(output) => output,
        Err(e) => {
            tracing::warn!("[extract_text] Failed to launch pdftotext: {}", e);
            return None;
        }
    };

    if !output.status.success() {
        tracing::warn!(
            "[extract_text] pdftotext exited with {} for {}",
            output.status,
            pdf_path.display()
        );
        return None;
    }

    let text = String::from_utf8_lossy(&output.stdout).into_owned();
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}
