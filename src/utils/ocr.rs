use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tracing::debug;

use crate::config::OcrConfig;
use crate::source::SourceError;

/// Fail early when an external tool is missing.
///
/// Install hints:
/// - Linux: sudo apt-get install tesseract-ocr poppler-utils
/// - Mac: brew install tesseract poppler
pub fn check_tool(program: &Path, version_arg: &str) -> Result<()> {
    let output = Command::new(program).arg(version_arg).output();

    if output.is_err() {
        anyhow::bail!(
            "{:?} is not installed or not in PATH. \
             Tesseract: https://github.com/tesseract-ocr/tesseract, \
             poppler-utils: https://poppler.freedesktop.org",
            program
        );
    }
    Ok(())
}

/// Parse the `Pages:` line out of pdfinfo output
pub fn parse_page_count(pdfinfo_stdout: &str) -> Option<u32> {
    pdfinfo_stdout.lines().find_map(|line| {
        line.strip_prefix("Pages:")
            .and_then(|rest| rest.trim().parse().ok())
    })
}

pub fn pdf_page_count(pdf: &Path, config: &OcrConfig) -> Result<u32> {
    let output = Command::new(&config.pdfinfo_cmd)
        .arg(pdf)
        .output()
        .with_context(|| format!("Failed to run {:?} on {:?}", config.pdfinfo_cmd, pdf))?;

    if !output.status.success() {
        anyhow::bail!("pdfinfo failed on {:?}: {}", pdf, stderr_of(&output));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    parse_page_count(&stdout)
        .with_context(|| format!("pdfinfo reported no page count for {:?}", pdf))
}

/// Render one page to `<work_dir>/page-<n>.png`
pub fn render_page(
    pdf: &Path,
    page: u32,
    config: &OcrConfig,
    work_dir: &Path,
) -> Result<PathBuf, SourceError> {
    let prefix = work_dir.join(format!("page-{}", page));
    let number = page.to_string();

    let output = Command::new(&config.pdftoppm_cmd)
        .arg("-r")
        .arg(config.dpi.to_string())
        .arg("-f")
        .arg(&number)
        .arg("-l")
        .arg(&number)
        .arg("-png")
        .arg("-singlefile")
        .arg(pdf)
        .arg(&prefix)
        .output()
        .map_err(|e| SourceError::Render {
            page,
            reason: e.to_string(),
        })?;

    if !output.status.success() {
        return Err(SourceError::Render {
            page,
            reason: stderr_of(&output),
        });
    }

    let image = prefix.with_extension("png");
    if !image.is_file() {
        return Err(SourceError::Render {
            page,
            reason: format!("no image written at {:?}", image),
        });
    }

    debug!("Rendered page {} to {:?}", page, image);
    Ok(image)
}

/// Run Tesseract on one page image and return its text
pub fn recognize(image: &Path, page: u32, config: &OcrConfig) -> Result<String, SourceError> {
    let output = Command::new(&config.tesseract_cmd)
        .arg(image)
        .arg("stdout")
        .arg("-l")
        .arg(&config.language)
        .arg("--psm")
        .arg(config.psm.to_string())
        .output()
        .map_err(|e| SourceError::Ocr {
            page,
            reason: e.to_string(),
        })?;

    if !output.status.success() {
        return Err(SourceError::Ocr {
            page,
            reason: stderr_of(&output),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn stderr_of(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();
    if stderr.is_empty() {
        format!("exited with {}", output.status)
    } else {
        stderr.to_string()
    }
}
