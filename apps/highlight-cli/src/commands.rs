//! Subcommand implementations

use anyhow::{bail, Context};
use highlight_core::{
    create_highlighted_pdf_with_style, execute_json, extract_text, find_highlights,
    is_image_only, Highlight, HighlightError, HighlightStyle,
};
use std::fs;
use std::path::Path;

pub fn read_pdf(path: &Path) -> anyhow::Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Key phrases from repeated `--phrase` flags plus one phrase per non-blank
/// line of an optional file.
pub fn collect_phrases(
    phrases: &[String],
    phrases_file: Option<&Path>,
) -> anyhow::Result<Vec<String>> {
    let mut all = phrases.to_vec();
    if let Some(path) = phrases_file {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read phrases file: {}", path.display()))?;
        all.extend(
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string),
        );
    }
    Ok(all)
}

/// Plain text of a PDF; scanned documents are an error unless `allow_empty`.
pub fn extract(input: &Path, allow_empty: bool) -> anyhow::Result<String> {
    let bytes = read_pdf(input)?;
    let text = extract_text(&bytes).with_context(|| format!("Cannot extract {}", input.display()))?;
    if is_image_only(&text) && !allow_empty {
        return Err(HighlightError::ImageOnlyDocument)
            .with_context(|| format!("{} has no text layer", input.display()));
    }
    Ok(text)
}

/// Highlights for `phrases`, multiplied by `scale` for display.
pub fn locate(input: &Path, phrases: &[String], scale: f64) -> anyhow::Result<Vec<Highlight>> {
    if !(scale.is_finite() && scale > 0.0) {
        bail!("Scale must be a positive number, got {}", scale);
    }
    let bytes = read_pdf(input)?;
    let highlights = find_highlights(&bytes, phrases)
        .with_context(|| format!("Cannot locate phrases in {}", input.display()))?;
    Ok(highlights.iter().map(|h| h.scaled(scale)).collect())
}

/// Draw `highlights` into a copy of `input` and write it to `output`.
pub fn annotate(
    input: &Path,
    highlights: &[Highlight],
    style: &HighlightStyle,
    output: &Path,
) -> anyhow::Result<()> {
    let bytes = read_pdf(input)?;
    let highlighted = create_highlighted_pdf_with_style(&bytes, highlights, style)
        .with_context(|| format!("Cannot highlight {}", input.display()))?;
    fs::write(output, highlighted)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    tracing::info!("Wrote {}", output.display());
    Ok(())
}

pub fn read_highlights(path: &Path) -> anyhow::Result<Vec<Highlight>> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read highlights file: {}", path.display()))?;
    Highlight::from_json(&json)
        .with_context(|| format!("Invalid highlights JSON in {}", path.display()))
}

/// Locate and annotate in one step. Returns the number of highlighted pages.
pub fn highlight(
    input: &Path,
    phrases: &[String],
    style: &HighlightStyle,
    output: &Path,
) -> anyhow::Result<usize> {
    let highlights = locate(input, phrases, 1.0)?;
    if highlights.is_empty() {
        tracing::warn!("No key-phrase words found in {}", input.display());
    }
    annotate(input, &highlights, style, output)?;
    Ok(highlights.len())
}

/// Run a JSON command and return the JSON result.
pub fn exec(command_json: &str) -> anyhow::Result<String> {
    let result = execute_json(command_json);
    serde_json::to_string(&result).context("Failed to serialize result")
}
