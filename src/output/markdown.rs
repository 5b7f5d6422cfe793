//! Markdown run report
//!
//! Written as `report.md` in the output root at the end of a run.

use crate::output::{CrawlSummary, OutputResult};
use crate::state::PageState;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes the markdown report of a run
///
/// # Arguments
///
/// * `summary` - The run summary
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote the report
/// * `Err(OutputError)` - Failed to write the report
pub fn generate_markdown_summary(summary: &CrawlSummary, output_path: &Path) -> OutputResult<()> {
    let markdown = format_markdown_summary(summary);

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a run summary as markdown
pub fn format_markdown_summary(summary: &CrawlSummary) -> String {
    let stats = &summary.stats;
    let mut md = String::new();

    md.push_str("# Site Snapshot Report\n\n");

    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Base Origin**: {}\n", summary.base_origin));
    md.push_str(&format!("- **Seed**: {}\n", summary.seed));
    md.push_str(&format!("- **Capture**: {}\n", summary.adapter));
    md.push_str(&format!(
        "- **Finished**: {}\n",
        summary.finished_at.to_rfc3339()
    ));
    md.push_str(&format!(
        "- **Duration**: {:.1} seconds\n",
        stats.elapsed.as_secs_f64()
    ));
    if !summary.config_hash.is_empty() {
        md.push_str(&format!("- **Config Hash**: {}\n", summary.config_hash));
    }
    md.push('\n');

    md.push_str("## This Run\n\n");
    md.push_str("| Metric | Count |\n");
    md.push_str("|--------|-------|\n");
    md.push_str(&format!("| Captured | {} |\n", stats.captured));
    md.push_str(&format!("| Skipped | {} |\n", stats.skipped));
    md.push_str(&format!("| Resumed through | {} |\n", stats.resumed));
    md.push_str(&format!("| Recaptured | {} |\n", stats.recaptured));
    md.push_str(&format!("| Discarded | {} |\n", stats.discarded));
    md.push_str(&format!("| Capture attempts | {} |\n\n", stats.attempts));

    md.push_str("## Visited Pages\n\n");
    md.push_str(&format!(
        "{} visited: {} captured, {} skipped.\n\n",
        summary.pages.len(),
        summary.count(PageState::Captured),
        summary.count(PageState::Skipped)
    ));

    if !summary.pages.is_empty() {
        md.push_str("| URL | State | Links | Artifacts |\n");
        md.push_str("|-----|-------|-------|-----------|\n");
        for page in &summary.pages {
            md.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                escape_cell(&page.url),
                page.state,
                page.links,
                page.artifact.as_deref().unwrap_or("-")
            ));
        }
        md.push('\n');
    }

    let skipped: Vec<_> = summary
        .pages
        .iter()
        .filter(|p| p.state == PageState::Skipped)
        .collect();
    if !skipped.is_empty() {
        md.push_str("## Skipped Pages\n\n");
        for page in skipped {
            md.push_str(&format!("- {}\n", page.url));
        }
        md.push('\n');
    }

    md
}

/// Keeps a URL from breaking the table layout
fn escape_cell(value: &str) -> String {
    value.replace('|', "%7C")
}
