//! Format sync reports and ledger status as text.

use crate::ledger::LedgerSummary;
use crate::sync::{ColorSyncReport, IconSyncReport, SyncReport};
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use owo_colors::OwoColorize;
use serde::Serialize;

/// Ledger status for the `status` command
#[derive(Debug, Clone, Serialize)]
pub struct LedgerStatus {
    pub ledger_path: String,
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<LedgerSummary>,
}

/// Format a section heading with bold/underline.
pub fn format_section_heading(title: &str) -> String {
    format!("{}", title.bold().underline())
}

fn format_color_section(out: &mut String, colors: &ColorSyncReport) {
    out.push_str(&format!("{}\n\n", format_section_heading("Colors")));
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Total", "New", "Changed", "Unchanged", "Orphaned", "Removed"]);
    table.add_row(vec![
        colors.total.to_string(),
        colors.new.len().to_string(),
        colors.changed.len().to_string(),
        colors.unchanged.to_string(),
        colors.orphaned.len().to_string(),
        colors.removed.len().to_string(),
    ]);
    out.push_str(&format!("{}\n", table));
    match &colors.written {
        Some(path) => out.push_str(&format!("  Wrote {}\n\n", path.display())),
        None => out.push_str("  Colors up to date\n\n"),
    }
}

fn format_icon_section(out: &mut String, icons: &IconSyncReport) {
    out.push_str(&format!("{}\n\n", format_section_heading("Icons")));
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec![
        "Candidates",
        "Downloaded",
        "Unchanged",
        "Failed",
        "Duplicates",
        "Unresolved",
        "Orphaned",
    ]);
    table.add_row(vec![
        icons.candidates.to_string(),
        icons.downloaded.len().to_string(),
        icons.unchanged.to_string(),
        icons.failed.len().to_string(),
        icons.skipped_duplicates.len().to_string(),
        icons.unresolved.len().to_string(),
        icons.orphaned.len().to_string(),
    ]);
    out.push_str(&format!("{}\n", table));

    if !icons.skipped_duplicates.is_empty() {
        out.push_str("  Skipped duplicates:\n");
        for dup in &icons.skipped_duplicates {
            out.push_str(&format!(
                "    {} ({}) kept {}\n",
                dup.file_name, dup.node_id, dup.kept_node_id
            ));
        }
    }
    if !icons.failed.is_empty() {
        out.push_str("  Failed downloads:\n");
        for failure in &icons.failed {
            out.push_str(&format!(
                "    {} ({}): {}\n",
                failure.file_name, failure.node_id, failure.error
            ));
        }
    }
    if icons.abandoned {
        out.push_str(&format!(
            "  {} download queue abandoned, {} icon(s) not attempted\n",
            "Partial:".yellow(),
            icons.not_attempted
        ));
    }
    if let Some(path) = &icons.index_written {
        out.push_str(&format!("  Wrote {}\n", path.display()));
    }
    out.push('\n');
}

/// Format a sync report as human-readable text.
pub fn format_sync_report_text(report: &SyncReport) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{}\n\n",
        format_section_heading(&format!("Sync: {}", report.document_name))
    ));
    if let Some(colors) = &report.colors {
        format_color_section(&mut out, colors);
    }
    if let Some(icons) = &report.icons {
        format_icon_section(&mut out, icons);
    }
    let outcome = if report.is_partial() {
        format!("{}", "partial".yellow())
    } else {
        format!("{}", "complete".green())
    };
    out.push_str(&format!("Finished in {} ms ({})\n", report.duration_ms, outcome));
    out
}

/// Format ledger status as human-readable text.
pub fn format_ledger_status_text(status: &LedgerStatus) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n\n", format_section_heading("Ledger")));
    out.push_str(&format!("  Path: {}\n", status.ledger_path));
    if let Some(message) = &status.message {
        out.push_str(&format!("  {}\n", message));
    }
    let Some(summary) = &status.summary else {
        return out;
    };
    let last_sync = summary
        .last_sync
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| "never".to_string());
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Document", "Last sync", "Colors", "Icons", "Icons without hash"]);
    table.add_row(vec![
        summary.source_document_key.clone(),
        last_sync,
        summary.colors.to_string(),
        summary.icons.to_string(),
        summary.icons_without_hash.to_string(),
    ]);
    out.push_str(&format!("\n{}\n", table));
    out
}
