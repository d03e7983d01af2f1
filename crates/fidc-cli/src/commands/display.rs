//! Table rendering shared by the import commands

use crate::detail::ImportDetail;
use crate::poller::{ListSnapshot, PollerState};
use chrono::{DateTime, Utc};
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, Color, Table};
use fidc_common::{EventTone, ImportJob};
use std::time::Duration;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn tone_color(tone: EventTone) -> Color {
    match tone {
        EventTone::Success => Color::Green,
        EventTone::Failure => Color::Red,
        EventTone::Warning => Color::Yellow,
        EventTone::Neutral => Color::Cyan,
    }
}

fn base_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS);
    table
}

pub fn format_time(value: &DateTime<Utc>) -> String {
    value.format(TIME_FORMAT).to_string()
}

fn format_optional_time(value: Option<&DateTime<Utc>>) -> String {
    value.map(format_time).unwrap_or_else(|| "-".to_string())
}

fn or_dash(value: Option<&str>) -> String {
    value
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| "-".to_string())
}

/// Truncate a string to a maximum number of characters with ellipsis
pub fn truncate_string(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Status cell colored by its tone
fn status_cell(job: &ImportJob) -> Cell {
    Cell::new(job.status.as_str()).fg(tone_color(job.status.tone()))
}

/// One row per import on the page
pub fn import_table(jobs: &[ImportJob]) -> Table {
    let mut table = base_table();
    table.set_header(vec![
        "ID", "File", "Fund", "Origin", "Status", "Attempts", "Created", "Completed",
    ]);

    for job in jobs {
        table.add_row(vec![
            Cell::new(&job.id),
            Cell::new(truncate_string(&job.file_name, 40)),
            Cell::new(or_dash(job.fidc_id.as_deref())),
            Cell::new(or_dash(job.origem.as_deref())),
            status_cell(job),
            Cell::new(job.tentativas),
            Cell::new(format_time(&job.created_at)),
            Cell::new(format_optional_time(job.completed_at.as_ref())),
        ]);
    }

    table
}

/// Paging and polling summary printed under the list
pub fn list_footer(snapshot: &ListSnapshot, poll_interval: Duration) -> String {
    let page = &snapshot.page;
    let mut footer = format!(
        "Page {}/{} · {} imports · fetched {}",
        page.page,
        page.total_pages.max(1),
        page.total_items,
        format_time(&snapshot.fetched_at)
    );

    if snapshot.state == PollerState::Polling {
        footer.push_str(&format!(
            " · {} in progress, refreshing every {}s",
            page.non_terminal_count(),
            poll_interval.as_secs()
        ));
    }

    footer
}

/// Key/value summary of one import
pub fn detail_table(detail: &ImportDetail) -> Table {
    let job = &detail.job;
    let mut table = base_table();

    table.add_row(vec![Cell::new("ID"), Cell::new(&job.id)]);
    table.add_row(vec![Cell::new("File"), Cell::new(&job.file_name)]);
    table.add_row(vec![Cell::new("Status"), status_cell(job)]);
    table.add_row(vec![Cell::new("Fund"), Cell::new(or_dash(job.fidc_id.as_deref()))]);
    table.add_row(vec![Cell::new("Origin"), Cell::new(or_dash(job.origem.as_deref()))]);
    table.add_row(vec![
        Cell::new("File type"),
        Cell::new(or_dash(job.tipo_arquivo.as_deref())),
    ]);
    table.add_row(vec![
        Cell::new("Modality"),
        Cell::new(or_dash(job.modalidade.as_deref())),
    ]);
    table.add_row(vec![
        Cell::new("Assignor"),
        Cell::new(or_dash(job.cedente_id.as_deref())),
    ]);
    table.add_row(vec![Cell::new("Attempts"), Cell::new(job.tentativas)]);
    table.add_row(vec![
        Cell::new("Last attempt"),
        Cell::new(format_optional_time(job.ultima_tentativa_em.as_ref())),
    ]);
    table.add_row(vec![Cell::new("Created"), Cell::new(format_time(&job.created_at))]);
    table.add_row(vec![
        Cell::new("Completed"),
        Cell::new(format_optional_time(job.completed_at.as_ref())),
    ]);
    table.add_row(vec![
        Cell::new("Submitted by"),
        Cell::new(or_dash(job.user_email.as_deref())),
    ]);
    table.add_row(vec![
        Cell::new("Fingerprint"),
        Cell::new(or_dash(job.file_hash.as_deref())),
    ]);

    if let Some((code, summary)) = detail.failure() {
        table.add_row(vec![
            Cell::new("Failure code").fg(Color::Red),
            Cell::new(or_dash(code)).fg(Color::Red),
        ]);
        table.add_row(vec![
            Cell::new("Failure").fg(Color::Red),
            Cell::new(or_dash(summary)).fg(Color::Red),
        ]);
    }

    table
}

/// Event log in service order
pub fn timeline_table(detail: &ImportDetail) -> Table {
    let mut table = base_table();
    table.set_header(vec!["#", "When", "Status", "Message"]);

    for entry in detail.timeline() {
        table.add_row(vec![
            Cell::new(entry.position + 1),
            Cell::new(format_time(&entry.event.created_at)),
            Cell::new(entry.event.status.as_str()).fg(tone_color(entry.tone)),
            Cell::new(or_dash(entry.event.message.as_deref())),
        ]);
    }

    table
}
