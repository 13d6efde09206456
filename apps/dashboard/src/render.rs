use std::fmt::Write as _;

use client_core::{ControllerSnapshot, EntryStatus, UserStats};
use serde::Serialize;
use serde_json::Value;
use shared::resource::Resource;

fn field_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// `#<id> key=value ...`, with provisional records marked as pending.
pub fn record_line<T: Serialize>(record: &T, status: EntryStatus) -> String {
    let Ok(Value::Object(fields)) = serde_json::to_value(record) else {
        return "<unprintable record>".to_string();
    };
    let mut line = match fields.get("id") {
        Some(id) => format!("#{}", field_text(id)),
        None => "#?".to_string(),
    };
    for (key, value) in fields.iter().filter(|(key, _)| key.as_str() != "id") {
        let _ = write!(line, " {key}={}", field_text(value));
    }
    if status == EntryStatus::Provisional {
        line.push_str(" (pending)");
    }
    line
}

pub fn snapshot<R: Resource>(snapshot: &ControllerSnapshot<R>) -> String {
    let mut out = String::new();
    let _ = write!(
        out,
        "{}: page {}/{}",
        R::KIND.collection(),
        snapshot.window.page,
        snapshot.total_pages
    );
    if let Some(total) = snapshot.total {
        let _ = write!(out, " ({total} total)");
    }
    out.push('\n');

    if snapshot.entries.is_empty() {
        out.push_str("  (no records)\n");
    }
    for entry in &snapshot.entries {
        let _ = writeln!(out, "  {}", record_line(&entry.record, entry.status));
    }
    if let Some(id) = snapshot.editing {
        let draft = serde_json::to_string(&snapshot.draft).unwrap_or_default();
        let _ = writeln!(out, "editing #{id}: {draft}");
    }
    if let Some(message) = &snapshot.error_message {
        let _ = writeln!(out, "error: {message}");
    }
    if let Some(message) = &snapshot.success_message {
        let _ = writeln!(out, "ok: {message}");
    }
    out
}

pub fn stats(stats: &UserStats) -> String {
    format!(
        "users in view: {} (male {}, female {})",
        stats.total, stats.male, stats.female
    )
}

#[cfg(test)]
#[path = "tests/render_tests.rs"]
mod tests;
