use anyhow::Result;
use chrono::{Local, TimeZone};
use serde_json::Value;

use crate::aegis::config::load_config;
use crate::aegis::model::Sender;
use crate::aegis::paths::resolve_paths;
use crate::aegis::persistence::{ChatRecord, resolve_gateway};
use crate::aegis::util::truncate_with_ellipsis;
use crate::commands::CommandReport;

fn render_timestamp(epoch_secs: u64) -> String {
    match Local.timestamp_opt(epoch_secs as i64, 0).single() {
        Some(ts) => ts.format("%Y-%m-%d %H:%M").to_string(),
        None => format!("@{epoch_secs}"),
    }
}

fn preview(record: &ChatRecord, max_chars: usize) -> String {
    let text = match record.sender {
        Sender::User => record.content.get("text").and_then(Value::as_str),
        Sender::Aegis => record.content.get("empatheticReply").and_then(Value::as_str),
    };
    match text {
        Some(text) => truncate_with_ellipsis(text, max_chars),
        None => truncate_with_ellipsis(&record.content.to_string(), max_chars),
    }
}

pub fn run(owner: &str, limit: Option<usize>) -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let cfg = load_config()?;
    let mut report = CommandReport::new("history");

    let gateway = resolve_gateway(&paths)?;
    let records = gateway.list_chats(owner)?;
    let limit = limit.unwrap_or(cfg.history.default_limit);

    report.detail(format!(
        "store={} owner={} records={}",
        gateway.label(),
        owner,
        records.len()
    ));

    // Oldest-first within the window; the window itself is the most recent
    // `limit` records.
    let start = records.len().saturating_sub(limit);
    for record in &records[start..] {
        report.detail(format!(
            "{} [{}] {}",
            render_timestamp(record.created_at_epoch_secs),
            record.sender.as_str(),
            preview(record, cfg.history.preview_chars),
        ));
    }

    Ok(report)
}
