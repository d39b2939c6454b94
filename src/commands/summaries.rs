use anyhow::Result;
use chrono::{Local, TimeZone};

use crate::aegis::paths::resolve_paths;
use crate::aegis::persistence::resolve_gateway;
use crate::commands::CommandReport;

const DEFAULT_SUMMARY_LIMIT: usize = 10;

pub fn run(owner: &str, limit: Option<usize>) -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let mut report = CommandReport::new("summaries");

    let gateway = resolve_gateway(&paths)?;
    let records = gateway.list_summaries(owner)?;
    let limit = limit.unwrap_or(DEFAULT_SUMMARY_LIMIT);

    report.detail(format!(
        "store={} owner={} summaries={}",
        gateway.label(),
        owner,
        records.len()
    ));

    for record in records.iter().take(limit) {
        let when = match Local
            .timestamp_opt(record.created_at_epoch_secs as i64, 0)
            .single()
        {
            Some(ts) => ts.format("%Y-%m-%d %H:%M").to_string(),
            None => format!("@{}", record.created_at_epoch_secs),
        };
        report.detail(format!(
            "{when} moods=[{}] stressors=[{}] follow_up: {}",
            record.summary_data.mood_cues.join(", "),
            record.summary_data.possible_stressors.join(", "),
            record.summary_data.suggested_follow_up,
        ));
    }

    Ok(report)
}
