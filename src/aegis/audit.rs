use crate::aegis::paths::AegisPaths;
use crate::aegis::util::now_epoch_secs;
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;

/// One line of the append-only audit trail: safety-alert triggers and
/// swallowed secondary failures, never message text.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub at_epoch_secs: u64,
    pub stage: String,
    pub status: String,
    pub owner_id: String,
    pub detail: String,
}

pub fn append_event(
    paths: &AegisPaths,
    stage: &str,
    status: &str,
    owner_id: &str,
    detail: &str,
) -> Result<()> {
    fs::create_dir_all(&paths.logs_dir)
        .with_context(|| format!("failed to create {}", paths.logs_dir.display()))?;
    let event = AuditEvent {
        at_epoch_secs: now_epoch_secs()?,
        stage: stage.to_string(),
        status: status.to_string(),
        owner_id: owner_id.to_string(),
        detail: detail.to_string(),
    };

    let line = format!("{}\n", serde_json::to_string(&event)?);
    use std::io::Write;
    let path = paths.logs_dir.join("audit.log");
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    file.write_all(line.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::append_event;
    use crate::aegis::paths::AegisPaths;
    use tempfile::tempdir;

    #[test]
    fn events_append_as_one_json_line_each() {
        let tmp = tempdir().expect("tempdir");
        let paths = AegisPaths {
            aegis_home: tmp.path().to_path_buf(),
            store_dir: tmp.path().join("store"),
            logs_dir: tmp.path().join("logs"),
        };

        append_event(&paths, "safety", "keyword_triggered", "teen-1", "short-circuit")
            .expect("append");
        append_event(&paths, "summary", "write_failed", "teen-1", "disk full").expect("append");

        let raw = std::fs::read_to_string(paths.logs_dir.join("audit.log")).expect("read");
        let lines: Vec<&str> = raw.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in lines {
            let parsed: serde_json::Value = serde_json::from_str(line).expect("json line");
            assert_eq!(parsed["owner_id"], "teen-1");
        }
    }
}
