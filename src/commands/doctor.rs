use anyhow::Result;
use std::env;

use crate::aegis::config::{load_config, resolve_gemini_api_key, resolve_supabase_credentials};
use crate::aegis::paths::resolve_paths;
use crate::aegis::persistence::resolve_gateway;
use crate::commands::CommandReport;

include!(concat!(env!("OUT_DIR"), "/aegis_env_allowlist.rs"));

fn presence(flag: bool) -> &'static str {
    if flag { "present" } else { "missing" }
}

pub fn run() -> Result<CommandReport> {
    let mut report = CommandReport::new("doctor");
    report.detail(format!("build={}", env!("BUILD_UUID")));

    let paths = resolve_paths()?;
    report.detail(format!("aegis_home={}", paths.aegis_home.display()));
    report.detail(format!("store_dir={}", paths.store_dir.display()));
    report.detail(format!("logs_dir={}", paths.logs_dir.display()));

    match load_config() {
        Ok(cfg) => {
            report.detail(format!("model={}", cfg.completion.model));
            report.detail(format!("temperature={}", cfg.completion.temperature));
        }
        Err(err) => report.issue(format!("config invalid: {err:#}")),
    }

    // Presence only — credential values never reach a report.
    report.detail(format!(
        "gemini_api_key={}",
        presence(resolve_gemini_api_key().is_some())
    ));
    report.detail(format!(
        "supabase_credentials={}",
        presence(resolve_supabase_credentials().is_some())
    ));
    if resolve_gemini_api_key().is_none() {
        report.detail(
            "note: without GEMINI_API_KEY only the keyword safety branch can answer".to_string(),
        );
    }

    match resolve_gateway(&paths) {
        Ok(gateway) => report.detail(format!("store={}", gateway.label())),
        Err(err) => report.issue(format!("persistence gateway unavailable: {err}")),
    }

    for (key, _) in env::vars() {
        if key.starts_with("AEGIS_") && !GENERATED_AEGIS_ENV_ALLOWLIST.contains(&key.as_str()) {
            report.issue(format!("unknown environment variable `{key}` (typo?)"));
        }
    }

    Ok(report)
}
