use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    pub model: String,
    pub temperature: f64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash".to_string(),
            // Allows stylistic variety in replies while the response schema
            // keeps the structure reliable.
            temperature: 0.7,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    pub default_limit: usize,
    pub preview_chars: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            default_limit: 20,
            preview_chars: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AegisConfig {
    pub completion: CompletionConfig,
    pub history: HistoryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialAegisConfig {
    completion: Option<CompletionConfig>,
    history: Option<HistoryConfig>,
}

pub fn env_non_empty(var: &str) -> Option<String> {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => Some(v.trim().to_string()),
        _ => None,
    }
}

fn env_or_f64(var: &str, fallback: f64) -> f64 {
    match env::var(var) {
        Ok(v) => v.trim().parse::<f64>().ok().unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn env_or_usize(var: &str, fallback: usize) -> usize {
    match env::var(var) {
        Ok(v) => v.trim().parse::<usize>().ok().unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn env_or_string(var: &str, fallback: &str) -> String {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => fallback.to_string(),
    }
}

fn validate(cfg: &AegisConfig) -> Result<()> {
    if cfg.completion.model.trim().is_empty() {
        return Err(anyhow!("invalid completion model: cannot be empty"));
    }
    let t = cfg.completion.temperature;
    if !(0.0..=2.0).contains(&t) {
        return Err(anyhow!(
            "invalid completion temperature: require 0.0 <= temperature <= 2.0"
        ));
    }
    if cfg.history.default_limit == 0 {
        return Err(anyhow!("invalid history limit: must be >= 1"));
    }
    if cfg.history.preview_chars == 0 {
        return Err(anyhow!("invalid history preview width: must be >= 1"));
    }
    Ok(())
}

fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(custom) = env::var("AEGIS_CONFIG_PATH") {
        let trimmed = custom.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }

    if let Some(raw) = env_non_empty("AEGIS_HOME") {
        return Some(PathBuf::from(raw).join("aegis.toml"));
    }

    let home = dirs::home_dir()?;
    Some(home.join("AEGIS").join("aegis.toml"))
}

fn merge_file_str(base: &mut AegisConfig, raw: &str, origin: &str) -> Result<()> {
    let parsed: PartialAegisConfig = toml::from_str(raw)
        .map_err(|err| anyhow!("failed to parse aegis config {origin}: {err}"))?;
    if let Some(completion) = parsed.completion {
        base.completion = completion;
    }
    if let Some(history) = parsed.history {
        base.history = history;
    }
    Ok(())
}

fn merge_file_config(base: &mut AegisConfig) -> Result<()> {
    let Some(path) = resolve_config_path() else {
        return Ok(());
    };
    if !path.exists() {
        return Ok(());
    }

    let raw = fs::read_to_string(&path)?;
    merge_file_str(base, &raw, &path.display().to_string())
}

pub fn load_config() -> Result<AegisConfig> {
    let mut cfg = AegisConfig::default();
    merge_file_config(&mut cfg)?;

    cfg.completion.model = env_or_string("AEGIS_MODEL", &cfg.completion.model);
    cfg.completion.temperature = env_or_f64("AEGIS_TEMPERATURE", cfg.completion.temperature);
    cfg.history.default_limit = env_or_usize("AEGIS_HISTORY_LIMIT", cfg.history.default_limit);
    cfg.history.preview_chars = env_or_usize("AEGIS_PREVIEW_CHARS", cfg.history.preview_chars);

    validate(&cfg)?;
    Ok(cfg)
}

/// Gemini credentials. `GEMINI_API_KEY` wins; `API_KEY` is the legacy alias
/// carried over from the hosted deployment.
pub fn resolve_gemini_api_key() -> Option<String> {
    env_non_empty("GEMINI_API_KEY").or_else(|| env_non_empty("API_KEY"))
}

#[derive(Debug, Clone)]
pub struct SupabaseCredentials {
    pub url: String,
    pub service_key: String,
}

pub fn resolve_supabase_credentials() -> Option<SupabaseCredentials> {
    let url = env_non_empty("SUPABASE_URL")?;
    let service_key = env_non_empty("SUPABASE_SERVICE_ROLE_KEY")?;
    Some(SupabaseCredentials { url, service_key })
}
