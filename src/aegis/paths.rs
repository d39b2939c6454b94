use anyhow::Result;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct AegisPaths {
    pub aegis_home: PathBuf,
    pub store_dir: PathBuf,
    pub logs_dir: PathBuf,
}

fn required_home_dir() -> Result<PathBuf> {
    if let Some(home) = dirs::home_dir() {
        return Ok(home);
    }
    Err(anyhow::anyhow!("HOME directory could not be resolved"))
}

fn env_or_default_path(var: &str, fallback: PathBuf) -> PathBuf {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => PathBuf::from(v.trim()),
        _ => fallback,
    }
}

pub fn resolve_paths() -> Result<AegisPaths> {
    let aegis_home = match env::var("AEGIS_HOME") {
        Ok(v) if !v.trim().is_empty() => PathBuf::from(v.trim()),
        _ => required_home_dir()?.join("AEGIS"),
    };

    let store_dir = env_or_default_path("AEGIS_STORE_DIR", aegis_home.join("store"));
    let logs_dir = env_or_default_path("AEGIS_LOGS_DIR", aegis_home.join("logs"));

    Ok(AegisPaths {
        aegis_home,
        store_dir,
        logs_dir,
    })
}
