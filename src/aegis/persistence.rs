use crate::aegis::config::{SupabaseCredentials, resolve_supabase_credentials};
use crate::aegis::model::{AegisResponse, Mode, Sender, TherapistSummary, UserMessage};
use crate::aegis::paths::AegisPaths;
use crate::aegis::util::now_epoch_secs;
use crate::error::AegisError;
use fs2::FileExt;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// One persisted chat line. `content` is `{"text": ...}` for USER records and
/// the full response object for AEGIS records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRecord {
    pub owner_id: String,
    pub sender: Sender,
    pub content: Value,
    pub created_at_epoch_secs: u64,
}

impl ChatRecord {
    pub fn user(owner_id: &str, message: &UserMessage) -> Self {
        Self {
            owner_id: owner_id.to_string(),
            sender: Sender::User,
            content: serde_json::json!({ "text": message.text }),
            created_at_epoch_secs: message.created_at_epoch_secs,
        }
    }

    pub fn aegis(owner_id: &str, response: &AegisResponse) -> Result<Self, AegisError> {
        let content = serde_json::to_value(response)
            .map_err(|err| AegisError::persistence(format!("unserializable response: {err}")))?;
        let created_at_epoch_secs = now_epoch_secs()
            .map_err(|err| AegisError::persistence(format!("clock unavailable: {err}")))?;
        Ok(Self {
            owner_id: owner_id.to_string(),
            sender: Sender::Aegis,
            content,
            created_at_epoch_secs,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub owner_id: String,
    pub summary_data: TherapistSummary,
    pub created_at_epoch_secs: u64,
}

impl SummaryRecord {
    pub fn new(owner_id: &str, summary: &TherapistSummary) -> Result<Self, AegisError> {
        let created_at_epoch_secs = now_epoch_secs()
            .map_err(|err| AegisError::persistence(format!("clock unavailable: {err}")))?;
        Ok(Self {
            owner_id: owner_id.to_string(),
            summary_data: summary.clone(),
            created_at_epoch_secs,
        })
    }
}

/// External collaborator boundary: chat history, therapist summaries, and the
/// per-owner consent mode. Chat listings come back in creation order; summary
/// listings newest-first.
pub trait PersistenceGateway {
    fn label(&self) -> &'static str;
    fn append_chat(&self, record: &ChatRecord) -> Result<(), AegisError>;
    fn list_chats(&self, owner_id: &str) -> Result<Vec<ChatRecord>, AegisError>;
    fn append_summary(&self, record: &SummaryRecord) -> Result<(), AegisError>;
    fn list_summaries(&self, owner_id: &str) -> Result<Vec<SummaryRecord>, AegisError>;
    fn load_mode(&self, owner_id: &str) -> Result<Mode, AegisError>;
    fn store_mode(&self, owner_id: &str, mode: Mode) -> Result<(), AegisError>;
}

/// Credentials present ⇒ the hosted Supabase REST store; otherwise the local
/// JSONL store under the AEGIS home.
pub fn resolve_gateway(paths: &AegisPaths) -> Result<Box<dyn PersistenceGateway>, AegisError> {
    match resolve_supabase_credentials() {
        Some(creds) => Ok(Box::new(SupabaseGateway::new(creds)?)),
        None => Ok(Box::new(LocalStore::new(paths.store_dir.clone()))),
    }
}

// --- Supabase REST gateway ---

pub struct SupabaseGateway {
    base_url: String,
    service_key: String,
    client: Client,
}

impl SupabaseGateway {
    pub fn new(creds: SupabaseCredentials) -> Result<Self, AegisError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|err| {
                AegisError::configuration(format!("failed to build http client: {err}"))
            })?;
        Ok(Self {
            base_url: creds.url.trim_end_matches('/').to_string(),
            service_key: creds.service_key,
            client,
        })
    }

    fn insert(&self, table: &str, body: &Value, upsert: bool) -> Result<(), AegisError> {
        let url = format!("{}/rest/v1/{table}", self.base_url);
        let mut request = self
            .client
            .post(&url)
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .json(body);
        if upsert {
            request = request.header("Prefer", "resolution=merge-duplicates");
        }
        let response = request
            .send()
            .map_err(|err| AegisError::persistence(format!("{table} insert failed: {err}")))?;
        if !response.status().is_success() {
            return Err(AegisError::persistence(format!(
                "{table} insert failed with status {}",
                response.status()
            )));
        }
        Ok(())
    }

    fn select(&self, table: &str, query: &str) -> Result<Value, AegisError> {
        let url = format!("{}/rest/v1/{table}?{query}", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .send()
            .map_err(|err| AegisError::persistence(format!("{table} query failed: {err}")))?;
        if !response.status().is_success() {
            return Err(AegisError::persistence(format!(
                "{table} query failed with status {}",
                response.status()
            )));
        }
        response
            .json()
            .map_err(|err| AegisError::persistence(format!("{table} payload unreadable: {err}")))
    }
}

#[derive(Debug, Deserialize)]
struct ProfileRow {
    mode: Mode,
}

impl PersistenceGateway for SupabaseGateway {
    fn label(&self) -> &'static str {
        "supabase"
    }

    fn append_chat(&self, record: &ChatRecord) -> Result<(), AegisError> {
        let body = serde_json::to_value(record)
            .map_err(|err| AegisError::persistence(format!("unserializable chat record: {err}")))?;
        self.insert("chats", &body, false)
    }

    fn list_chats(&self, owner_id: &str) -> Result<Vec<ChatRecord>, AegisError> {
        let raw = self.select(
            "chats",
            &format!("owner_id=eq.{owner_id}&order=created_at_epoch_secs.asc"),
        )?;
        serde_json::from_value(raw)
            .map_err(|err| AegisError::persistence(format!("chats payload malformed: {err}")))
    }

    fn append_summary(&self, record: &SummaryRecord) -> Result<(), AegisError> {
        let body = serde_json::to_value(record).map_err(|err| {
            AegisError::persistence(format!("unserializable summary record: {err}"))
        })?;
        self.insert("summaries", &body, false)
    }

    fn list_summaries(&self, owner_id: &str) -> Result<Vec<SummaryRecord>, AegisError> {
        let raw = self.select(
            "summaries",
            &format!("owner_id=eq.{owner_id}&order=created_at_epoch_secs.desc"),
        )?;
        serde_json::from_value(raw)
            .map_err(|err| AegisError::persistence(format!("summaries payload malformed: {err}")))
    }

    fn load_mode(&self, owner_id: &str) -> Result<Mode, AegisError> {
        let raw = self.select("profiles", &format!("owner_id=eq.{owner_id}&select=mode"))?;
        let rows: Vec<ProfileRow> = serde_json::from_value(raw)
            .map_err(|err| AegisError::persistence(format!("profiles payload malformed: {err}")))?;
        Ok(rows.first().map(|row| row.mode).unwrap_or(Mode::Private))
    }

    fn store_mode(&self, owner_id: &str, mode: Mode) -> Result<(), AegisError> {
        let body = serde_json::json!({ "owner_id": owner_id, "mode": mode });
        self.insert("profiles", &body, true)
    }
}

// --- Local JSONL store ---

pub struct LocalStore {
    store_dir: PathBuf,
}

#[derive(Debug, Serialize, Deserialize)]
struct Profile {
    mode: Mode,
}

fn sanitize_owner_id(owner_id: &str) -> String {
    let cleaned: String = owner_id
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
                ch
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = cleaned.trim_matches('_');
    if trimmed.is_empty() {
        "anon".to_string()
    } else {
        trimmed.to_string()
    }
}

fn append_jsonl_line(path: &Path, line: &str) -> Result<(), AegisError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| {
            AegisError::persistence(format!("failed to create {}: {err}", parent.display()))
        })?;
    }
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|err| {
            AegisError::persistence(format!("failed to open {}: {err}", path.display()))
        })?;
    // Appends from concurrent turns of different processes must not
    // interleave within a line.
    file.lock_exclusive().map_err(|err| {
        AegisError::persistence(format!("failed to lock {}: {err}", path.display()))
    })?;
    let result = (&file)
        .write_all(format!("{line}\n").as_bytes())
        .map_err(|err| {
            AegisError::persistence(format!("failed to append {}: {err}", path.display()))
        });
    let _ = fs2::FileExt::unlock(&file);
    result
}

fn read_jsonl<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>, AegisError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let raw = fs::read_to_string(path)
        .map_err(|err| AegisError::persistence(format!("failed to read {}: {err}", path.display())))?;
    let mut out = Vec::new();
    for line in raw.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let parsed: T = serde_json::from_str(trimmed).map_err(|err| {
            AegisError::persistence(format!("corrupt record in {}: {err}", path.display()))
        })?;
        out.push(parsed);
    }
    Ok(out)
}

impl LocalStore {
    pub fn new(store_dir: PathBuf) -> Self {
        Self { store_dir }
    }

    fn owner_dir(&self, owner_id: &str) -> PathBuf {
        self.store_dir.join(sanitize_owner_id(owner_id))
    }

    fn chats_file(&self, owner_id: &str) -> PathBuf {
        self.owner_dir(owner_id).join("chats.jsonl")
    }

    fn summaries_file(&self, owner_id: &str) -> PathBuf {
        self.owner_dir(owner_id).join("summaries.jsonl")
    }

    fn profile_file(&self, owner_id: &str) -> PathBuf {
        self.owner_dir(owner_id).join("profile.json")
    }
}

impl PersistenceGateway for LocalStore {
    fn label(&self) -> &'static str {
        "local"
    }

    fn append_chat(&self, record: &ChatRecord) -> Result<(), AegisError> {
        let line = serde_json::to_string(record)
            .map_err(|err| AegisError::persistence(format!("unserializable chat record: {err}")))?;
        append_jsonl_line(&self.chats_file(&record.owner_id), &line)
    }

    fn list_chats(&self, owner_id: &str) -> Result<Vec<ChatRecord>, AegisError> {
        read_jsonl(&self.chats_file(owner_id))
    }

    fn append_summary(&self, record: &SummaryRecord) -> Result<(), AegisError> {
        let line = serde_json::to_string(record).map_err(|err| {
            AegisError::persistence(format!("unserializable summary record: {err}"))
        })?;
        append_jsonl_line(&self.summaries_file(&record.owner_id), &line)
    }

    fn list_summaries(&self, owner_id: &str) -> Result<Vec<SummaryRecord>, AegisError> {
        // Stored append-order ascending; the read contract is newest-first.
        let mut records: Vec<SummaryRecord> = read_jsonl(&self.summaries_file(owner_id))?;
        records.reverse();
        Ok(records)
    }

    fn load_mode(&self, owner_id: &str) -> Result<Mode, AegisError> {
        let path = self.profile_file(owner_id);
        if !path.exists() {
            return Ok(Mode::Private);
        }
        let raw = fs::read_to_string(&path).map_err(|err| {
            AegisError::persistence(format!("failed to read {}: {err}", path.display()))
        })?;
        let profile: Profile = serde_json::from_str(&raw).map_err(|err| {
            AegisError::persistence(format!("corrupt profile {}: {err}", path.display()))
        })?;
        Ok(profile.mode)
    }

    fn store_mode(&self, owner_id: &str, mode: Mode) -> Result<(), AegisError> {
        let dir = self.owner_dir(owner_id);
        fs::create_dir_all(&dir).map_err(|err| {
            AegisError::persistence(format!("failed to create {}: {err}", dir.display()))
        })?;
        let data = serde_json::to_string_pretty(&Profile { mode })
            .map_err(|err| AegisError::persistence(format!("unserializable profile: {err}")))?;

        // Write-then-rename so a crash cannot leave a torn consent flag.
        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(|err| {
            AegisError::persistence(format!("failed to stage profile write: {err}"))
        })?;
        tmp.write_all(format!("{data}\n").as_bytes()).map_err(|err| {
            AegisError::persistence(format!("failed to stage profile write: {err}"))
        })?;
        tmp.persist(self.profile_file(owner_id)).map_err(|err| {
            AegisError::persistence(format!("failed to commit profile write: {err}"))
        })?;
        Ok(())
    }
}
