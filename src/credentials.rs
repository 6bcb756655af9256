//! Local key-value store holding the Jira server address.

use serde_json::{Map as JsonMap, Value};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const SERVER_ADDRESS_KEY: &str = "jira_tracker_api_host";
const STORAGE_FILE: &str = "storage.json";

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Key '{0}' not found.")]
    NotFound(String),

    #[error("Provide the address to your jira server!")]
    EmptyAddress,

    #[error("storage io error: {0}")]
    Io(#[from] io::Error),

    #[error("storage file is corrupted: {0}")]
    Corrupted(#[from] serde_json::Error),
}

/// Read/write access to the stored server address. Shared between the session manager and the popup.
pub trait CredentialStore: Send + Sync {
    /// Returns the stored base URL or `NotFound` when nothing (or an empty value) is stored.
    fn server_address(&self) -> Result<String, CredentialError>;

    fn write_server_address(&self, address: &str) -> Result<(), CredentialError>;

    /// Settings form submit: rejects empty input, otherwise overwrites the stored address.
    fn save_server_address(&self, input: &str) -> Result<(), CredentialError> {
        let address = input.trim();
        if address.is_empty() {
            return Err(CredentialError::EmptyAddress);
        }
        self.write_server_address(address)
    }
}

/// JSON object file, one entry per key. Outlives every timer run.
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(config_dir: &Path) -> Self {
        Self {
            path: config_dir.join(STORAGE_FILE),
        }
    }

    fn read_entries(&self) -> Result<JsonMap<String, Value>, CredentialError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(JsonMap::new()),
            Err(err) => return Err(err.into()),
        };
        Ok(serde_json::from_str(&content)?)
    }

    pub fn get(&self, key: &str) -> Result<String, CredentialError> {
        self.read_entries()?
            .get(key)
            .and_then(Value::as_str)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .ok_or_else(|| CredentialError::NotFound(key.to_string()))
    }

    pub fn set(&self, key: &str, value: &str) -> Result<(), CredentialError> {
        let mut entries = self.read_entries()?;
        entries.insert(key.to_string(), Value::String(value.to_string()));

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&entries)?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    fn server_address(&self) -> Result<String, CredentialError> {
        self.get(SERVER_ADDRESS_KEY)
    }

    fn write_server_address(&self, address: &str) -> Result<(), CredentialError> {
        self.set(SERVER_ADDRESS_KEY, address)?;
        log::info!("Stored Jira server address {}", address);
        Ok(())
    }
}

#[cfg(test)]
pub(crate) use memory::MemoryCredentialStore;
