//! Local storage for the user's API key.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Config;

/// Name the key is stored under.
pub const CREDENTIAL_KEY: &str = "gemini-api-key";

/// The user-supplied API key. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Trim the candidate; blank input yields `None`.
    pub fn parse(candidate: &str) -> Option<Self> {
        let trimmed = candidate.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Somewhere to keep the credential between runs.
pub trait CredentialStore: Send {
    fn load(&self) -> Result<Option<Credential>>;
    fn save(&mut self, credential: &Credential) -> Result<()>;
    fn clear(&mut self) -> Result<()>;
}

#[derive(Serialize, Deserialize)]
struct CredentialFile {
    #[serde(rename = "gemini-api-key")]
    api_key: String,
}

/// JSON file holding the single [`CREDENTIAL_KEY`] entry.
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config_dir>/doplhy/credentials.json`
    pub fn default_location() -> Result<Self> {
        Ok(Self::at(Config::app_dir()?.join("credentials.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Result<Option<Credential>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path)?;
        let file: CredentialFile = serde_json::from_str(&content)?;
        Ok(Credential::parse(&file.api_key))
    }

    fn save(&mut self, credential: &Credential) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&CredentialFile {
            api_key: credential.expose().to_string(),
        })?;
        fs::write(&self.path, content)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

/// Keeps the credential in memory only.
#[derive(Default)]
pub struct MemoryCredentialStore {
    value: Option<Credential>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(credential: Credential) -> Self {
        Self { value: Some(credential) }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Result<Option<Credential>> {
        Ok(self.value.clone())
    }

    fn save(&mut self, credential: &Credential) -> Result<()> {
        self.value = Some(credential.clone());
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.value = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trims_and_rejects_blank() {
        assert_eq!(Credential::parse("  abc \n").unwrap().expose(), "abc");
        assert!(Credential::parse("").is_none());
        assert!(Credential::parse(" \t ").is_none());
    }

    #[test]
    fn test_debug_is_redacted() {
        let credential = Credential::parse("super-secret").unwrap();
        assert!(!format!("{:?}", credential).contains("super-secret"));
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileCredentialStore::at(dir.path().join("doplhy").join("credentials.json"));

        assert!(store.load().unwrap().is_none());

        let credential = Credential::parse("key-123").unwrap();
        store.save(&credential).unwrap();
        assert_eq!(store.load().unwrap(), Some(credential));

        let raw = fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains(CREDENTIAL_KEY));

        store.clear().unwrap();
        assert!(!store.path().exists());
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_clear_without_file_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileCredentialStore::at(dir.path().join("credentials.json"));
        assert!(store.clear().is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_file_store_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let mut store = FileCredentialStore::at(dir.path().join("credentials.json"));
        store.save(&Credential::parse("k").unwrap()).unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_memory_store() {
        let mut store = MemoryCredentialStore::new();
        assert!(store.load().unwrap().is_none());
        store.save(&Credential::parse("k").unwrap()).unwrap();
        assert_eq!(store.load().unwrap().unwrap().expose(), "k");
        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }
}
