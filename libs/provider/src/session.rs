//! Session and credential resolution.
//!
//! Mirrors the provider SDK convention: named profiles live in a
//! `credentials.json` under the user config directory, and the environment
//! (`FLEET_API_URL`, `FLEET_API_TOKEN`) overrides whatever the selected
//! profile says. Commands receive an explicit [`Session`] handle; there is
//! no process-global session state.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::http::HttpProvider;

/// Credentials file name.
const CREDENTIALS_FILE: &str = "credentials.json";

/// Profile used when none is named on the command line.
pub const DEFAULT_PROFILE: &str = "default";

/// Environment override for the API endpoint.
const ENV_API_URL: &str = "FLEET_API_URL";

/// Environment override for the API token.
const ENV_API_TOKEN: &str = "FLEET_API_TOKEN";

/// Get the config directory path.
fn config_dir() -> Result<PathBuf> {
    ProjectDirs::from("io", "fleet", "fleet")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))
}

/// A named credential profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    /// API endpoint URL.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Bearer token, if the endpoint requires one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

fn default_api_url() -> String {
    "http://localhost:8080".to_string()
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            token: None,
        }
    }
}

/// On-disk credential store: profile name to profile.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CredentialStore {
    #[serde(default)]
    profiles: HashMap<String, Profile>,
}

impl CredentialStore {
    /// Load the store from disk, or return an empty one.
    pub fn load() -> Result<Self> {
        let path = config_dir()?.join(CREDENTIALS_FILE);

        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read credentials from {path:?}"))?;

        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse credentials from {path:?}"))
    }

    /// Save the store to disk.
    pub fn save(&self) -> Result<()> {
        let dir = config_dir()?;
        fs::create_dir_all(&dir)?;

        let path = dir.join(CREDENTIALS_FILE);
        let contents = serde_json::to_string_pretty(self)?;

        // Set restrictive permissions on Unix
        #[cfg(unix)]
        {
            use std::io::Write;
            use std::os::unix::fs::OpenOptionsExt;

            let mut file = fs::OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(&path)?;
            file.write_all(contents.as_bytes())?;
        }

        #[cfg(not(unix))]
        {
            fs::write(&path, contents)
                .with_context(|| format!("Failed to write credentials to {path:?}"))?;
        }

        Ok(())
    }

    /// Look up a profile by name.
    pub fn get(&self, name: &str) -> Option<&Profile> {
        self.profiles.get(name)
    }

    /// Insert or replace a profile.
    pub fn set(&mut self, name: impl Into<String>, profile: Profile) {
        self.profiles.insert(name.into(), profile);
    }
}

/// A resolved session: endpoint plus credentials for one invocation.
#[derive(Debug, Clone)]
pub struct Session {
    pub api_url: String,
    pub token: Option<String>,
}

impl Session {
    /// Resolve a session from a named profile and the environment.
    ///
    /// An explicitly named profile must exist; the `default` profile is
    /// optional and falls back to built-in defaults. Environment variables
    /// win over profile values.
    pub fn from_profile(name: Option<&str>) -> Result<Self> {
        let store = CredentialStore::load()?;

        let profile = match name {
            Some(name) => store
                .get(name)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("Unknown profile '{name}'"))?,
            None => store.get(DEFAULT_PROFILE).cloned().unwrap_or_default(),
        };

        Ok(Self::from_parts(profile))
    }

    fn from_parts(profile: Profile) -> Self {
        let api_url = std::env::var(ENV_API_URL).unwrap_or(profile.api_url);
        let token = std::env::var(ENV_API_TOKEN).ok().or(profile.token);

        Self { api_url, token }
    }

    /// Build an HTTP provider client for this session.
    pub fn provider(&self) -> Result<HttpProvider> {
        HttpProvider::new(&self.api_url, self.token.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_store_has_no_profiles() {
        let store = CredentialStore::default();
        assert!(store.get(DEFAULT_PROFILE).is_none());
    }

    #[test]
    fn store_roundtrips_through_json() {
        let mut store = CredentialStore::default();
        store.set(
            "staging",
            Profile {
                api_url: "https://compute.staging.example.com".to_string(),
                token: Some("tok".to_string()),
            },
        );

        let json = serde_json::to_string(&store).unwrap();
        let parsed: CredentialStore = serde_json::from_str(&json).unwrap();

        let profile = parsed.get("staging").unwrap();
        assert_eq!(profile.api_url, "https://compute.staging.example.com");
        assert_eq!(profile.token.as_deref(), Some("tok"));
    }

    #[test]
    fn default_profile_falls_back_to_builtin_endpoint() {
        let profile = Profile::default();
        assert_eq!(profile.api_url, "http://localhost:8080");
        assert!(profile.token.is_none());
    }
}
