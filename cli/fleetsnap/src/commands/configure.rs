//! Configure credential profiles.

use anyhow::Result;
use clap::Args;
use fleet_provider::{CredentialStore, Profile, DEFAULT_PROFILE};

use crate::output::print_success;

use super::CommandContext;

/// Save a credential profile for later runs.
///
/// Writes to the profile named by the global `--profile` flag, or to
/// `default` when none is given.
#[derive(Debug, Args)]
pub struct ConfigureCommand {
    /// API endpoint URL.
    #[arg(long)]
    api_url: String,

    /// Bearer token for the endpoint.
    #[arg(long)]
    token: Option<String>,
}

impl ConfigureCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        let name = ctx.profile.as_deref().unwrap_or(DEFAULT_PROFILE).to_string();

        let mut store = CredentialStore::load()?;
        apply(&mut store, &name, self.api_url, self.token);
        store.save()?;

        print_success(&format!("Saved profile '{name}'"));
        Ok(())
    }
}

fn apply(store: &mut CredentialStore, name: &str, api_url: String, token: Option<String>) {
    store.set(name, Profile { api_url, token });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_writes_the_named_profile() {
        let mut store = CredentialStore::default();

        apply(
            &mut store,
            "staging",
            "https://compute.staging.example.com".to_string(),
            Some("tok".to_string()),
        );

        let profile = store.get("staging").unwrap();
        assert_eq!(profile.api_url, "https://compute.staging.example.com");
        assert_eq!(profile.token.as_deref(), Some("tok"));
    }

    #[test]
    fn apply_replaces_an_existing_profile() {
        let mut store = CredentialStore::default();
        apply(&mut store, DEFAULT_PROFILE, "http://old".to_string(), None);
        apply(
            &mut store,
            DEFAULT_PROFILE,
            "http://new".to_string(),
            Some("tok".to_string()),
        );

        let profile = store.get(DEFAULT_PROFILE).unwrap();
        assert_eq!(profile.api_url, "http://new");
        assert_eq!(profile.token.as_deref(), Some("tok"));
    }
}
