// Secure credential storage for the Anthropic API key
//
// Uses OS-native secure storage:
// - macOS: Keychain
// - Windows: Credential Manager
// - Linux: Secret Service (GNOME/KDE)
// When the keychain has no entry, ANTHROPIC_API_KEY is used instead.

use crate::error::{AgentError, Result};
use keyring::Entry;
use tracing::{debug, info, warn};

const SERVICE_NAME: &str = "com.playlist-curator.app";
const API_KEY_NAME: &str = "anthropic_api_key";
pub const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

/// Where a resolved key came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    Keychain,
    Environment,
}

pub struct CredentialManager;

impl CredentialManager {
    /// Check the shape of a key before storing it
    pub fn validate_api_key(key: &str) -> Result<()> {
        // Claude keys start with "sk-ant-"
        if !key.starts_with("sk-ant-") {
            return Err(AgentError::Credentials(
                "Invalid API key format. Anthropic API keys should start with 'sk-ant-'".to_string(),
            ));
        }

        if key.len() < 20 {
            return Err(AgentError::Credentials(
                "API key appears too short. Please check and try again.".to_string(),
            ));
        }

        Ok(())
    }

    fn entry() -> Result<Entry> {
        Entry::new(SERVICE_NAME, API_KEY_NAME)
            .map_err(|e| AgentError::Credentials(format!("Failed to access keychain: {}", e)))
    }

    /// Store the API key in the OS keychain
    pub fn store_api_key(key: &str) -> Result<()> {
        let key = key.trim();
        Self::validate_api_key(key)?;

        Self::entry()?
            .set_password(key)
            .map_err(|e| AgentError::Credentials(format!("Failed to store API key: {}", e)))?;

        info!("API key stored in keychain");
        Ok(())
    }

    /// Retrieve the API key from the OS keychain
    pub fn retrieve_api_key() -> Result<Option<String>> {
        match Self::entry()?.get_password() {
            Ok(key) => {
                debug!("API key retrieved from keychain (length: {})", key.len());
                Ok(Some(key))
            }
            Err(keyring::Error::NoEntry) => {
                debug!("No API key found in keychain");
                Ok(None)
            }
            Err(e) => Err(AgentError::Credentials(format!("Failed to retrieve API key: {}", e))),
        }
    }

    /// Delete the API key from the OS keychain
    pub fn delete_api_key() -> Result<()> {
        Self::entry()?
            .delete_credential()
            .map_err(|e| AgentError::Credentials(format!("Failed to delete API key: {}", e)))?;

        info!("API key removed from keychain");
        Ok(())
    }

    /// Keychain first, then the environment
    pub fn resolve_api_key() -> Result<(String, KeySource)> {
        let from_keychain = match Self::retrieve_api_key() {
            Ok(key) => key,
            Err(e) => {
                // Keychain may be locked or missing on headless systems
                warn!("{}", e);
                None
            }
        };

        Self::pick_key(from_keychain, std::env::var(API_KEY_ENV).ok()).ok_or_else(|| {
            AgentError::Credentials(format!(
                "No API key configured. Run `playlist-curator set-key` or set {}.",
                API_KEY_ENV
            ))
        })
    }

    fn pick_key(keychain: Option<String>, env: Option<String>) -> Option<(String, KeySource)> {
        let non_empty = |k: Option<String>| k.map(|k| k.trim().to_string()).filter(|k| !k.is_empty());

        non_empty(keychain)
            .map(|k| (k, KeySource::Keychain))
            .or_else(|| non_empty(env).map(|k| (k, KeySource::Environment)))
    }
}
