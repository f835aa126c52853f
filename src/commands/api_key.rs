// Commands for API key management
//
// The key lives in the OS keychain; ANTHROPIC_API_KEY is only read, never written.

use crate::ai::credentials::{CredentialManager, KeySource, API_KEY_ENV};
use crate::error::Result;

/// Store the Anthropic API key
pub fn set_api_key(api_key: &str) -> Result<()> {
    CredentialManager::store_api_key(api_key)?;
    println!("✓ API key saved to keychain.");
    Ok(())
}

/// Delete the stored API key
pub fn delete_api_key() -> Result<()> {
    CredentialManager::delete_api_key()?;
    println!("✓ API key removed from keychain.");
    Ok(())
}

/// Report whether a key is available and where it comes from
pub fn api_key_status() -> Result<bool> {
    match CredentialManager::resolve_api_key() {
        Ok((_, KeySource::Keychain)) => {
            println!("✓ API key configured (keychain)");
            Ok(true)
        }
        Ok((_, KeySource::Environment)) => {
            println!("✓ API key configured ({})", API_KEY_ENV);
            Ok(true)
        }
        Err(e) => {
            println!("⚠ {}", e);
            Ok(false)
        }
    }
}
