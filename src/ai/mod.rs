// AI module: everything between the library snapshot and the playlist
//
// This module provides:
// - Size-tiered sampling of the library
// - Catalog and prompt building for the model
// - Claude API client and a canned client
// - Reply parsing and reconciliation against the library
// - Secure credential storage via OS keychain

pub mod claude_client;
pub mod context_builder;
pub mod credentials;
pub mod mock;
pub mod reconciler;
pub mod response;
pub mod sampler;
pub mod system_prompt;

// Re-export commonly used types
pub use claude_client::{ClaudeClient, LlmClient};
pub use context_builder::{PromptRequest, TrackContextBuilder};
pub use credentials::CredentialManager;
pub use reconciler::{reconcile, ResolvedPlaylist};
pub use response::{parse_reply, ModelSelection, TrackReference};
pub use sampler::{sample, EncodingTier, Sample};
