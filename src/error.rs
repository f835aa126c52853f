// Error taxonomy for a playlist generation run
//
// Collaborator failures (library, LLM, host application) are passed through
// untouched. Validation failures raised by the core carry enough context for
// the caller to explain what happened.

use crate::ai::EncodingTier;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    /// The library snapshot contained no tracks
    #[error("Your library appears to be empty")]
    EmptyLibrary,

    #[error("Library unavailable: {0}")]
    LibraryUnavailable(String),

    #[error("Rate limited by the model service: {0}")]
    RateLimited(String),

    #[error("Request too large: {0}")]
    RequestTooLarge(String),

    #[error("Model service error: {0}")]
    ServiceError(String),

    /// The reply did not follow the required structure
    #[error("Malformed model response ({library_size} tracks, {tier} tier): {reason}")]
    MalformedResponse {
        reason: String,
        library_size: usize,
        tier: EncodingTier,
    },

    /// Too many references in the reply could not be matched to the library
    #[error(
        "Could not match {unresolved} of {references} suggested tracks to the library \
         ({resolved} resolved, {duplicates} repeated, {library_size} tracks, {tier} tier)"
    )]
    ResolutionFailure {
        /// Distinct library tracks that were matched
        resolved: usize,
        unresolved: usize,
        duplicates: usize,
        references: usize,
        library_size: usize,
        tier: EncodingTier,
    },

    #[error("Target application unavailable: {0}")]
    TargetAppUnavailable(String),

    #[error("Failed to write playlist: {0}")]
    WriteFailure(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Credential error: {0}")]
    Credentials(String),
}

pub type Result<T> = std::result::Result<T, AgentError>;

impl AgentError {
    /// True for failures raised by the core's own validation rather than a collaborator
    pub fn is_validation_failure(&self) -> bool {
        matches!(
            self,
            AgentError::EmptyLibrary
                | AgentError::MalformedResponse { .. }
                | AgentError::ResolutionFailure { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_failure_message_has_counts() {
        let err = AgentError::ResolutionFailure {
            resolved: 3,
            unresolved: 6,
            duplicates: 1,
            references: 10,
            library_size: 120,
            tier: EncodingTier::Full,
        };

        let msg = err.to_string();
        assert!(msg.contains("6 of 10"));
        assert!(msg.contains("3 resolved, 1 repeated"));
        assert!(msg.contains("120 tracks"));
        assert!(msg.contains("full"));
        assert!(err.is_validation_failure());
    }

    #[test]
    fn test_collaborator_errors_are_not_validation_failures() {
        assert!(!AgentError::RateLimited("slow down".into()).is_validation_failure());
        assert!(!AgentError::WriteFailure("boom".into()).is_validation_failure());
    }
}
