// Agent configuration
//
// Every tunable limit used by a generation run lives in `AgentConfig`, which
// is passed explicitly to the entry point. Configuration can be loaded from:
// - a TOML file (default: `<config dir>/playlist-curator/config.toml`)
// - environment variables (`CURATOR_*` prefixed), applied on top
//
// ```toml
// model_id = "claude-haiku-4-5-20251001"
// max_tracks_full = 1500
// max_tracks_compact = 4000
// randomize = false
// ```

use crate::error::{AgentError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const DEFAULT_MODEL: &str = "claude-haiku-4-5-20251001";
pub const DEFAULT_API_BASE_URL: &str = "https://api.anthropic.com";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub model_id: String,
    pub max_output_tokens: u32,
    pub api_base_url: String,
    pub request_timeout_secs: u64,

    /// Libraries up to this size are sent with full metadata
    pub max_tracks_full: usize,
    /// Libraries up to this size are sent whole with title and artist only
    pub max_tracks_compact: usize,
    /// Most-played tracks always kept when sampling
    pub top_played_sample: usize,
    /// Tracks drawn at random from the rest when sampling
    pub random_sample: usize,

    pub default_track_count: usize,
    pub max_track_count: usize,

    /// Per-field character cap inside the catalog
    pub max_field_chars: usize,
    /// Upper bound on the catalog text sent in one request
    pub max_prompt_chars: usize,

    /// Fail the run when more than this share of references can't be matched
    pub max_unresolved_fraction: f64,
    pub randomize: bool,
    pub default_playlist_name: String,

    /// Name of the host application driven over AppleScript
    pub host_app: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model_id: DEFAULT_MODEL.to_string(),
            max_output_tokens: 4096,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_secs: 120,
            max_tracks_full: 1500,
            max_tracks_compact: 4000,
            top_played_sample: 2000,
            random_sample: 2000,
            default_track_count: 50,
            max_track_count: 500,
            max_field_chars: 120,
            max_prompt_chars: 600_000,
            max_unresolved_fraction: 0.5,
            randomize: true,
            default_playlist_name: "AI Playlist".to_string(),
            host_app: "Swinsian".to_string(),
        }
    }
}

impl AgentConfig {
    /// Default config file location for this platform
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "playlist-curator")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load from `path` (or the default location), apply env overrides, validate.
    ///
    /// A missing default file is not an error; an explicitly requested one is.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                Some(path) => {
                    debug!("No config file at {}, using defaults", path.display());
                    Self::default()
                }
                None => Self::default(),
            },
        };

        config.apply_env_overrides(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        info!("Loading config from {}", path.display());
        let content = std::fs::read_to_string(path).map_err(|e| {
            AgentError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        toml::from_str(&content)
            .map_err(|e| AgentError::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }

    /// Apply `CURATOR_*` overrides. The lookup is injected so tests don't touch the process env.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("CURATOR_MODEL") {
            self.model_id = v;
        }
        if let Some(v) = lookup("CURATOR_API_BASE_URL") {
            self.api_base_url = v;
        }
        if let Some(v) = lookup("CURATOR_HOST_APP") {
            self.host_app = v;
        }
        if let Some(v) = lookup("CURATOR_PLAYLIST_NAME") {
            self.default_playlist_name = v;
        }

        parse_override(&lookup, "CURATOR_MAX_OUTPUT_TOKENS", &mut self.max_output_tokens)?;
        parse_override(&lookup, "CURATOR_REQUEST_TIMEOUT_SECS", &mut self.request_timeout_secs)?;
        parse_override(&lookup, "CURATOR_MAX_TRACKS_FULL", &mut self.max_tracks_full)?;
        parse_override(&lookup, "CURATOR_MAX_TRACKS_COMPACT", &mut self.max_tracks_compact)?;
        parse_override(&lookup, "CURATOR_TOP_PLAYED_SAMPLE", &mut self.top_played_sample)?;
        parse_override(&lookup, "CURATOR_RANDOM_SAMPLE", &mut self.random_sample)?;
        parse_override(&lookup, "CURATOR_TRACK_COUNT", &mut self.default_track_count)?;
        parse_override(&lookup, "CURATOR_MAX_TRACK_COUNT", &mut self.max_track_count)?;
        parse_override(&lookup, "CURATOR_MAX_FIELD_CHARS", &mut self.max_field_chars)?;
        parse_override(&lookup, "CURATOR_MAX_PROMPT_CHARS", &mut self.max_prompt_chars)?;
        parse_override(&lookup, "CURATOR_MAX_UNRESOLVED_FRACTION", &mut self.max_unresolved_fraction)?;
        parse_override(&lookup, "CURATOR_RANDOMIZE", &mut self.randomize)?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.model_id.trim().is_empty() {
            return Err(AgentError::Config("model_id cannot be empty".to_string()));
        }
        if self.max_output_tokens == 0 {
            return Err(AgentError::Config("max_output_tokens must be positive".to_string()));
        }
        if self.max_tracks_full > self.max_tracks_compact {
            return Err(AgentError::Config(format!(
                "max_tracks_full ({}) cannot exceed max_tracks_compact ({})",
                self.max_tracks_full, self.max_tracks_compact
            )));
        }
        if self.top_played_sample + self.random_sample > self.max_tracks_compact {
            return Err(AgentError::Config(format!(
                "top_played_sample + random_sample ({}) cannot exceed max_tracks_compact ({})",
                self.top_played_sample + self.random_sample,
                self.max_tracks_compact
            )));
        }
        if self.top_played_sample + self.random_sample == 0 {
            return Err(AgentError::Config("sample sizes cannot both be zero".to_string()));
        }
        if self.default_track_count == 0 || self.default_track_count > self.max_track_count {
            return Err(AgentError::Config(format!(
                "default_track_count must be between 1 and {}",
                self.max_track_count
            )));
        }
        if self.max_field_chars < 8 {
            return Err(AgentError::Config("max_field_chars must be at least 8".to_string()));
        }
        if !(0.0..=1.0).contains(&self.max_unresolved_fraction) {
            return Err(AgentError::Config(format!(
                "max_unresolved_fraction must be within 0.0..=1.0, got {}",
                self.max_unresolved_fraction
            )));
        }
        Ok(())
    }

    /// Validate a per-run track count request
    pub fn check_track_count(&self, count: usize) -> Result<usize> {
        if count == 0 || count > self.max_track_count {
            return Err(AgentError::Config(format!(
                "Number of songs must be between 1 and {}",
                self.max_track_count
            )));
        }
        Ok(count)
    }
}

fn parse_override<F, T>(lookup: &F, key: &str, target: &mut T) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    if let Some(raw) = lookup(key) {
        *target = raw
            .trim()
            .parse()
            .map_err(|_| AgentError::Config(format!("Invalid value for {}: '{}'", key, raw)))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = AgentConfig::default();
        config.validate().unwrap();
        assert_eq!(config.max_tracks_full, 1500);
        assert_eq!(config.max_tracks_compact, 4000);
        assert_eq!(config.top_played_sample, 2000);
        assert_eq!(config.random_sample, 2000);
        assert_eq!(config.model_id, DEFAULT_MODEL);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_tracks_full = 200\nrandomize = false").unwrap();

        let config = AgentConfig::from_file(file.path()).unwrap();
        assert_eq!(config.max_tracks_full, 200);
        assert!(!config.randomize);
        assert_eq!(config.max_tracks_compact, 4000);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_tracks_full = \"lots\"").unwrap();

        let err = AgentConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, AgentError::Config(_)));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AgentConfig::default();
        config
            .apply_env_overrides(lookup_from(&[
                ("CURATOR_MODEL", "claude-sonnet-4-5"),
                ("CURATOR_MAX_TRACKS_COMPACT", "5000"),
                ("CURATOR_RANDOMIZE", "false"),
            ]))
            .unwrap();

        assert_eq!(config.model_id, "claude-sonnet-4-5");
        assert_eq!(config.max_tracks_compact, 5000);
        assert!(!config.randomize);
    }

    #[test]
    fn test_env_override_rejects_garbage() {
        let mut config = AgentConfig::default();
        let err = config
            .apply_env_overrides(lookup_from(&[("CURATOR_RANDOM_SAMPLE", "many")]))
            .unwrap_err();
        assert!(err.to_string().contains("CURATOR_RANDOM_SAMPLE"));
    }

    #[test]
    fn test_validate_threshold_order() {
        let config = AgentConfig {
            max_tracks_full: 5000,
            ..AgentConfig::default()
        };
        assert!(config.validate().is_err());

        let config = AgentConfig {
            top_played_sample: 3000,
            ..AgentConfig::default()
        };
        assert!(config.validate().is_err());

        let config = AgentConfig {
            max_unresolved_fraction: 1.5,
            ..AgentConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_check_track_count() {
        let config = AgentConfig::default();
        assert_eq!(config.check_track_count(100).unwrap(), 100);
        assert!(config.check_track_count(0).is_err());
        assert!(config.check_track_count(501).is_err());
    }
}
