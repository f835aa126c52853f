// Catalog and prompt builder
//
// Turns a candidate set into the compact pipe-separated catalog the model reads,
// and wraps it with the system instructions into one request payload.

use super::sampler::{EncodingTier, Sample};
use super::system_prompt::system_prompt;
use crate::config::AgentConfig;
use crate::error::{AgentError, Result};
use crate::library::TrackRecord;
use serde::Serialize;
use std::fmt::Write;
use tracing::debug;

const FULL_COLUMNS: &str = "index|title|artist|album|genre|year|rating|plays";
const COMPACT_COLUMNS: &str = "index|title|artist";

/// One request to the model: system instructions plus the user turn
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PromptRequest {
    pub system: String,
    pub user: String,
    /// Number of catalog lines embedded in `user`
    pub catalog_lines: usize,
}

/// Make a metadata field safe for one catalog cell.
///
/// Pipes become slashes, control characters and runs of whitespace collapse to a
/// single space, and the result is cut to `max_chars` characters.
pub fn sanitize_field(value: &str, max_chars: usize) -> String {
    let mut out = String::with_capacity(value.len().min(max_chars));
    let mut pending_space = false;
    let mut written = 0;

    for ch in value.chars() {
        let ch = if ch == '|' { '/' } else { ch };
        if ch.is_whitespace() || ch.is_control() {
            pending_space = written > 0;
            continue;
        }
        if pending_space {
            if written + 1 >= max_chars {
                break;
            }
            out.push(' ');
            written += 1;
            pending_space = false;
        }
        if written >= max_chars {
            break;
        }
        out.push(ch);
        written += 1;
    }

    out
}

/// Comparison key for loose title/artist matching
pub fn normalize_key(value: &str, max_chars: usize) -> String {
    sanitize_field(value, max_chars).to_lowercase()
}

pub struct TrackContextBuilder;

impl TrackContextBuilder {
    pub fn columns(tier: EncodingTier) -> &'static str {
        if tier.includes_metadata() {
            FULL_COLUMNS
        } else {
            COMPACT_COLUMNS
        }
    }

    /// One catalog line for the candidate at `index`
    pub fn catalog_line(index: usize, track: &TrackRecord, tier: EncodingTier, max_chars: usize) -> String {
        let mut line = format!(
            "{}|{}|{}",
            index,
            sanitize_field(&track.title, max_chars),
            sanitize_field(&track.artist, max_chars)
        );

        if tier.includes_metadata() {
            let optional = |v: &Option<String>| {
                v.as_deref()
                    .map(|s| sanitize_field(s, max_chars))
                    .unwrap_or_default()
            };
            let _ = write!(
                line,
                "|{}|{}|{}|★{}|▶{}",
                optional(&track.album),
                optional(&track.genre),
                track.year.map(|y| y.to_string()).unwrap_or_default(),
                track.rating.map(|r| r.to_string()).unwrap_or_default(),
                track.play_count
            );
        }

        line
    }

    /// Build the whole catalog block, one line per candidate in sample order
    pub fn build_catalog(sample: &Sample<'_>, max_chars: usize) -> String {
        let mut catalog = String::with_capacity(sample.len() * 48);
        for (index, track) in sample.candidates.iter().enumerate() {
            if index > 0 {
                catalog.push('\n');
            }
            catalog.push_str(&Self::catalog_line(index, track, sample.tier, max_chars));
        }
        catalog
    }

    /// Compose the request for `prompt`, asking for `count` tracks.
    ///
    /// Fails with `RequestTooLarge` before any network traffic when the catalog
    /// is over the configured budget.
    pub fn build_prompt(
        sample: &Sample<'_>,
        prompt: &str,
        count: usize,
        config: &AgentConfig,
    ) -> Result<PromptRequest> {
        let catalog = Self::build_catalog(sample, config.max_field_chars);
        if catalog.len() > config.max_prompt_chars {
            return Err(AgentError::RequestTooLarge(format!(
                "catalog of {} tracks is {} bytes, limit is {} ({} tier)",
                sample.len(),
                catalog.len(),
                config.max_prompt_chars,
                sample.tier
            )));
        }

        debug!(
            "Catalog built: {} lines, {} bytes, {} tier",
            sample.len(),
            catalog.len(),
            sample.tier
        );

        let user = format!(
            "User request: {}\n\nLibrary catalog ({}):\n{}",
            prompt.trim(),
            Self::columns(sample.tier),
            catalog
        );

        Ok(PromptRequest {
            system: system_prompt(count),
            user,
            catalog_lines: sample.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_of(tracks: &[TrackRecord], tier: EncodingTier) -> Sample<'_> {
        Sample {
            tier,
            candidates: tracks.iter().collect(),
            library_size: tracks.len(),
            top_played: 0,
        }
    }

    #[test]
    fn test_sanitize_field() {
        assert_eq!(sanitize_field("  Hello   World ", 50), "Hello World");
        assert_eq!(sanitize_field("AC|DC", 50), "AC/DC");
        assert_eq!(sanitize_field("line\nbreak\ttab", 50), "line break tab");
        assert_eq!(sanitize_field("abcdefghij", 4), "abcd");
        assert_eq!(sanitize_field("ab cdef", 3), "ab");
        assert_eq!(sanitize_field("", 10), "");
        assert_eq!(sanitize_field("Sigur Rós", 50), "Sigur Rós");
    }

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key("  The  BEATLES ", 50), normalize_key("the beatles", 50));
    }

    #[test]
    fn test_full_line_has_all_fields() {
        let track = TrackRecord::new("x", "Teardrop", "Massive Attack")
            .with_album("Mezzanine")
            .with_genre("Trip Hop")
            .with_year(1998)
            .with_rating(5)
            .with_play_count(31);

        let line = TrackContextBuilder::catalog_line(3, &track, EncodingTier::Full, 120);
        assert_eq!(line, "3|Teardrop|Massive Attack|Mezzanine|Trip Hop|1998|★5|▶31");
    }

    #[test]
    fn test_full_line_with_missing_fields() {
        let track = TrackRecord::new("x", "", "");
        let line = TrackContextBuilder::catalog_line(0, &track, EncodingTier::Full, 120);
        assert_eq!(line, "0|||||||★|▶0");
    }

    #[test]
    fn test_compact_line_omits_metadata_and_id() {
        let track = TrackRecord::new("secret-id", "Teardrop", "Massive Attack").with_album("Mezzanine");
        for tier in [EncodingTier::Compact, EncodingTier::Sampled] {
            let line = TrackContextBuilder::catalog_line(9, &track, tier, 120);
            assert_eq!(line, "9|Teardrop|Massive Attack");
        }
    }

    #[test]
    fn test_build_prompt() {
        let tracks = vec![
            TrackRecord::new("lib-001", "One", "U2"),
            TrackRecord::new("lib-002", "Two", "Me"),
        ];
        let sample = sample_of(&tracks, EncodingTier::Compact);
        let request =
            TrackContextBuilder::build_prompt(&sample, "  upbeat stuff ", 5, &AgentConfig::default()).unwrap();

        assert!(request.user.starts_with("User request: upbeat stuff\n"));
        assert!(request.user.contains("Library catalog (index|title|artist):\n0|One|U2\n1|Two|Me"));
        assert!(!request.user.contains("lib-00"));
        assert!(request.system.contains("Select 5 tracks"));
        assert_eq!(request.catalog_lines, 2);
    }

    #[test]
    fn test_oversized_catalog_is_rejected() {
        let tracks: Vec<TrackRecord> = (0..100)
            .map(|i| TrackRecord::new(i.to_string(), "A fairly long song title", "Somebody"))
            .collect();
        let sample = sample_of(&tracks, EncodingTier::Full);
        let config = AgentConfig {
            max_prompt_chars: 500,
            ..AgentConfig::default()
        };

        let err = TrackContextBuilder::build_prompt(&sample, "anything", 10, &config).unwrap_err();
        assert!(matches!(err, AgentError::RequestTooLarge(_)));
    }
}
