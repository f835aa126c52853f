// Reply parser
//
// Reads the line-oriented reply the system prompt asks for:
//
//   PLAYLIST: <name>
//   TRACKS:
//   <index>|<title>|<artist>
//   RATIONALE: <text>
//
// Markers are matched case-insensitively and may carry markdown emphasis.
// A surrounding code fence is stripped. Nothing else is scanned for meaning.

use super::system_prompt::{PLAYLIST_MARKER, RATIONALE_MARKER, TRACKS_MARKER};

/// One track the model picked, as written in its reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackReference {
    /// Catalog index, when the model echoed one
    pub index: Option<usize>,
    pub title: String,
    pub artist: String,
}

impl TrackReference {
    pub fn named(title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            index: None,
            title: title.into(),
            artist: artist.into(),
        }
    }

    pub fn has_name(&self) -> bool {
        !self.title.trim().is_empty()
    }
}

/// Parsed but not yet validated against the library
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSelection {
    pub playlist_name: Option<String>,
    pub references: Vec<TrackReference>,
    pub rationale: String,
}

#[derive(Clone, Copy, PartialEq)]
enum Section {
    Preamble,
    Tracks,
    Rationale,
}

/// Parse the model reply. The error is a human-readable reason.
pub fn parse_reply(raw: &str) -> Result<ModelSelection, String> {
    let body = strip_code_fence(raw);

    let mut section = Section::Preamble;
    let mut saw_tracks = false;
    let mut saw_rationale = false;
    let mut playlist_name = None;
    let mut references = Vec::new();
    let mut rationale: Vec<&str> = Vec::new();

    for line in body.lines() {
        if let Some(rest) = marker_rest(line, PLAYLIST_MARKER) {
            if !rest.is_empty() {
                playlist_name = Some(rest.to_string());
            }
            section = Section::Preamble;
            continue;
        }
        if let Some(rest) = marker_rest(line, TRACKS_MARKER) {
            saw_tracks = true;
            section = Section::Tracks;
            if let Some(reference) = parse_reference(rest) {
                references.push(reference);
            }
            continue;
        }
        if let Some(rest) = marker_rest(line, RATIONALE_MARKER) {
            saw_rationale = true;
            section = Section::Rationale;
            if !rest.is_empty() {
                rationale.push(rest);
            }
            continue;
        }

        match section {
            Section::Tracks => {
                if let Some(reference) = parse_reference(line) {
                    references.push(reference);
                }
            }
            Section::Rationale => {
                let text = line.trim();
                if !text.is_empty() {
                    rationale.push(text);
                }
            }
            Section::Preamble => {}
        }
    }

    if !saw_tracks {
        return Err(format!("missing '{}' marker", TRACKS_MARKER));
    }
    if !saw_rationale {
        return Err(format!("missing '{}' marker", RATIONALE_MARKER));
    }
    let rationale = rationale.join(" ");
    if rationale.is_empty() {
        return Err("rationale block is empty".to_string());
    }
    if references.is_empty() {
        return Err("reply lists no tracks".to_string());
    }

    Ok(ModelSelection {
        playlist_name,
        references,
        rationale,
    })
}

/// Remove a wrapping ``` fence (with or without a language tag)
fn strip_code_fence(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```") {
        text = match rest.find('\n') {
            Some(newline) => &rest[newline + 1..],
            None => "",
        };
    }
    if let Some(rest) = text.trim_end().strip_suffix("```") {
        text = rest;
    }
    text
}

/// If `line` starts with `marker`, the text after it
fn marker_rest<'a>(line: &'a str, marker: &str) -> Option<&'a str> {
    let line = line.trim().trim_start_matches(['*', '#', '_']).trim_start();
    let head = line.get(..marker.len())?;
    if !head.eq_ignore_ascii_case(marker) {
        return None;
    }
    Some(line[marker.len()..].trim_matches(['*', '_']).trim())
}

/// Drop list bullets and "3." / "3)" numbering in front of a reference
fn strip_list_prefix(line: &str) -> &str {
    let line = line.trim();
    for bullet in ["- ", "* ", "• "] {
        if let Some(rest) = line.strip_prefix(bullet) {
            return rest.trim_start();
        }
    }

    let digits = line.len() - line.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(after) = rest.strip_prefix(". ").or_else(|| rest.strip_prefix(") ")) {
            return after.trim_start();
        }
    }
    line
}

fn parse_reference(line: &str) -> Option<TrackReference> {
    let line = strip_list_prefix(line);
    if line.is_empty() {
        return None;
    }

    let fields: Vec<&str> = line.split('|').map(str::trim).collect();
    let index = fields[0].parse::<usize>().ok();

    let reference = match (fields.len(), index) {
        (1, Some(index)) => TrackReference {
            index: Some(index),
            title: String::new(),
            artist: String::new(),
        },
        (1, None) => TrackReference::named(fields[0], ""),
        (2, _) => TrackReference::named(fields[0], fields[1]),
        (_, Some(index)) => TrackReference {
            index: Some(index),
            title: fields[1].to_string(),
            artist: fields[2].to_string(),
        },
        (_, None) => TrackReference::named(fields[0], fields[1]),
    };
    Some(reference)
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPLY: &str = "PLAYLIST: Rainy Sunday
TRACKS:
0|Teardrop|Massive Attack
4|Glory Box|Portishead
RATIONALE: Slow trip-hop for a grey afternoon.";

    #[test]
    fn test_parse_well_formed_reply() {
        let selection = parse_reply(REPLY).unwrap();

        assert_eq!(selection.playlist_name.as_deref(), Some("Rainy Sunday"));
        assert_eq!(selection.references.len(), 2);
        assert_eq!(
            selection.references[1],
            TrackReference {
                index: Some(4),
                title: "Glory Box".to_string(),
                artist: "Portishead".to_string(),
            }
        );
        assert_eq!(selection.rationale, "Slow trip-hop for a grey afternoon.");
    }

    #[test]
    fn test_parse_fenced_reply_with_chatter() {
        let selection = parse_reply(&format!("```\n{}\n```", REPLY)).unwrap();
        assert_eq!(selection.references.len(), 2);

        let raw = format!("Sure! Here it is:\n```text\n{}\n```", REPLY);
        let selection = parse_reply(&raw).unwrap();
        assert_eq!(selection.references.len(), 2);
        assert_eq!(selection.playlist_name.as_deref(), Some("Rainy Sunday"));
    }

    #[test]
    fn test_parse_markdown_markers_and_bullets() {
        let raw = "**PLAYLIST:** Mix
**Tracks:**
1. 0|Teardrop|Massive Attack
- Glory Box|Portishead
* 7
**Rationale:**
Moody.
Very moody.";
        let selection = parse_reply(raw).unwrap();

        assert_eq!(selection.playlist_name.as_deref(), Some("Mix"));
        assert_eq!(selection.references[0].index, Some(0));
        assert_eq!(selection.references[1], TrackReference::named("Glory Box", "Portishead"));
        assert_eq!(selection.references[2].index, Some(7));
        assert!(!selection.references[2].has_name());
        assert_eq!(selection.rationale, "Moody. Very moody.");
    }

    #[test]
    fn test_full_tier_echo_keeps_title_and_artist() {
        let raw = "TRACKS:\n3|Teardrop|Massive Attack|Mezzanine|Trip Hop|1998|★5|▶31\nRATIONALE: ok";
        let selection = parse_reply(raw).unwrap();
        assert_eq!(selection.references[0].title, "Teardrop");
        assert_eq!(selection.references[0].artist, "Massive Attack");
        assert_eq!(selection.playlist_name, None);
    }

    #[test]
    fn test_missing_tracks_marker() {
        let err = parse_reply("PLAYLIST: x\nRATIONALE: because").unwrap_err();
        assert!(err.contains("TRACKS:"));
    }

    #[test]
    fn test_missing_rationale_marker() {
        let err = parse_reply("TRACKS:\n1|a|b").unwrap_err();
        assert!(err.contains("RATIONALE:"));
    }

    #[test]
    fn test_empty_rationale() {
        let err = parse_reply("TRACKS:\n1|a|b\nRATIONALE:   \n").unwrap_err();
        assert!(err.contains("empty"));
    }

    #[test]
    fn test_no_references() {
        let err = parse_reply("TRACKS:\n\nRATIONALE: nothing fits").unwrap_err();
        assert!(err.contains("no tracks"));
    }

    #[test]
    fn test_free_text_reply_is_rejected() {
        let err = parse_reply("I think you'd enjoy some Radiohead and Bjork.").unwrap_err();
        assert!(err.contains("TRACKS:"));
    }
}
