//! Content extraction for recording artifacts.
//!
//! Decompresses gzip artifacts when needed, parses line-delimited event
//! records, and strips terminal control sequences from payloads. Events
//! are best-effort: a malformed line is skipped without failing the
//! artifact. The first successfully parsed record of a stream is the
//! session header and is metadata-only.

use flate2::read::GzDecoder;
use std::io::Read;
use std::path::Path;

/// Channel an event payload was captured on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// Terminal output (`"o"`).
    Output,
    /// User input (`"i"`).
    Input,
}

/// One decoded event record: `[offset_secs, channel, payload]`.
#[derive(Debug, Clone)]
pub struct Event {
    pub time_offset: f64,
    pub channel: Channel,
    pub payload: String,
}

/// Extraction error (no panic; the indexer rolls back and skips the artifact).
#[derive(Debug)]
pub enum ExtractError {
    Read(std::io::Error),
    Decompress(std::io::Error),
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractError::Read(e) => write!(f, "failed to read recording: {}", e),
            ExtractError::Decompress(e) => write!(f, "failed to decompress recording: {}", e),
        }
    }
}

impl std::error::Error for ExtractError {}

/// Read and decode every well-formed event in an artifact, in file order.
///
/// Compressed artifacts are decompressed fully into memory before parsing.
/// The returned stream still includes the header record at index 0.
pub fn read_events(path: &Path, compressed: bool) -> Result<Vec<Event>, ExtractError> {
    let content = if compressed {
        let file = std::fs::File::open(path).map_err(ExtractError::Read)?;
        let mut decoder = GzDecoder::new(file);
        let mut content = String::new();
        decoder
            .read_to_string(&mut content)
            .map_err(ExtractError::Decompress)?;
        content
    } else {
        std::fs::read_to_string(path).map_err(ExtractError::Read)?
    };

    Ok(content.lines().filter_map(parse_event_line).collect())
}

/// Decode one `[offset, "o"|"i", payload]` line. `None` for anything else.
pub fn parse_event_line(line: &str) -> Option<Event> {
    let value: serde_json::Value = serde_json::from_str(line).ok()?;
    let parts = value.as_array()?;
    if parts.len() < 3 {
        return None;
    }

    let time_offset = parts[0].as_f64()?;
    let channel = match parts[1].as_str()? {
        "o" => Channel::Output,
        "i" => Channel::Input,
        _ => return None,
    };
    let payload = parts[2].as_str()?.to_string();

    Some(Event {
        time_offset,
        channel,
        payload,
    })
}

/// Strip terminal control sequences from a payload.
///
/// Removes CSI sequences, OSC sequences (both `BEL` and `ESC \` terminated),
/// single-character escape codes, carriage returns, and raw control bytes.
/// Newlines and tabs are kept.
pub fn strip_controls(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\x1b' => match chars.peek() {
                Some('[') => {
                    chars.next();
                    // CSI: parameter and intermediate bytes, then a final
                    // byte in 0x40..=0x7e
                    for c in chars.by_ref() {
                        if ('\x40'..='\x7e').contains(&c) {
                            break;
                        }
                    }
                }
                Some(']') => {
                    chars.next();
                    // OSC: terminated by BEL or ESC \
                    while let Some(c) = chars.next() {
                        if c == '\x07' {
                            break;
                        }
                        if c == '\x1b' {
                            if chars.peek() == Some(&'\\') {
                                chars.next();
                            }
                            break;
                        }
                    }
                }
                Some(_) => {
                    // Single-character escape code
                    chars.next();
                }
                None => {}
            },
            '\r' => {}
            c if c.is_control() && c != '\n' && c != '\t' => {}
            c => out.push(c),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_output_event() {
        let event = parse_event_line(r#"[1.25, "o", "hello"]"#).unwrap();
        assert_eq!(event.time_offset, 1.25);
        assert_eq!(event.channel, Channel::Output);
        assert_eq!(event.payload, "hello");
    }

    #[test]
    fn test_parse_input_event() {
        let event = parse_event_line(r#"[0.5, "i", "ls -la\r"]"#).unwrap();
        assert_eq!(event.channel, Channel::Input);
    }

    #[test]
    fn test_parse_rejects_malformed_lines() {
        assert!(parse_event_line("not json").is_none());
        assert!(parse_event_line(r#"{"version": 2}"#).is_none());
        assert!(parse_event_line(r#"[1.0, "o"]"#).is_none());
        assert!(parse_event_line(r#"["x", "o", "text"]"#).is_none());
        assert!(parse_event_line(r#"[1.0, "resize", "80x24"]"#).is_none());
        assert!(parse_event_line(r#"[1.0, "o", 42]"#).is_none());
    }

    #[test]
    fn test_strip_csi_color() {
        assert_eq!(strip_controls("\x1b[31mred\x1b[0m"), "red");
        assert_eq!(strip_controls("\x1b[1;32mbold green\x1b[39;49m"), "bold green");
    }

    #[test]
    fn test_strip_csi_followed_by_text() {
        // CSI color sequence immediately followed by printable text must
        // leave no residual escape bytes
        let stripped = strip_controls("\x1b[32mOK\x1b[0m build passed");
        assert_eq!(stripped, "OK build passed");
        assert!(!stripped.contains('\x1b'));
    }

    #[test]
    fn test_strip_osc_bel_terminated() {
        assert_eq!(strip_controls("\x1b]0;my title\x07prompt$"), "prompt$");
    }

    #[test]
    fn test_strip_osc_st_terminated() {
        assert_eq!(strip_controls("\x1b]2;title\x1b\\prompt$"), "prompt$");
    }

    #[test]
    fn test_strip_single_char_escape() {
        assert_eq!(strip_controls("\x1bMline"), "line");
        assert_eq!(strip_controls("\x1b7saved\x1b8"), "saved");
    }

    #[test]
    fn test_strip_carriage_returns_and_control_bytes() {
        assert_eq!(strip_controls("progress\rdone"), "progressdone");
        assert_eq!(strip_controls("a\x07b\x08c"), "abc");
    }

    #[test]
    fn test_strip_keeps_newlines_and_tabs() {
        assert_eq!(strip_controls("col1\tcol2\nrow2"), "col1\tcol2\nrow2");
    }

    #[test]
    fn test_strip_trailing_escape() {
        assert_eq!(strip_controls("text\x1b"), "text");
    }

    #[test]
    fn test_read_events_plain() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("session.cast");
        std::fs::write(
            &path,
            "[0, \"o\", \"header\"]\n[0.5, \"o\", \"hello\"]\ngarbage\n[1.0, \"i\", \"ls\"]\n",
        )
        .unwrap();

        let events = read_events(&path, false).unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].payload, "header");
        assert_eq!(events[2].channel, Channel::Input);
    }

    #[test]
    fn test_read_events_gzip() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("session.cast.gz");

        let file = std::fs::File::create(&path).unwrap();
        let mut encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
        encoder
            .write_all(b"[0, \"o\", \"header\"]\n[0.5, \"o\", \"compressed text\"]\n")
            .unwrap();
        encoder.finish().unwrap();

        let events = read_events(&path, true).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].payload, "compressed text");
    }

    #[test]
    fn test_read_events_corrupt_gzip() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("session.cast.gz");
        std::fs::write(&path, "this is not gzip data").unwrap();

        assert!(matches!(
            read_events(&path, true),
            Err(ExtractError::Decompress(_))
        ));
    }

    #[test]
    fn test_read_events_missing_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("absent.cast");
        assert!(matches!(
            read_events(&path, false),
            Err(ExtractError::Read(_))
        ));
    }
}
