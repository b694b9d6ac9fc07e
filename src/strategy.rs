//! The closed set of indexing strategies.
//!
//! A strategy decides which events of a recording become fragments. Each
//! variant carries its own version string; bumping a version is the only
//! way to force that strategy's reapplication over already-indexed
//! artifacts. The active set for a run comes from
//! `indexer.current_strategies` in the config.

use crate::extract::Channel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Index every event payload after control-sequence stripping.
    PlainText,
    /// Index only input-channel events (typed commands).
    CommandInput,
}

impl Strategy {
    pub const ALL: [Strategy; 2] = [Strategy::PlainText, Strategy::CommandInput];

    pub fn id(&self) -> &'static str {
        match self {
            Strategy::PlainText => "plain_text",
            Strategy::CommandInput => "command_input",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Strategy::PlainText => "Plain Text",
            Strategy::CommandInput => "Command Input",
        }
    }

    pub fn version(&self) -> &'static str {
        match self {
            Strategy::PlainText => "2",
            Strategy::CommandInput => "1",
        }
    }

    pub fn from_id(id: &str) -> Option<Strategy> {
        Strategy::ALL.into_iter().find(|s| s.id() == id)
    }

    /// Whether events on `channel` contribute fragments under this strategy.
    pub fn accepts(&self, channel: Channel) -> bool {
        match self {
            Strategy::PlainText => true,
            Strategy::CommandInput => channel == Channel::Input,
        }
    }
}

/// Resolve the configured activation list against the declared strategies.
/// Unknown ids are skipped with a warning; this is non-fatal.
pub fn resolve_active(ids: &[String]) -> Vec<Strategy> {
    let mut active = Vec::new();
    for id in ids {
        match Strategy::from_id(id) {
            Some(strategy) => active.push(strategy),
            None => {
                eprintln!("Warning: unknown indexing strategy '{}', skipping", id);
            }
        }
    }
    active
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_round_trip() {
        for strategy in Strategy::ALL {
            assert_eq!(Strategy::from_id(strategy.id()), Some(strategy));
        }
    }

    #[test]
    fn test_unknown_id() {
        assert_eq!(Strategy::from_id("bogus"), None);
    }

    #[test]
    fn test_resolve_skips_unknown() {
        let ids = vec![
            "plain_text".to_string(),
            "bogus".to_string(),
            "command_input".to_string(),
        ];
        let active = resolve_active(&ids);
        assert_eq!(active, vec![Strategy::PlainText, Strategy::CommandInput]);
    }

    #[test]
    fn test_channel_filter() {
        assert!(Strategy::PlainText.accepts(Channel::Output));
        assert!(Strategy::PlainText.accepts(Channel::Input));
        assert!(!Strategy::CommandInput.accepts(Channel::Output));
        assert!(Strategy::CommandInput.accepts(Channel::Input));
    }
}
