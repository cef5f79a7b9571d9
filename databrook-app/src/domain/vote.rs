use super::Tally;
use serde::{Deserialize, Serialize};

/// A viewer's recorded stance on a video. "No vote" is `Option::None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteMark {
    Up,
    Down,
}

impl VoteMark {
    /// Clicking the active mark clears it; clicking the other one switches directly.
    pub fn resolve(current: Option<VoteMark>, requested: VoteMark) -> Option<VoteMark> {
        if current == Some(requested) {
            None
        } else {
            Some(requested)
        }
    }

    pub fn value(self) -> i16 {
        match self {
            Self::Up => 1,
            Self::Down => -1,
        }
    }

    pub fn from_value(value: i16) -> Option<Self> {
        match value {
            1 => Some(Self::Up),
            -1 => Some(Self::Down),
            _ => None,
        }
    }
}

/// Result of applying a vote: mark and tally always move together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteOutcome {
    pub mark: Option<VoteMark>,
    pub tally: Tally,
}

/// What a vote affordance renders for one viewer and one video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteView {
    pub mark: Option<VoteMark>,
    pub tally: Tally,
    pub pending: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_follows_state_machine() {
        use VoteMark::{Down, Up};
        assert_eq!(VoteMark::resolve(None, Up), Some(Up));
        assert_eq!(VoteMark::resolve(None, Down), Some(Down));
        assert_eq!(VoteMark::resolve(Some(Up), Up), None);
        assert_eq!(VoteMark::resolve(Some(Up), Down), Some(Down));
        assert_eq!(VoteMark::resolve(Some(Down), Down), None);
        assert_eq!(VoteMark::resolve(Some(Down), Up), Some(Up));
    }

    #[test]
    fn test_repeated_clicks_alternate() {
        let mut mark = None;
        for i in 0..7 {
            mark = VoteMark::resolve(mark, VoteMark::Down);
            let expected = if i % 2 == 0 { Some(VoteMark::Down) } else { None };
            assert_eq!(mark, expected);
        }
    }

    #[test]
    fn test_stored_value() {
        assert_eq!(VoteMark::from_value(VoteMark::Up.value()), Some(VoteMark::Up));
        assert_eq!(VoteMark::from_value(VoteMark::Down.value()), Some(VoteMark::Down));
        assert_eq!(VoteMark::from_value(0), None);
    }

    #[test]
    fn test_wire_names() {
        assert_eq!(serde_json::to_string(&VoteMark::Up).unwrap(), "\"up\"");
        let mark: Option<VoteMark> = serde_json::from_str("null").unwrap();
        assert_eq!(mark, None);
    }
}
