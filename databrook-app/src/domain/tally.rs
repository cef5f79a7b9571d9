use super::{VideoId, VoteMark};
use serde::{Deserialize, Serialize};

/// Aggregate up/down counts for a video. A cached projection of server truth.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub up: u32,
    pub down: u32,
}

impl Tally {
    pub fn new(up: u32, down: u32) -> Self {
        Self { up, down }
    }

    pub fn apply(self, delta: TallyDelta) -> Self {
        Self {
            up: self.up.saturating_add_signed(delta.up),
            down: self.down.saturating_add_signed(delta.down),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TallyDelta {
    pub up: i32,
    pub down: i32,
}

impl TallyDelta {
    /// Signed change in the tally when a viewer's mark goes from `from` to `to`.
    /// A switch carries both halves in one delta.
    pub fn between(from: Option<VoteMark>, to: Option<VoteMark>) -> Self {
        let contribution = |mark: Option<VoteMark>| match mark {
            Some(VoteMark::Up) => (1, 0),
            Some(VoteMark::Down) => (0, 1),
            None => (0, 0),
        };
        let (from_up, from_down) = contribution(from);
        let (to_up, to_down) = contribution(to);
        Self {
            up: to_up - from_up,
            down: to_down - from_down,
        }
    }

    pub fn inverse(self) -> Self {
        Self {
            up: -self.up,
            down: -self.down,
        }
    }

    pub fn is_zero(self) -> bool {
        self.up == 0 && self.down == 0
    }
}

/// Realtime notification that the authoritative tally of a video changed.
///
/// `revision` increases with every change on the server; consumers use it to
/// drop duplicated or reordered deliveries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TallyPush {
    pub video_id: VideoId,
    pub tally: Tally,
    pub revision: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delta_for_every_transition() {
        use VoteMark::{Down, Up};
        let cases = [
            (None, Some(Up), (1, 0)),
            (None, Some(Down), (0, 1)),
            (Some(Up), None, (-1, 0)),
            (Some(Up), Some(Down), (-1, 1)),
            (Some(Down), None, (0, -1)),
            (Some(Down), Some(Up), (1, -1)),
            (Some(Up), Some(Up), (0, 0)),
        ];
        for (from, to, (up, down)) in cases {
            assert_eq!(TallyDelta::between(from, to), TallyDelta { up, down }, "{from:?} -> {to:?}");
        }
    }

    #[test]
    fn test_apply_never_goes_negative() {
        let tally = Tally::new(0, 1).apply(TallyDelta { up: -1, down: -1 });
        assert_eq!(tally, Tally::new(0, 0));
    }

    #[test]
    fn test_inverse_restores() {
        let start = Tally::new(6, 2);
        let delta = TallyDelta::between(Some(VoteMark::Up), Some(VoteMark::Down));
        let switched = start.apply(delta);
        assert_eq!(switched, Tally::new(5, 3));
        assert_eq!(switched.apply(delta.inverse()), start);
    }
}
