mod ids;
mod outcome;
mod tally;
mod user;
mod video;
mod vote;

pub use ids::{VideoId, ViewerId};
pub use outcome::{Outcome, OutcomePlaylist};
pub use tally::{Tally, TallyDelta, TallyPush};
pub use user::User;
pub use video::Video;
pub use vote::{VoteMark, VoteOutcome, VoteView};
