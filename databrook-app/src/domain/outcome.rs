use super::Video;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Outcome {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
}

/// An outcome with its playlist, most upvoted first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomePlaylist {
    pub outcome: Outcome,
    pub videos: Vec<Video>,
}

impl OutcomePlaylist {
    /// The video shown in the main player when the page opens.
    pub fn default_selection(&self) -> Option<&Video> {
        self.videos.first()
    }
}
