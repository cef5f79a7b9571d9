use super::{Tally, VideoId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Video {
    pub id: VideoId,
    pub outcome_id: i64,
    pub title: String,
    pub provider: String,
    pub provider_id: String,
    pub tally: Tally,
    pub revision: u64,
}

impl Video {
    /// Player embed address for the supported providers.
    pub fn embed_url(&self) -> Option<String> {
        match self.provider.as_str() {
            "youtube" => Some(format!("https://www.youtube.com/embed/{}", self.provider_id)),
            _ => None,
        }
    }

    pub fn thumbnail_url(&self) -> Option<String> {
        match self.provider.as_str() {
            "youtube" => Some(format!("https://img.youtube.com/vi/{}/default.jpg", self.provider_id)),
            _ => None,
        }
    }
}
