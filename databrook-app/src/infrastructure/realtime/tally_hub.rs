use crate::application::TallyStream;
use crate::domain::{TallyPush, VideoId};
use dashmap::DashMap;
use futures::{future, StreamExt};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;

const CHANNEL_CAPACITY: usize = 64;

/// Fan-out of tally changes, one broadcast channel per watched video.
///
/// Channels are created on first subscription. A channel nobody listens to
/// any more is dropped by the next publish to it or the next subscription to
/// any video.
#[derive(Clone, Default)]
pub struct TallyHub {
    channels: Arc<DashMap<VideoId, broadcast::Sender<TallyPush>>>,
}

impl TallyHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of subscribers that received the push.
    pub fn publish(&self, push: TallyPush) -> usize {
        let sent = self
            .channels
            .get(&push.video_id)
            .map(|tx| tx.send(push).ok());

        match sent {
            Some(Some(receivers)) => receivers,
            Some(None) => {
                self.channels
                    .remove_if(&push.video_id, |_, tx| tx.receiver_count() == 0);
                0
            }
            None => 0,
        }
    }

    pub fn subscribe(&self, video: VideoId) -> broadcast::Receiver<TallyPush> {
        self.prune();
        self.channels
            .entry(video)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Subscription as a stream. A lagging subscriber skips the missed pushes;
    /// the next one it sees carries the newest tally anyway.
    pub fn stream(&self, video: VideoId) -> TallyStream {
        BroadcastStream::new(self.subscribe(video))
            .filter_map(move |item| {
                future::ready(match item {
                    Ok(push) => Some(push),
                    Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                        tracing::debug!(video_id = %video, skipped, "tally subscriber lagged");
                        None
                    }
                })
            })
            .boxed()
    }

    fn prune(&self) {
        self.channels.retain(|_, tx| tx.receiver_count() > 0);
    }

    pub fn subscriber_count(&self, video: VideoId) -> usize {
        self.channels
            .get(&video)
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }
}
