use crate::application::{TallyStream, VoteStore};
use crate::domain::{Tally, TallyDelta, TallyPush, VideoId, ViewerId, VoteMark};
use crate::infrastructure::realtime::TallyHub;
use async_trait::async_trait;
use databrook_errors::AppError;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// A write the store received, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Upsert(ViewerId, VideoId, VoteMark),
    Delete(ViewerId, VideoId),
}

#[derive(Default)]
struct MemoryState {
    videos: HashMap<VideoId, (Tally, u64)>,
    marks: HashMap<(ViewerId, VideoId), VoteMark>,
    calls: Vec<StoreCall>,
    read_latency: Duration,
    write_latency: Duration,
}

/// Vote store kept in memory with the same tally bookkeeping as the database
/// store. Reads and writes can be slowed down or made to fail.
#[derive(Default)]
pub struct MemoryVoteStore {
    state: Mutex<MemoryState>,
    hub: TallyHub,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    reads: AtomicUsize,
}

impl MemoryVoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hub(hub: TallyHub) -> Self {
        Self {
            hub,
            ..Self::default()
        }
    }

    pub fn insert_video(&self, video: VideoId, tally: Tally, revision: u64) {
        self.lock().videos.insert(video, (tally, revision));
    }

    /// Seed a mark record without touching the tally.
    pub fn set_stored_mark(&self, viewer: ViewerId, video: VideoId, mark: VoteMark) {
        self.lock().marks.insert((viewer, video), mark);
    }

    pub fn stored_mark(&self, viewer: ViewerId, video: VideoId) -> Option<VoteMark> {
        self.lock().marks.get(&(viewer, video)).copied()
    }

    pub fn tally(&self, video: VideoId) -> Option<Tally> {
        self.lock().videos.get(&video).map(|(tally, _)| *tally)
    }

    /// Simulate another viewer changing the tally: bump the revision and push.
    pub fn publish_external(&self, video: VideoId, tally: Tally) -> TallyPush {
        let push = {
            let mut state = self.lock();
            let entry = state.videos.entry(video).or_insert((Tally::default(), 0));
            entry.0 = tally;
            entry.1 += 1;
            TallyPush {
                video_id: video,
                tally,
                revision: entry.1,
            }
        };
        self.hub.publish(push);
        push
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.lock().calls.clone()
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn set_read_latency(&self, latency: Duration) {
        self.lock().read_latency = latency;
    }

    pub fn set_write_latency(&self, latency: Duration) {
        self.lock().write_latency = latency;
    }

    async fn write(&self, call: StoreCall) -> Result<TallyPush, AppError> {
        let latency = {
            let mut state = self.lock();
            state.calls.push(call.clone());
            state.write_latency
        };
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::RemotePersistFailure("store unavailable".to_string()));
        }

        let push = {
            let mut state = self.lock();
            let (viewer, video, mark) = match call {
                StoreCall::Upsert(viewer, video, mark) => (viewer, video, Some(mark)),
                StoreCall::Delete(viewer, video) => (viewer, video, None),
            };
            if !state.videos.contains_key(&video) {
                return Err(AppError::NotFound);
            }
            let previous = match mark {
                Some(mark) => state.marks.insert((viewer, video), mark),
                None => state.marks.remove(&(viewer, video)),
            };
            let delta = TallyDelta::between(previous, mark);
            let Some(entry) = state.videos.get_mut(&video) else {
                return Err(AppError::NotFound);
            };
            if !delta.is_zero() {
                entry.0 = entry.0.apply(delta);
                entry.1 += 1;
            }
            TallyPush {
                video_id: video,
                tally: entry.0,
                revision: entry.1,
            }
        };
        self.hub.publish(push);
        Ok(push)
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl VoteStore for MemoryVoteStore {
    async fn read_mark(&self, viewer: ViewerId, video: VideoId) -> Result<Option<VoteMark>, AppError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let latency = self.lock().read_latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(AppError::RemoteReadFailure("store unavailable".to_string()));
        }
        Ok(self.stored_mark(viewer, video))
    }

    async fn upsert_mark(
        &self,
        viewer: ViewerId,
        video: VideoId,
        mark: VoteMark,
    ) -> Result<TallyPush, AppError> {
        self.write(StoreCall::Upsert(viewer, video, mark)).await
    }

    async fn delete_mark(&self, viewer: ViewerId, video: VideoId) -> Result<TallyPush, AppError> {
        self.write(StoreCall::Delete(viewer, video)).await
    }

    async fn subscribe_tally_changes(&self, video: VideoId) -> Result<TallyStream, AppError> {
        Ok(self.hub.stream(video))
    }
}
