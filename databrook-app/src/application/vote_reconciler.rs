use super::{SessionProvider, TallyStream, VoteStore};
use crate::domain::{Tally, TallyDelta, TallyPush, Video, VideoId, ViewerId, VoteMark, VoteOutcome, VoteView};
use databrook_errors::AppError;
use futures::StreamExt;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Keeps the viewer's vote marks and the displayed tallies consistent with the
/// remote store.
///
/// Votes are applied optimistically and confirmed by the tally the store
/// returns. Pushes from the realtime channel overwrite the local tally
/// whenever they carry a newer revision, pending vote or not. Every display
/// surface for a video observes the same `watch` channel, so the list row and
/// the main player can never show different numbers.
#[derive(Clone)]
pub struct VoteReconciler {
    store: Arc<dyn VoteStore>,
    state: Arc<Mutex<ReconcilerState>>,
}

#[derive(Default)]
struct ReconcilerState {
    videos: HashMap<VideoId, TrackedVideo>,
    /// Known marks. A present `None` is a confirmed "no vote".
    marks: HashMap<(ViewerId, VideoId), Option<VoteMark>>,
    /// Bumped whenever a viewer's marks are cleared.
    session_epoch: u64,
    next_epoch: u64,
}

struct TrackedVideo {
    tally: watch::Sender<Tally>,
    /// Server revision the current tally is based on.
    revision: u64,
    pending: bool,
    /// Selection generation; in-flight mark fetches from an older one are discarded.
    epoch: u64,
    listener: Option<JoinHandle<()>>,
}

/// Bookkeeping for one in-flight vote, used to confirm or undo it.
struct PendingVote {
    previous: Option<VoteMark>,
    target: Option<VoteMark>,
    delta: TallyDelta,
    base_revision: u64,
    session_epoch: u64,
}

impl VoteReconciler {
    pub fn new(store: Arc<dyn VoteStore>) -> Self {
        Self {
            store,
            state: Arc::new(Mutex::new(ReconcilerState::default())),
        }
    }

    /// Register a video that entered view and return its tally observer.
    ///
    /// Tracking an already tracked video only refreshes the snapshot when the
    /// given copy is newer than what the reconciler holds.
    pub fn track(&self, video: &Video) -> watch::Receiver<Tally> {
        let mut state = self.lock();
        match state.videos.entry(video.id) {
            Entry::Occupied(entry) => {
                let tracked = entry.into_mut();
                if video.revision > tracked.revision {
                    tracked.revision = video.revision;
                    tracked.tally.send_replace(video.tally);
                }
                tracked.tally.subscribe()
            }
            Entry::Vacant(entry) => {
                let (tx, rx) = watch::channel(video.tally);
                entry.insert(TrackedVideo {
                    tally: tx,
                    revision: video.revision,
                    pending: false,
                    epoch: 0,
                    listener: None,
                });
                rx
            }
        }
    }

    /// Make `video` the subject of display: track it and listen to its push channel.
    pub async fn select(&self, video: &Video) -> Result<watch::Receiver<Tally>, AppError> {
        let observer = self.track(video);
        if self.is_selected(video.id) {
            return Ok(observer);
        }

        let stream = self.store.subscribe_tally_changes(video.id).await?;

        let mut state = self.lock();
        let epoch = state.bump_epoch();
        let Some(tracked) = state.videos.get_mut(&video.id) else {
            // Forgotten while subscribing.
            return Ok(observer);
        };
        if tracked.listener.is_none() {
            tracked.epoch = epoch;
            tracked.listener = Some(self.spawn_listener(video.id, stream));
            tracing::info!(video_id = %video.id, "listening for tally changes");
        }
        Ok(observer)
    }

    /// Stop listening to the video's push channel. Its tally stays tracked for list display.
    pub fn deselect(&self, video: VideoId) {
        let mut state = self.lock();
        let epoch = state.bump_epoch();
        if let Some(tracked) = state.videos.get_mut(&video) {
            tracked.epoch = epoch;
            if let Some(listener) = tracked.listener.take() {
                listener.abort();
                tracing::info!(video_id = %video, "stopped listening for tally changes");
            }
        }
    }

    /// Drop every piece of state held for the video.
    pub fn forget(&self, video: VideoId) {
        let mut state = self.lock();
        if let Some(tracked) = state.videos.remove(&video) {
            if let Some(listener) = tracked.listener {
                listener.abort();
            }
        }
        state.marks.retain(|(_, v), _| *v != video);
    }

    pub fn is_selected(&self, video: VideoId) -> bool {
        self.lock()
            .videos
            .get(&video)
            .is_some_and(|tracked| tracked.listener.is_some())
    }

    /// Fetch the viewer's existing mark, once per (viewer, video).
    ///
    /// Anonymous viewers and failed reads both yield `None`; failures are not
    /// cached so the next display retries.
    pub async fn load_initial_mark(&self, viewer: Option<ViewerId>, video: VideoId) -> Option<VoteMark> {
        let viewer = viewer?;
        let (epoch, session_epoch) = {
            let state = self.lock();
            if let Some(mark) = state.marks.get(&(viewer, video)) {
                return *mark;
            }
            (state.videos.get(&video).map(|t| t.epoch), state.session_epoch)
        };

        let mark = match self.store.read_mark(viewer, video).await {
            Ok(mark) => {
                let outcome = if mark.is_some() { "confirmed_mark" } else { "confirmed_none" };
                tracing::debug!(viewer = %viewer, video_id = %video, outcome, "loaded vote mark");
                mark
            }
            Err(err) => {
                tracing::warn!(
                    viewer = %viewer,
                    video_id = %video,
                    outcome = "read_failed",
                    error = %err,
                    "vote mark read failed, showing as not voted"
                );
                return None;
            }
        };

        let mut state = self.lock();
        let still_current = epoch.is_some()
            && state.videos.get(&video).map(|t| t.epoch) == epoch
            && state.session_epoch == session_epoch;
        if !still_current {
            tracing::debug!(viewer = %viewer, video_id = %video, "discarding stale mark fetch");
            return mark;
        }
        // A vote applied while the read was in flight wins over the read.
        *state.marks.entry((viewer, video)).or_insert(mark)
    }

    /// Toggle or switch the viewer's mark on a selected video.
    ///
    /// The mark and tally change locally before the store is contacted. A
    /// second call while the first is still settling is rejected with
    /// `AlreadyPending`. When the store rejects the write, the optimistic
    /// change is undone and `RemotePersistFailure` is returned.
    pub async fn apply_vote(
        &self,
        viewer: Option<ViewerId>,
        video: VideoId,
        requested: VoteMark,
    ) -> Result<VoteOutcome, AppError> {
        let Some(viewer) = viewer else {
            tracing::info!(video_id = %video, "vote rejected, sign-in required");
            return Err(AppError::NotAuthenticated);
        };

        if !self.is_selected(video) {
            return Err(AppError::VideoNotSelected(video.0));
        }
        // A click must toggle against the stored mark, not an unknown one.
        let loaded = if self.knows_mark(viewer, video) {
            None
        } else {
            self.load_initial_mark(Some(viewer), video).await
        };

        let pending = self.begin_vote(viewer, video, requested, loaded)?;

        let result = match pending.target {
            Some(mark) => self.store.upsert_mark(viewer, video, mark).await,
            None => self.store.delete_mark(viewer, video).await,
        };

        self.settle(viewer, video, pending, result)
    }

    /// Apply a realtime tally notification. Returns whether it changed the snapshot.
    ///
    /// The viewer's own marks are never touched by a push.
    pub fn on_remote_tally_push(&self, push: TallyPush) -> bool {
        self.lock().apply_push(push)
    }

    /// Forget every cached mark of `viewer`. Tallies are not viewer-specific and stay.
    pub fn clear_viewer(&self, viewer: ViewerId) {
        self.lock().clear_viewer(viewer);
    }

    /// Clear cached marks whenever the session's viewer signs out or changes.
    pub fn follow_session(&self, provider: &dyn SessionProvider) -> JoinHandle<()> {
        let mut rx = provider.subscribe();
        let state = Arc::downgrade(&self.state);
        let mut last = *rx.borrow_and_update();

        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let next = *rx.borrow_and_update();
                if let Some(previous) = last.filter(|prev| Some(*prev) != next) {
                    let Some(state) = state.upgrade() else { break };
                    lock(&state).clear_viewer(previous);
                }
                last = next;
            }
        })
    }

    pub fn mark(&self, viewer: ViewerId, video: VideoId) -> Option<VoteMark> {
        self.lock().marks.get(&(viewer, video)).copied().flatten()
    }

    pub fn tally(&self, video: VideoId) -> Option<Tally> {
        self.lock().videos.get(&video).map(|t| *t.tally.borrow())
    }

    pub fn view(&self, viewer: Option<ViewerId>, video: VideoId) -> Option<VoteView> {
        let state = self.lock();
        let tracked = state.videos.get(&video)?;
        let mark = viewer.and_then(|viewer| state.marks.get(&(viewer, video)).copied().flatten());
        let view = VoteView {
            mark,
            tally: *tracked.tally.borrow(),
            pending: tracked.pending,
        };
        Some(view)
    }

    fn knows_mark(&self, viewer: ViewerId, video: VideoId) -> bool {
        self.lock().marks.contains_key(&(viewer, video))
    }

    /// `loaded` stands in for the previous mark when none is cached.
    fn begin_vote(
        &self,
        viewer: ViewerId,
        video: VideoId,
        requested: VoteMark,
        loaded: Option<VoteMark>,
    ) -> Result<PendingVote, AppError> {
        let mut guard = self.lock();
        let state = &mut *guard;

        let Some(tracked) = state
            .videos
            .get_mut(&video)
            .filter(|tracked| tracked.listener.is_some())
        else {
            return Err(AppError::VideoNotSelected(video.0));
        };
        if tracked.pending {
            tracing::debug!(viewer = %viewer, video_id = %video, "ignoring vote while previous one settles");
            return Err(AppError::AlreadyPending);
        }

        let previous = state.marks.get(&(viewer, video)).copied().unwrap_or(loaded);
        let target = VoteMark::resolve(previous, requested);
        let delta = TallyDelta::between(previous, target);

        let current = *tracked.tally.borrow();
        tracked.tally.send_replace(current.apply(delta));
        tracked.pending = true;
        state.marks.insert((viewer, video), target);

        Ok(PendingVote {
            previous,
            target,
            delta,
            base_revision: tracked.revision,
            session_epoch: state.session_epoch,
        })
    }

    fn settle(
        &self,
        viewer: ViewerId,
        video: VideoId,
        pending: PendingVote,
        result: Result<TallyPush, AppError>,
    ) -> Result<VoteOutcome, AppError> {
        let mut state = self.lock();
        if let Some(tracked) = state.videos.get_mut(&video) {
            tracked.pending = false;
        }

        match result {
            Ok(push) => {
                state.confirm(push);
                tracing::info!(viewer = %viewer, video_id = %video, mark = ?pending.target, "vote persisted");
                let tally = state
                    .videos
                    .get(&video)
                    .map(|t| *t.tally.borrow())
                    .unwrap_or(push.tally);
                let mark = state.marks.get(&(viewer, video)).copied().unwrap_or(pending.target);
                Ok(VoteOutcome { mark, tally })
            }
            Err(err) => {
                tracing::warn!(viewer = %viewer, video_id = %video, error = %err, "vote persist failed, rolling back");
                state.roll_back(viewer, video, &pending);
                Err(into_persist_failure(err))
            }
        }
    }

    fn spawn_listener(&self, video: VideoId, mut stream: TallyStream) -> JoinHandle<()> {
        let state: Weak<Mutex<ReconcilerState>> = Arc::downgrade(&self.state);
        tokio::spawn(async move {
            while let Some(push) = stream.next().await {
                let Some(state) = state.upgrade() else { break };
                if push.video_id == video {
                    lock(&state).apply_push(push);
                }
            }
            tracing::debug!(video_id = %video, "tally stream ended");
        })
    }

    fn lock(&self) -> MutexGuard<'_, ReconcilerState> {
        lock(&self.state)
    }
}

impl ReconcilerState {
    fn bump_epoch(&mut self) -> u64 {
        self.next_epoch += 1;
        self.next_epoch
    }

    fn apply_push(&mut self, push: TallyPush) -> bool {
        let Some(tracked) = self.videos.get_mut(&push.video_id) else {
            return false;
        };
        if push.revision <= tracked.revision {
            tracing::debug!(
                video_id = %push.video_id,
                revision = push.revision,
                current = tracked.revision,
                "dropping stale tally push"
            );
            return false;
        }
        tracked.revision = push.revision;
        tracked.tally.send_replace(push.tally);
        true
    }

    /// The store's answer to our own write. Unlike a push it also settles a
    /// tally at the same revision, which is what a no-op write returns.
    fn confirm(&mut self, push: TallyPush) {
        let Some(tracked) = self.videos.get_mut(&push.video_id) else {
            return;
        };
        if push.revision < tracked.revision {
            return;
        }
        tracked.revision = push.revision;
        tracked.tally.send_replace(push.tally);
    }

    fn clear_viewer(&mut self, viewer: ViewerId) {
        self.marks.retain(|(v, _), _| *v != viewer);
        self.session_epoch += 1;
        tracing::info!(viewer = %viewer, "cleared cached vote marks");
    }

    fn roll_back(&mut self, viewer: ViewerId, video: VideoId, pending: &PendingVote) {
        let key = (viewer, video);
        if self.session_epoch == pending.session_epoch && self.marks.get(&key) == Some(&pending.target) {
            self.marks.insert(key, pending.previous);
        }
        // A push received meanwhile already reflects the durable aggregate.
        if let Some(tracked) = self.videos.get_mut(&video) {
            if tracked.revision == pending.base_revision {
                let current = *tracked.tally.borrow();
                tracked.tally.send_replace(current.apply(pending.delta.inverse()));
            }
        }
    }
}

fn lock(state: &Mutex<ReconcilerState>) -> MutexGuard<'_, ReconcilerState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn into_persist_failure(err: AppError) -> AppError {
    match err {
        AppError::NotAuthenticated | AppError::Forbidden | AppError::RemotePersistFailure(_) => err,
        other => AppError::RemotePersistFailure(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::memory::{MemoryVoteStore, StoreCall};
    use crate::infrastructure::session::SessionState;
    use std::time::Duration;

    const VIDEO: VideoId = VideoId(7);

    fn viewer() -> ViewerId {
        ViewerId(uuid::Uuid::from_u128(1))
    }

    fn video(up: u32, down: u32, revision: u64) -> Video {
        Video {
            id: VIDEO,
            outcome_id: 1,
            title: "Limits, intuitively".to_string(),
            provider: "youtube".to_string(),
            provider_id: "abc123".to_string(),
            tally: Tally::new(up, down),
            revision,
        }
    }

    async fn setup(up: u32, down: u32) -> (Arc<MemoryVoteStore>, VoteReconciler) {
        let store = Arc::new(MemoryVoteStore::new());
        store.insert_video(VIDEO, Tally::new(up, down), 1);
        let reconciler = VoteReconciler::new(store.clone());
        reconciler.select(&video(up, down, 1)).await.unwrap();
        (store, reconciler)
    }

    async fn settle_listener() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_first_upvote() {
        let (store, reconciler) = setup(5, 2).await;

        let outcome = reconciler.apply_vote(Some(viewer()), VIDEO, VoteMark::Up).await.unwrap();

        assert_eq!(outcome.mark, Some(VoteMark::Up));
        assert_eq!(outcome.tally, Tally::new(6, 2));
        assert_eq!(store.calls(), vec![StoreCall::Upsert(viewer(), VIDEO, VoteMark::Up)]);
    }

    #[tokio::test]
    async fn test_second_click_removes_mark() {
        let (store, reconciler) = setup(5, 2).await;
        reconciler.apply_vote(Some(viewer()), VIDEO, VoteMark::Up).await.unwrap();

        let outcome = reconciler.apply_vote(Some(viewer()), VIDEO, VoteMark::Up).await.unwrap();

        assert_eq!(outcome.mark, None);
        assert_eq!(outcome.tally, Tally::new(5, 2));
        assert_eq!(store.calls().last(), Some(&StoreCall::Delete(viewer(), VIDEO)));
        assert_eq!(store.stored_mark(viewer(), VIDEO), None);
    }

    #[tokio::test]
    async fn test_switch_is_one_combined_update() {
        let (store, reconciler) = setup(5, 2).await;
        reconciler.apply_vote(Some(viewer()), VIDEO, VoteMark::Up).await.unwrap();
        let mut observer = reconciler.track(&video(5, 2, 1));
        observer.borrow_and_update();

        let outcome = reconciler.apply_vote(Some(viewer()), VIDEO, VoteMark::Down).await.unwrap();

        assert_eq!(outcome.mark, Some(VoteMark::Down));
        assert_eq!(outcome.tally, Tally::new(5, 3));
        assert_eq!(*observer.borrow_and_update(), Tally::new(5, 3));
        assert_eq!(
            store.calls(),
            vec![
                StoreCall::Upsert(viewer(), VIDEO, VoteMark::Up),
                StoreCall::Upsert(viewer(), VIDEO, VoteMark::Down),
            ]
        );
    }

    #[tokio::test]
    async fn test_anonymous_vote_is_rejected_without_change() {
        let (store, reconciler) = setup(5, 2).await;

        let err = reconciler.apply_vote(None, VIDEO, VoteMark::Up).await.unwrap_err();

        assert_eq!(err, AppError::NotAuthenticated);
        assert_eq!(reconciler.tally(VIDEO), Some(Tally::new(5, 2)));
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn test_vote_requires_selection() {
        let store = Arc::new(MemoryVoteStore::new());
        let reconciler = VoteReconciler::new(store.clone());
        reconciler.track(&video(5, 2, 1));

        let err = reconciler.apply_vote(Some(viewer()), VIDEO, VoteMark::Up).await.unwrap_err();

        assert_eq!(err, AppError::VideoNotSelected(VIDEO.0));
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_vote_is_ignored() {
        let (store, reconciler) = setup(5, 2).await;
        store.set_write_latency(Duration::from_millis(50));

        let (first, second) = tokio::join!(
            reconciler.apply_vote(Some(viewer()), VIDEO, VoteMark::Up),
            reconciler.apply_vote(Some(viewer()), VIDEO, VoteMark::Up),
        );

        assert_eq!(first.unwrap().tally, Tally::new(6, 2));
        assert_eq!(second.unwrap_err(), AppError::AlreadyPending);
        assert_eq!(store.calls().len(), 1);
        assert_eq!(reconciler.tally(VIDEO), Some(Tally::new(6, 2)));
    }

    #[tokio::test]
    async fn test_push_overwrites_tally_but_not_mark() {
        let (store, reconciler) = setup(5, 2).await;
        reconciler.apply_vote(Some(viewer()), VIDEO, VoteMark::Up).await.unwrap();

        store.publish_external(VIDEO, Tally::new(10, 2));
        settle_listener().await;

        assert_eq!(reconciler.tally(VIDEO), Some(Tally::new(10, 2)));
        assert_eq!(reconciler.mark(viewer(), VIDEO), Some(VoteMark::Up));
    }

    #[tokio::test]
    async fn test_push_wins_over_pending_optimism() {
        let (store, reconciler) = setup(5, 2).await;
        store.set_write_latency(Duration::from_millis(50));

        let vote = reconciler.apply_vote(Some(viewer()), VIDEO, VoteMark::Up);
        let push = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            assert!(reconciler.view(Some(viewer()), VIDEO).unwrap().pending);
            reconciler.on_remote_tally_push(TallyPush {
                video_id: VIDEO,
                tally: Tally::new(10, 2),
                revision: 40,
            })
        };
        let (outcome, applied) = tokio::join!(vote, push);

        assert!(applied);
        // The store's answer carries an older revision than the push.
        assert_eq!(outcome.unwrap().tally, Tally::new(10, 2));
        assert_eq!(reconciler.tally(VIDEO), Some(Tally::new(10, 2)));
    }

    #[tokio::test]
    async fn test_stale_and_duplicate_pushes_are_dropped() {
        let (_store, reconciler) = setup(5, 2).await;
        let push = TallyPush {
            video_id: VIDEO,
            tally: Tally::new(8, 2),
            revision: 5,
        };

        assert!(reconciler.on_remote_tally_push(push));
        assert!(!reconciler.on_remote_tally_push(push));
        assert!(!reconciler.on_remote_tally_push(TallyPush {
            tally: Tally::new(6, 2),
            revision: 4,
            ..push
        }));
        assert_eq!(reconciler.tally(VIDEO), Some(Tally::new(8, 2)));
    }

    #[tokio::test]
    async fn test_failed_persist_rolls_back() {
        let (store, reconciler) = setup(5, 2).await;
        reconciler.apply_vote(Some(viewer()), VIDEO, VoteMark::Up).await.unwrap();
        store.fail_writes(true);

        let err = reconciler.apply_vote(Some(viewer()), VIDEO, VoteMark::Down).await.unwrap_err();

        assert!(matches!(err, AppError::RemotePersistFailure(_)));
        assert!(err.is_user_visible());
        assert_eq!(reconciler.mark(viewer(), VIDEO), Some(VoteMark::Up));
        assert_eq!(reconciler.tally(VIDEO), Some(Tally::new(6, 2)));
        assert!(!reconciler.view(Some(viewer()), VIDEO).unwrap().pending);
    }

    #[tokio::test]
    async fn test_initial_mark_is_loaded_once() {
        let (store, reconciler) = setup(5, 2).await;
        store.set_stored_mark(viewer(), VIDEO, VoteMark::Down);

        assert_eq!(reconciler.load_initial_mark(Some(viewer()), VIDEO).await, Some(VoteMark::Down));
        assert_eq!(reconciler.load_initial_mark(Some(viewer()), VIDEO).await, Some(VoteMark::Down));
        assert_eq!(store.read_count(), 1);

        let outcome = reconciler.apply_vote(Some(viewer()), VIDEO, VoteMark::Up).await.unwrap();
        assert_eq!(outcome.mark, Some(VoteMark::Up));
    }

    #[tokio::test]
    async fn test_failed_read_is_not_cached() {
        let (store, reconciler) = setup(5, 2).await;
        store.set_stored_mark(viewer(), VIDEO, VoteMark::Up);
        store.fail_reads(true);

        assert_eq!(reconciler.load_initial_mark(Some(viewer()), VIDEO).await, None);

        store.fail_reads(false);
        assert_eq!(reconciler.load_initial_mark(Some(viewer()), VIDEO).await, Some(VoteMark::Up));
    }

    #[tokio::test]
    async fn test_anonymous_mark_is_none_without_read() {
        let (store, reconciler) = setup(5, 2).await;

        assert_eq!(reconciler.load_initial_mark(None, VIDEO).await, None);
        assert_eq!(store.read_count(), 0);
    }

    #[tokio::test]
    async fn test_deselect_discards_inflight_fetch_and_stops_pushes() {
        let (store, reconciler) = setup(5, 2).await;
        store.set_stored_mark(viewer(), VIDEO, VoteMark::Up);
        store.set_read_latency(Duration::from_millis(30));

        let load = reconciler.load_initial_mark(Some(viewer()), VIDEO);
        let leave = async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            reconciler.deselect(VIDEO);
        };
        tokio::join!(load, leave);

        assert_eq!(reconciler.mark(viewer(), VIDEO), None);
        assert!(!reconciler.is_selected(VIDEO));

        store.publish_external(VIDEO, Tally::new(50, 2));
        settle_listener().await;
        assert_eq!(reconciler.tally(VIDEO), Some(Tally::new(5, 2)));
    }

    #[tokio::test]
    async fn test_deselect_leaves_other_videos_alone() {
        let (store, reconciler) = setup(5, 2).await;
        let other = Video {
            id: VideoId(8),
            ..video(1, 0, 1)
        };
        store.insert_video(other.id, other.tally, 1);
        reconciler.select(&other).await.unwrap();

        reconciler.deselect(VIDEO);
        store.publish_external(other.id, Tally::new(3, 0));
        settle_listener().await;

        assert!(reconciler.is_selected(other.id));
        assert_eq!(reconciler.tally(other.id), Some(Tally::new(3, 0)));
    }

    #[tokio::test]
    async fn test_sign_out_clears_marks_but_keeps_tallies() {
        let (_store, reconciler) = setup(5, 2).await;
        let session = SessionState::new();
        session.sign_in(viewer());
        let follower = reconciler.follow_session(&session);
        reconciler.apply_vote(Some(viewer()), VIDEO, VoteMark::Up).await.unwrap();

        session.sign_out();
        settle_listener().await;

        assert_eq!(reconciler.mark(viewer(), VIDEO), None);
        assert_eq!(reconciler.tally(VIDEO), Some(Tally::new(6, 2)));
        follower.abort();
    }

    #[tokio::test]
    async fn test_session_switch_clears_previous_viewer_only() {
        let (_store, reconciler) = setup(5, 2).await;
        let other = ViewerId(uuid::Uuid::from_u128(2));
        let session = SessionState::new();
        session.sign_in(viewer());
        let follower = reconciler.follow_session(&session);
        reconciler.apply_vote(Some(viewer()), VIDEO, VoteMark::Up).await.unwrap();

        session.sign_in(other);
        settle_listener().await;
        assert_eq!(reconciler.mark(viewer(), VIDEO), None);

        reconciler.apply_vote(Some(other), VIDEO, VoteMark::Down).await.unwrap();
        session.sign_in(other);
        settle_listener().await;

        assert_eq!(reconciler.mark(other, VIDEO), Some(VoteMark::Down));
        assert_eq!(reconciler.tally(VIDEO), Some(Tally::new(6, 3)));
        follower.abort();
    }

    #[tokio::test]
    async fn test_vote_before_mark_loaded_toggles_stored_mark() {
        let (store, reconciler) = setup(6, 2).await;
        store.set_stored_mark(viewer(), VIDEO, VoteMark::Up);

        let outcome = reconciler.apply_vote(Some(viewer()), VIDEO, VoteMark::Up).await.unwrap();

        assert_eq!(outcome.mark, None);
        assert_eq!(outcome.tally, Tally::new(5, 2));
        assert_eq!(store.calls(), vec![StoreCall::Delete(viewer(), VIDEO)]);
        assert_eq!(store.stored_mark(viewer(), VIDEO), None);
        assert_eq!(reconciler.tally(VIDEO), store.tally(VIDEO));
    }

    #[tokio::test]
    async fn test_no_op_write_repairs_optimistic_tally() {
        let (store, reconciler) = setup(6, 2).await;
        store.set_stored_mark(viewer(), VIDEO, VoteMark::Up);
        store.fail_reads(true);

        let outcome = reconciler.apply_vote(Some(viewer()), VIDEO, VoteMark::Up).await.unwrap();

        // The unreadable mark counted as none; the unchanged server tally wins.
        assert_eq!(outcome.mark, Some(VoteMark::Up));
        assert_eq!(outcome.tally, Tally::new(6, 2));
        assert_eq!(reconciler.tally(VIDEO), Some(Tally::new(6, 2)));
        assert_eq!(store.tally(VIDEO), Some(Tally::new(6, 2)));
    }

    #[tokio::test]
    async fn test_list_and_detail_observe_the_same_tally() {
        let (_store, reconciler) = setup(5, 2).await;
        let list_row = reconciler.track(&video(5, 2, 1));
        let player = reconciler.track(&video(5, 2, 1));

        reconciler.apply_vote(Some(viewer()), VIDEO, VoteMark::Down).await.unwrap();

        assert_eq!(*list_row.borrow(), Tally::new(5, 3));
        assert_eq!(*player.borrow(), Tally::new(5, 3));
    }

    #[tokio::test]
    async fn test_at_most_one_mark_per_viewer_and_video() {
        let (store, reconciler) = setup(0, 0).await;
        let clicks = [VoteMark::Up, VoteMark::Down, VoteMark::Down, VoteMark::Up, VoteMark::Up, VoteMark::Down];

        for click in clicks {
            reconciler.apply_vote(Some(viewer()), VIDEO, click).await.unwrap();
            let tally = reconciler.tally(VIDEO).unwrap();
            assert!(tally.up + tally.down <= 1, "{tally:?}");
            assert_eq!(store.tally(VIDEO), Some(tally));
        }
    }
}
