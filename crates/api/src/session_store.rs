use std::collections::HashMap;
use std::sync::Arc;

use crowdcount_core::capture::FrameSource;
use crowdcount_core::session::{Session, SessionKind};
use crowdcount_core::types::DbId;
use tokio::sync::{Mutex, RwLock};

/// A session shared between requests. Frame requests hold the lock for
/// their whole duration.
pub type SharedSession = Arc<Mutex<Session>>;

/// Holds one webcam session and one video session per user.
///
/// Thread-safe via interior `RwLock`; designed to be wrapped in `Arc` and
/// shared across the application. The map lock is only held long enough to
/// look up or insert an entry, never across a frame request.
pub struct SessionStore {
    sessions: RwLock<HashMap<(DbId, SessionKind), SharedSession>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Return the session for `(user_id, kind)`, creating a fresh one on
    /// first use.
    pub async fn get_or_create(&self, user_id: DbId, kind: SessionKind) -> SharedSession {
        if let Some(session) = self.get(user_id, kind).await {
            return session;
        }

        let mut sessions = self.sessions.write().await;
        Arc::clone(sessions.entry((user_id, kind)).or_insert_with(|| {
            tracing::debug!(user_id, ?kind, "Creating session");
            Arc::new(Mutex::new(Session::new(kind)))
        }))
    }

    /// Return the session for `(user_id, kind)` if one exists.
    pub async fn get(&self, user_id: DbId, kind: SessionKind) -> Option<SharedSession> {
        self.sessions.read().await.get(&(user_id, kind)).cloned()
    }

    /// Drop every session belonging to `user_id`, closing their sources.
    pub async fn remove_user(&self, user_id: DbId) {
        let removed: Vec<SharedSession> = {
            let mut sessions = self.sessions.write().await;
            let keys: Vec<_> = sessions
                .keys()
                .filter(|(owner, _)| *owner == user_id)
                .copied()
                .collect();
            keys.iter().filter_map(|key| sessions.remove(key)).collect()
        };

        for session in removed {
            let source = session.lock().await.reset();
            close_source(source).await;
        }
    }

    /// Number of live sessions.
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Close every session's capture source, then clear the map.
    ///
    /// Used during graceful shutdown so uploaded videos are removed.
    pub async fn shutdown_all(&self) {
        let drained: Vec<SharedSession> = {
            let mut sessions = self.sessions.write().await;
            sessions.drain().map(|(_, session)| session).collect()
        };
        let count = drained.len();

        for session in drained {
            let source = session.lock().await.reset();
            close_source(source).await;
        }

        tracing::info!(count, "All capture sessions closed");
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Close a detached capture source, logging rather than failing on error.
pub async fn close_source(source: Option<Box<dyn FrameSource>>) {
    if let Some(source) = source {
        if let Err(e) = source.close().await {
            tracing::warn!(error = %e, "Failed to close capture source");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use crowdcount_core::capture::CaptureError;
    use crowdcount_core::types::FrameNumber;
    use image::RgbImage;

    use super::*;

    struct FlagSource(Arc<AtomicBool>);

    #[async_trait]
    impl FrameSource for FlagSource {
        async fn next_frame(&mut self) -> Result<RgbImage, CaptureError> {
            Ok(RgbImage::new(4, 4))
        }

        async fn frame_at(&mut self, _n: FrameNumber) -> Result<RgbImage, CaptureError> {
            Ok(RgbImage::new(4, 4))
        }

        async fn close(self: Box<Self>) -> Result<(), CaptureError> {
            self.0.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn same_key_returns_same_session() {
        let store = SessionStore::new();
        let a = store.get_or_create(1, SessionKind::Webcam).await;
        let b = store.get_or_create(1, SessionKind::Webcam).await;
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(store.session_count().await, 1);
    }

    #[tokio::test]
    async fn sessions_are_isolated_by_user_and_kind() {
        let store = SessionStore::new();
        let webcam = store.get_or_create(1, SessionKind::Webcam).await;
        let video = store.get_or_create(1, SessionKind::Video).await;
        let other = store.get_or_create(2, SessionKind::Webcam).await;

        assert!(!Arc::ptr_eq(&webcam, &video));
        assert!(!Arc::ptr_eq(&webcam, &other));
        assert_eq!(video.lock().await.kind(), SessionKind::Video);
        assert!(store.get(3, SessionKind::Webcam).await.is_none());
    }

    #[tokio::test]
    async fn remove_user_closes_only_their_sources() {
        let store = SessionStore::new();
        let closed_1 = Arc::new(AtomicBool::new(false));
        let closed_2 = Arc::new(AtomicBool::new(false));

        let s1 = store.get_or_create(1, SessionKind::Video).await;
        s1.lock()
            .await
            .attach_source(Box::new(FlagSource(Arc::clone(&closed_1))));
        let s2 = store.get_or_create(2, SessionKind::Video).await;
        s2.lock()
            .await
            .attach_source(Box::new(FlagSource(Arc::clone(&closed_2))));

        store.remove_user(1).await;

        assert!(closed_1.load(Ordering::SeqCst));
        assert!(!closed_2.load(Ordering::SeqCst));
        assert_eq!(store.session_count().await, 1);
    }

    #[tokio::test]
    async fn shutdown_closes_every_source() {
        let store = SessionStore::new();
        let closed = Arc::new(AtomicBool::new(false));
        let session = store.get_or_create(7, SessionKind::Webcam).await;
        session
            .lock()
            .await
            .attach_source(Box::new(FlagSource(Arc::clone(&closed))));

        store.shutdown_all().await;

        assert!(closed.load(Ordering::SeqCst));
        assert_eq!(store.session_count().await, 0);
    }
}
