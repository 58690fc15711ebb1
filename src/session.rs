//! Per-session conversation state.
//!
//! A [`SessionState`] owns everything one conversation needs: the displayed
//! transcript, the memory buffer fed to the model, the editable system
//! prompt, and at most one document index. Sessions never share state.
//!
//! [`Session`] puts the state behind a `tokio::sync::Mutex` that is held for
//! a whole chat or upload, so requests against one session are serialised
//! while different sessions run in parallel. [`SessionStore`] maps ids to
//! sessions for the HTTP server and expires the ones left idle.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use kira_core::index::VectorIndex;
use kira_core::memory::ConversationMemory;
use kira_core::models::Turn;

use crate::error::{KiraError, KiraResult};

pub struct SessionState {
    transcript: Vec<Turn>,
    memory: ConversationMemory,
    system_prompt: String,
    index: Option<Arc<dyn VectorIndex>>,
}

impl SessionState {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            transcript: Vec::new(),
            memory: ConversationMemory::new(),
            system_prompt: system_prompt.into(),
            index: None,
        }
    }

    pub fn append(&mut self, turn: Turn) {
        self.transcript.push(turn);
    }

    /// Empty the transcript and the memory buffer. Prompt and index stay.
    pub fn clear(&mut self) {
        self.transcript.clear();
        self.memory.clear();
    }

    pub fn transcript(&self) -> &[Turn] {
        &self.transcript
    }

    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut ConversationMemory {
        &mut self.memory
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn set_system_prompt(&mut self, text: impl Into<String>) {
        self.system_prompt = text.into();
    }

    pub fn index(&self) -> Option<&dyn VectorIndex> {
        self.index.as_deref()
    }

    pub fn has_index(&self) -> bool {
        self.index.is_some()
    }

    /// Install a new index, dropping the previous one.
    pub fn replace_index(&mut self, index: Arc<dyn VectorIndex>) {
        self.index = Some(index);
    }

    /// Forget the current index; later answers are conversational only.
    pub fn drop_index(&mut self) {
        self.index = None;
    }
}

pub struct Session {
    id: Uuid,
    created_at: DateTime<Utc>,
    /// Milliseconds since the epoch of the last `lock()`.
    last_active: AtomicI64,
    state: Mutex<SessionState>,
}

impl Session {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            created_at: now,
            last_active: AtomicI64::new(now.timestamp_millis()),
            state: Mutex::new(SessionState::new(system_prompt)),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Exclusive access to the state for the duration of one request.
    pub async fn lock(&self) -> tokio::sync::MutexGuard<'_, SessionState> {
        self.touch();
        let guard = self.state.lock().await;
        self.touch();
        guard
    }

    fn touch(&self) {
        self.last_active
            .store(Utc::now().timestamp_millis(), Ordering::Relaxed);
    }

    fn idle_since(&self, cutoff: DateTime<Utc>) -> bool {
        self.last_active.load(Ordering::Relaxed) < cutoff.timestamp_millis()
    }

    fn is_busy(&self) -> bool {
        self.state.try_lock().is_err()
    }
}

#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, Arc<Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(&self, system_prompt: &str) -> Arc<Session> {
        let session = Arc::new(Session::new(system_prompt));
        self.sessions
            .write()
            .await
            .insert(session.id(), session.clone());
        tracing::info!(session = %session.id(), "session created");
        session
    }

    pub async fn get(&self, id: Uuid) -> KiraResult<Arc<Session>> {
        self.sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(KiraError::SessionNotFound(id))
    }

    pub async fn remove(&self, id: Uuid) -> KiraResult<()> {
        match self.sessions.write().await.remove(&id) {
            Some(_) => {
                tracing::info!(session = %id, "session removed");
                Ok(())
            }
            None => Err(KiraError::SessionNotFound(id)),
        }
    }

    /// Drop sessions not used since `cutoff`. Sessions with a request in
    /// flight are kept. Returns how many were removed.
    pub async fn expire_idle_before(&self, cutoff: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.is_busy() || !s.idle_since(cutoff));
        let removed = before - sessions.len();
        if removed > 0 {
            tracing::info!(removed, remaining = sessions.len(), "expired idle sessions");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;
    use kira_core::models::{Role, SearchHit};

    struct FixedLen(usize);

    #[async_trait]
    impl VectorIndex for FixedLen {
        fn len(&self) -> usize {
            self.0
        }
        async fn search(&self, _q: &[f32], _limit: usize) -> Result<Vec<SearchHit>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn clear_keeps_prompt_and_index() {
        let mut state = SessionState::new("Eres Kira");
        state.replace_index(Arc::new(FixedLen(4)));
        state.append(Turn::user("Hola"));
        state.append(Turn::assistant("Hola Monito"));
        state.memory_mut().save_context("Hola", "Hola Monito");

        state.clear();

        assert!(state.transcript().is_empty());
        assert!(state.memory().is_empty());
        assert_eq!(state.system_prompt(), "Eres Kira");
        assert_eq!(state.index().map(|i| i.len()), Some(4));
    }

    #[test]
    fn replace_index_drops_previous() {
        let mut state = SessionState::new("p");
        assert!(!state.has_index());
        state.replace_index(Arc::new(FixedLen(1)));
        state.replace_index(Arc::new(FixedLen(7)));
        assert_eq!(state.index().map(|i| i.len()), Some(7));
    }

    #[test]
    fn drop_index_leaves_session_without_documents() {
        let mut state = SessionState::new("p");
        state.replace_index(Arc::new(FixedLen(3)));
        state.drop_index();
        assert!(!state.has_index());
        assert!(state.index().is_none());
    }

    #[test]
    fn transcript_preserves_order() {
        let mut state = SessionState::new("p");
        state.append(Turn::user("a"));
        state.append(Turn::assistant("b"));
        let roles: Vec<Role> = state.transcript().iter().map(|t| t.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant]);
    }

    #[test]
    fn system_prompt_is_editable() {
        let mut state = SessionState::new("antes");
        state.set_system_prompt("después");
        assert_eq!(state.system_prompt(), "después");
    }

    #[tokio::test]
    async fn store_isolates_sessions() {
        let store = SessionStore::new();
        let a = store.create("prompt").await;
        let b = store.create("prompt").await;
        assert_ne!(a.id(), b.id());

        a.lock().await.append(Turn::user("solo en a"));
        assert_eq!(b.lock().await.transcript().len(), 0);
        assert_eq!(store.get(a.id()).await.unwrap().lock().await.transcript().len(), 1);
    }

    #[tokio::test]
    async fn remove_and_missing_sessions() {
        let store = SessionStore::new();
        let s = store.create("p").await;
        assert_eq!(store.len().await, 1);
        store.remove(s.id()).await.unwrap();
        assert!(store.is_empty().await);
        assert!(matches!(
            store.get(s.id()).await,
            Err(KiraError::SessionNotFound(_))
        ));
        assert!(store.remove(s.id()).await.is_err());
    }

    #[tokio::test]
    async fn idle_sessions_expire_but_busy_ones_stay() {
        let store = SessionStore::new();
        let idle = store.create("p").await;
        let busy = store.create("p").await;
        let _guard = busy.lock().await;

        let past = Utc::now() - chrono::Duration::hours(1);
        assert_eq!(store.expire_idle_before(past).await, 0);
        assert_eq!(store.len().await, 2);

        let future = Utc::now() + chrono::Duration::hours(1);
        assert_eq!(store.expire_idle_before(future).await, 1);
        assert!(store.get(idle.id()).await.is_err());
        assert!(store.get(busy.id()).await.is_ok());
    }

    #[tokio::test]
    async fn lock_refreshes_activity() {
        let store = SessionStore::new();
        let s = store.create("p").await;
        let cutoff = Utc::now() + chrono::Duration::milliseconds(5);
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        drop(s.lock().await);
        assert_eq!(store.expire_idle_before(cutoff).await, 0);
        assert!(s.created_at() < cutoff);
    }
}
