use async_trait::async_trait;
use dashmap::{DashMap, mapref::entry::Entry};
use std::sync::Arc;

use crate::{
    error::{Result, TriageError},
    session::TriageSession,
};

/// Trait for storing and retrieving triage sessions.
///
/// `save` replaces the whole session document, so one call commits one turn.
/// It is a compare-and-swap on `revision`: the stored document must still be at
/// the revision the caller loaded, and is written back at the next one. A stale
/// save fails with `ConcurrentModification` and changes nothing.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert a brand-new session.
    async fn create(&self, session: TriageSession) -> Result<()>;
    async fn get(&self, id: &str) -> Result<Option<TriageSession>>;
    async fn save(&self, session: TriageSession) -> Result<()>;
    /// Returns whether a session existed.
    async fn delete(&self, id: &str) -> Result<bool>;
}

/// In-memory implementation of SessionStore
#[derive(Clone, Default)]
pub struct InMemorySessionStore {
    sessions: Arc<DashMap<String, TriageSession>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create(&self, session: TriageSession) -> Result<()> {
        self.sessions.insert(session.id.clone(), session);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<TriageSession>> {
        Ok(self.sessions.get(id).map(|entry| entry.clone()))
    }

    async fn save(&self, mut session: TriageSession) -> Result<()> {
        let expected = session.revision;
        session.revision += 1;
        match self.sessions.entry(session.id.clone()) {
            Entry::Occupied(mut entry) if entry.get().revision == expected => {
                entry.insert(session);
                Ok(())
            }
            // Never stored yet; turns that start a session commit it here.
            Entry::Vacant(entry) if expected == 0 => {
                entry.insert(session);
                Ok(())
            }
            _ => Err(TriageError::ConcurrentModification(session.id)),
        }
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        Ok(self.sessions.remove(id).is_some())
    }
}
