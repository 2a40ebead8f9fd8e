use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

use crate::{error::Result, session::IntakeSession};

/// Trait for storing and retrieving intake sessions
#[async_trait]
pub trait SessionStorage: Send + Sync {
    async fn save(&self, session: IntakeSession) -> Result<()>;
    async fn get(&self, id: &str) -> Result<Option<IntakeSession>>;
    async fn delete(&self, id: &str) -> Result<()>;
}

/// In-memory implementation of SessionStorage
#[derive(Default)]
pub struct InMemorySessionStorage {
    sessions: Arc<DashMap<String, IntakeSession>>,
}

impl InMemorySessionStorage {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
        }
    }
}

#[async_trait]
impl SessionStorage for InMemorySessionStorage {
    async fn save(&self, session: IntakeSession) -> Result<()> {
        self.sessions.insert(session.id.clone(), session);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<IntakeSession>> {
        Ok(self.sessions.get(id).map(|entry| entry.clone()))
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.sessions.remove(id);
        Ok(())
    }
}
