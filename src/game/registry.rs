use log::info;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::{GameError, Result};
use crate::game::session::{GameSession, SessionSettings, SharedSession};

/// Sessions by key. Entries live as long as the process.
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, SharedSession>>,
    settings: SessionSettings,
}

impl SessionRegistry {
    pub fn new(settings: SessionSettings) -> Self {
        SessionRegistry {
            sessions: Mutex::new(HashMap::new()),
            settings,
        }
    }

    pub fn get_or_create(&self, key: &str) -> SharedSession {
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        sessions
            .entry(key.to_string())
            .or_insert_with(|| {
                info!("creating game for key {}", key);
                Arc::new(Mutex::new(GameSession::new(self.settings)))
            })
            .clone()
    }

    /// Look a session up without creating one.
    pub fn get(&self, key: &str) -> Result<SharedSession> {
        let sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        sessions
            .get(key)
            .cloned()
            .ok_or_else(|| GameError::SessionNotFound {
                key: key.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::session::lock;

    #[test]
    fn same_key_same_session() {
        let registry = SessionRegistry::new(SessionSettings::default());
        let first = registry.get_or_create("/lobby");
        let again = registry.get_or_create("/lobby");
        let other = registry.get_or_create("/other");

        assert!(Arc::ptr_eq(&first, &again));
        assert!(!Arc::ptr_eq(&first, &other));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn get_does_not_create() {
        let registry = SessionRegistry::new(SessionSettings::default());
        assert!(matches!(
            registry.get("/missing"),
            Err(GameError::SessionNotFound { .. })
        ));
        assert!(registry.is_empty());

        let created = registry.get_or_create("/missing");
        assert!(Arc::ptr_eq(&created, &registry.get("/missing").unwrap()));
    }

    #[test]
    fn new_sessions_use_registry_settings() {
        let settings = SessionSettings {
            total_length: 90.0,
            per_move: 3.0,
        };
        let registry = SessionRegistry::new(settings);
        let session = registry.get_or_create("k");
        assert_eq!(lock(&session).settings(), settings);
    }
}
