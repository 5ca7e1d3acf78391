use actix::Recipient;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use crate::config::ServerConfig;
use crate::game::registry::SessionRegistry;
use crate::game::ConnectionId;
use crate::models::messages::ChessWebSocketMessage;

/// Application state shared between connections
pub struct AppState {
    pub registry: SessionRegistry,
    pub connections: Mutex<HashMap<ConnectionId, Recipient<ChessWebSocketMessage>>>,
    pub config: ServerConfig,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        AppState {
            registry: SessionRegistry::new(config.session),
            connections: Mutex::new(HashMap::new()),
            config,
        }
    }

    pub fn register(&self, id: ConnectionId, addr: Recipient<ChessWebSocketMessage>) -> usize {
        let mut connections = self.connections.lock().unwrap_or_else(PoisonError::into_inner);
        connections.insert(id, addr);
        connections.len()
    }

    pub fn deregister(&self, id: ConnectionId) -> usize {
        let mut connections = self.connections.lock().unwrap_or_else(PoisonError::into_inner);
        connections.remove(&id);
        connections.len()
    }
}
