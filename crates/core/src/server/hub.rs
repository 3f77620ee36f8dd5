//! Connection registry and broadcast support

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard,
    },
};

use tokio::sync::mpsc::UnboundedSender;

use crate::errors::{PromptShareError, Result};

/// Client ID type
pub type ClientId = u64;

/// Global client ID counter
static NEXT_CLIENT_ID: AtomicU64 = AtomicU64::new(1);

/// Message to send to a client
pub type ClientMessage = String;

/// Hub for managing multiple WebSocket connections
#[derive(Clone, Default)]
pub struct Hub {
    clients: Arc<Mutex<HashMap<ClientId, UnboundedSender<ClientMessage>>>>,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate a unique client ID
    pub fn next_client_id() -> ClientId {
        NEXT_CLIENT_ID.fetch_add(1, Ordering::SeqCst)
    }

    fn clients(&self) -> MutexGuard<'_, HashMap<ClientId, UnboundedSender<ClientMessage>>> {
        self.clients.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a new client with its message sender
    pub fn register(&self, id: ClientId, sender: UnboundedSender<ClientMessage>) {
        self.clients().insert(id, sender);
    }

    pub fn unregister(&self, id: ClientId) {
        self.clients().remove(&id);
    }

    pub fn client_count(&self) -> usize {
        self.clients().len()
    }

    /// Send `message` to every connected client
    ///
    /// Clients whose channel is closed are skipped; they unregister
    /// themselves when their connection task ends.
    pub fn broadcast(&self, message: &str) {
        for sender in self.clients().values() {
            let _ = sender.send(message.to_string());
        }
    }

    pub fn send_to_client(&self, id: ClientId, message: &str) -> Result<()> {
        let clients = self.clients();
        let sender = clients
            .get(&id)
            .ok_or_else(|| PromptShareError::Other(format!("Client {} not found", id)))?;
        sender
            .send(message.to_string())
            .map_err(|_| PromptShareError::Other(format!("Client {} disconnected", id)))
    }
}
