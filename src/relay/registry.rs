//! Registry of connections that announced an identifier.
//!
//! The registry is owned by the relay's server loop and never shared
//! across threads.  Every change is reported to the GUI through the
//! attached [`PanelEvent`] channel.

use super::connection::{ClientHandle, ConnectionId};
use crate::traits::PanelEvent;
use log::{debug, info};
use std::collections::HashMap;
use std::sync::mpsc;

/// Why a registration was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegisterError {
    #[error("identifier is empty")]
    EmptyIdentifier,
    #[error("identifier {0:?} is already registered")]
    DuplicateIdentifier(String),
    #[error("connection {connection} is already registered as {existing:?}")]
    AlreadyRegistered {
        connection: ConnectionId,
        existing: String,
    },
}

struct Entry {
    handle: ClientHandle,
    image_url: Option<String>,
}

/// Identifier → connection mapping with at most one identifier per
/// connection.
#[derive(Default)]
pub struct ConnectionRegistry {
    by_identifier: HashMap<String, Entry>,
    by_connection: HashMap<ConnectionId, String>,
    notifier: Option<mpsc::Sender<PanelEvent>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the channel that receives `ClientAdded` / `ClientRemoved`.
    pub fn set_notifier(&mut self, tx: mpsc::Sender<PanelEvent>) {
        self.notifier = Some(tx);
    }

    /// Register `connection` under `identifier`.
    ///
    /// A rejected registration leaves the registry untouched.
    pub fn register(
        &mut self,
        identifier: &str,
        image_url: Option<String>,
        connection: ClientHandle,
    ) -> Result<(), RegisterError> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Err(RegisterError::EmptyIdentifier);
        }
        if self.by_identifier.contains_key(identifier) {
            return Err(RegisterError::DuplicateIdentifier(identifier.to_string()));
        }
        if let Some(existing) = self.by_connection.get(&connection.id()) {
            return Err(RegisterError::AlreadyRegistered {
                connection: connection.id(),
                existing: existing.clone(),
            });
        }

        info!(
            "registered {} from {} ({})",
            identifier,
            connection.peer(),
            connection.id()
        );
        self.by_connection
            .insert(connection.id(), identifier.to_string());
        self.by_identifier.insert(
            identifier.to_string(),
            Entry {
                handle: connection,
                image_url: image_url.clone(),
            },
        );
        self.notify(PanelEvent::ClientAdded {
            identifier: identifier.to_string(),
            image_url,
            clients: self.len(),
        });
        Ok(())
    }

    /// Remove whatever `connection` registered.  Returns the identifier it
    /// held; a connection that never registered is a no-op.
    pub fn unregister(&mut self, connection: ConnectionId) -> Option<String> {
        let identifier = self.by_connection.remove(&connection)?;
        self.by_identifier.remove(&identifier);
        info!("unregistered {} ({})", identifier, connection);
        self.notify(PanelEvent::ClientRemoved {
            identifier: identifier.clone(),
            clients: self.len(),
        });
        Some(identifier)
    }

    /// Drop every registration, notifying each removal.
    pub fn clear(&mut self) {
        let connections: Vec<ConnectionId> = self.by_connection.keys().copied().collect();
        for id in connections {
            self.unregister(id);
        }
    }

    pub fn len(&self) -> usize {
        self.by_identifier.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_identifier.is_empty()
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.by_identifier.contains_key(identifier)
    }

    /// The connection registered under `identifier`.
    pub fn get(&self, identifier: &str) -> Option<&ClientHandle> {
        self.by_identifier.get(identifier).map(|e| &e.handle)
    }

    /// The image URL the client announced, if any.
    pub fn image_url(&self, identifier: &str) -> Option<&str> {
        self.by_identifier
            .get(identifier)
            .and_then(|e| e.image_url.as_deref())
    }

    /// Iterate over `(identifier, connection)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ClientHandle)> {
        self.by_identifier
            .iter()
            .map(|(k, e)| (k.as_str(), &e.handle))
    }

    fn notify(&self, event: PanelEvent) {
        if let Some(tx) = &self.notifier {
            if tx.send(event).is_err() {
                debug!("panel channel closed, dropping notification");
            }
        }
    }
}
