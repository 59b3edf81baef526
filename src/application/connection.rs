// Dashboard connection handles and the registry the relay fans out over
use crate::application::error::SendError;
use std::collections::BTreeMap;
use std::fmt;

/// Identifies one live transport. Assigned in connect order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Upgraded but history not yet delivered; not in the registry
    Connecting,
    /// Registered and receiving updates
    Open,
    /// Failed or disconnected; swept after the current broadcast
    Closed,
}

/// Capability handle for pushing text frames to one client.
///
/// `send` must not block: implementations queue the frame and report
/// failure immediately if the transport is gone or backed up.
pub trait DashboardConnection: Send {
    fn send(&self, text: &str) -> Result<(), SendError>;

    fn is_open(&self) -> bool;
}

struct Entry {
    handle: Box<dyn DashboardConnection>,
    state: ConnectionState,
}

/// Open connections, owned by the relay. The relay is the only mutator.
#[derive(Default)]
pub struct ConnectionRegistry {
    entries: BTreeMap<ConnectionId, Entry>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers `greeting` as the connection's first frame, then marks it open.
    /// A connection that cannot take the greeting is never registered.
    pub fn open(
        &mut self,
        id: ConnectionId,
        handle: Box<dyn DashboardConnection>,
        greeting: &str,
    ) -> Result<(), SendError> {
        let mut entry = Entry {
            handle,
            state: ConnectionState::Connecting,
        };
        entry.handle.send(greeting)?;
        entry.state = ConnectionState::Open;
        self.entries.insert(id, entry);
        Ok(())
    }

    /// Drops the connection. Returns false if it was not registered.
    pub fn close(&mut self, id: ConnectionId) -> bool {
        self.entries.remove(&id).is_some()
    }

    /// Unregistered ids report `Closed`.
    pub fn state(&self, id: ConnectionId) -> ConnectionState {
        self.entries
            .get(&id)
            .map(|e| e.state)
            .unwrap_or(ConnectionState::Closed)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sends `text` to every open connection and returns how many accepted it.
    ///
    /// A failing connection is marked closed and does not affect the rest.
    /// Closed entries are swept once the pass is complete.
    pub fn broadcast(&mut self, text: &str) -> usize {
        let mut delivered = 0;

        for (id, entry) in self.entries.iter_mut() {
            if entry.state != ConnectionState::Open {
                continue;
            }
            if !entry.handle.is_open() {
                tracing::debug!("Skipping connection {}: transport closed", id);
                entry.state = ConnectionState::Closed;
                continue;
            }
            match entry.handle.send(text) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::warn!("Send to connection {} failed: {}", id, e);
                    entry.state = ConnectionState::Closed;
                }
            }
        }

        self.entries
            .retain(|_, entry| entry.state != ConnectionState::Closed);

        delivered
    }
}
