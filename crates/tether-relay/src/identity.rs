//! Display names per connection.

use std::collections::HashMap;

use tether_core::ConnectionId;

/// Name reported for a connection that never set one.
pub const UNKNOWN_NAME: &str = "Unknown";

/// Connection handle to display name. Last write wins, no validation.
#[derive(Debug, Default)]
pub struct IdentityRegistry {
    names: HashMap<ConnectionId, String>,
}

impl IdentityRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set or replace the name for `handle`.
    pub fn set_name(&mut self, handle: &ConnectionId, name: impl Into<String>) {
        let _ = self.names.insert(handle.clone(), name.into());
    }

    /// Current name for `handle`, or [`UNKNOWN_NAME`].
    pub fn name_of(&self, handle: &ConnectionId) -> &str {
        self.names.get(handle).map_or(UNKNOWN_NAME, String::as_str)
    }

    /// Drop the entry for a terminated connection.
    pub fn forget(&mut self, handle: &ConnectionId) -> Option<String> {
        self.names.remove(handle)
    }

    /// Whether `handle` has a name set.
    pub fn contains(&self, handle: &ConnectionId) -> bool {
        self.names.contains_key(handle)
    }

    /// Number of named connections.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether no connection has a name.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
