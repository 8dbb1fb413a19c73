//! Ticket storage.
//!
//! Maps a validated service ticket to the identity it resolved to. Sessions
//! point at tickets, so deleting a ticket (single logout) invalidates every
//! session bound to it.

use dashmap::DashMap;

use crate::cas::types::AuthenticationResponse;

/// Storage backend for validated tickets.
pub trait TicketStore: Send + Sync {
    /// Look up the identity a ticket resolved to.
    fn read(&self, ticket: &str) -> Option<AuthenticationResponse>;

    /// Record a validated ticket.
    fn write(&self, ticket: &str, response: AuthenticationResponse);

    /// Forget a ticket. Returns whether it was present.
    fn delete(&self, ticket: &str) -> bool;

    /// Forget every ticket.
    fn clear(&self);
}

/// In-process ticket store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tickets: DashMap<String, AuthenticationResponse>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tickets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty()
    }
}

impl TicketStore for MemoryStore {
    fn read(&self, ticket: &str) -> Option<AuthenticationResponse> {
        self.tickets.get(ticket).map(|entry| entry.value().clone())
    }

    fn write(&self, ticket: &str, response: AuthenticationResponse) {
        self.tickets.insert(ticket.to_string(), response);
    }

    fn delete(&self, ticket: &str) -> bool {
        self.tickets.remove(ticket).is_some()
    }

    fn clear(&self) {
        self.tickets.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(user: &str) -> AuthenticationResponse {
        AuthenticationResponse {
            user: user.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_memory_store_lifecycle() {
        let store = MemoryStore::new();
        assert!(store.is_empty());

        store.write("ST-1", response("alice"));
        store.write("ST-2", response("bob"));
        assert_eq!(store.read("ST-1").map(|r| r.user).as_deref(), Some("alice"));
        assert_eq!(store.len(), 2);

        assert!(store.delete("ST-1"));
        assert!(!store.delete("ST-1"));
        assert!(store.read("ST-1").is_none());

        store.clear();
        assert!(store.read("ST-2").is_none());
    }
}
