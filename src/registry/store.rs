//! Registry implementation
//!
//! The central set of live connections. Handlers mutate it, the broadcast
//! dispatcher and the shutdown coordinator read snapshots of it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;

use super::entry::{Connection, ConnectionId};
use super::event::MembershipEvent;

/// Capacity of the membership event channel
const EVENT_CAPACITY: usize = 256;

/// Member set plus the counters that change with it
#[derive(Default)]
struct Members {
    map: HashMap<ConnectionId, Arc<Connection>>,
    joined: u64,
    left: u64,
}

/// Point-in-time registry statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegistryStats {
    /// Current number of members
    pub members: usize,
    /// Successful adds since creation
    pub joined: u64,
    /// Successful removes since creation
    pub left: u64,
}

/// Authoritative set of connected peers
///
/// One instance per server, shared as `Arc<Registry>`.
pub struct Registry {
    members: Mutex<Members>,
    events: broadcast::Sender<MembershipEvent>,
    next_id: AtomicU64,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            members: Mutex::new(Members::default()),
            events,
            next_id: AtomicU64::new(1),
        }
    }

    /// Allocate a fresh connection identity
    pub fn next_id(&self) -> ConnectionId {
        ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Insert a member
    ///
    /// Returns `false` and leaves the set untouched if a member with the
    /// same identity is already present.
    pub fn add(&self, connection: Arc<Connection>) -> bool {
        let id = connection.id();
        let peer_addr = connection.peer_addr();

        let mut members = self.members.lock();
        if members.map.contains_key(&id) {
            tracing::warn!(conn = %id, peer = %peer_addr, "Connection already registered");
            return false;
        }
        members.map.insert(id, connection);
        members.joined += 1;

        // Published under the lock so event order matches membership order
        let _ = self.events.send(MembershipEvent::Joined { id, peer_addr });
        tracing::info!(
            conn = %id,
            peer = %peer_addr,
            members = members.map.len(),
            "Connection registered"
        );

        true
    }

    /// Delete a member if present
    ///
    /// Removing an absent member is a no-op and returns `false`.
    pub fn remove(&self, id: ConnectionId) -> bool {
        let mut members = self.members.lock();
        let Some(connection) = members.map.remove(&id) else {
            tracing::trace!(conn = %id, "Remove of absent connection ignored");
            return false;
        };
        members.left += 1;

        let peer_addr = connection.peer_addr();
        let _ = self.events.send(MembershipEvent::Left { id, peer_addr });
        tracing::info!(
            conn = %id,
            peer = %peer_addr,
            members = members.map.len(),
            "Connection unregistered"
        );

        true
    }

    /// Add a member and tie its removal to the returned guard
    ///
    /// Returns `None` if the identity is already registered.
    pub fn register(self: &Arc<Self>, connection: Arc<Connection>) -> Option<Registration> {
        let id = connection.id();
        self.add(connection).then(|| Registration {
            registry: Arc::clone(self),
            id,
        })
    }

    /// Point-in-time copy of the current members
    ///
    /// The lock is released before this returns, so callers may do I/O on
    /// the connections freely.
    pub fn snapshot(&self) -> Vec<Arc<Connection>> {
        self.members.lock().map.values().cloned().collect()
    }

    /// Whether the identity is currently a member
    pub fn contains(&self, id: ConnectionId) -> bool {
        self.members.lock().map.contains_key(&id)
    }

    /// Current number of members
    pub fn len(&self) -> usize {
        self.members.lock().map.len()
    }

    /// Whether there are no members
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current statistics
    pub fn stats(&self) -> RegistryStats {
        let members = self.members.lock();
        RegistryStats {
            members: members.map.len(),
            joined: members.joined,
            left: members.left,
        }
    }

    /// Subscribe to membership changes
    ///
    /// Only events published after this call are received.
    pub fn subscribe(&self) -> broadcast::Receiver<MembershipEvent> {
        self.events.subscribe()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

/// Scoped membership
///
/// Removes the connection from the registry exactly once when dropped,
/// whichever way the owning handler exits.
#[must_use = "dropping the registration unregisters the connection"]
pub struct Registration {
    registry: Arc<Registry>,
    id: ConnectionId,
}

impl Registration {
    /// Identity of the registered connection
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.registry.remove(self.id);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use tokio::sync::broadcast::error::TryRecvError;

    use super::*;
    use crate::registry::entry::testing::{connection, RecordingSink};

    #[test]
    fn test_add_remove() {
        let registry = Registry::new();

        assert!(registry.add(connection(1, RecordingSink::default())));
        assert!(registry.add(connection(2, RecordingSink::default())));
        assert_eq!(registry.len(), 2);
        assert!(registry.contains(ConnectionId(1)));

        assert!(registry.remove(ConnectionId(1)));
        assert_eq!(registry.len(), 1);
        assert!(!registry.contains(ConnectionId(1)));
    }

    #[test]
    fn test_duplicate_add_rejected() {
        let registry = Registry::new();

        assert!(registry.add(connection(1, RecordingSink::default())));
        assert!(!registry.add(connection(1, RecordingSink::default())));

        let stats = registry.stats();
        assert_eq!(stats.members, 1);
        assert_eq!(stats.joined, 1);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let registry = Registry::new();
        assert!(!registry.remove(ConnectionId(42)));

        registry.add(connection(1, RecordingSink::default()));
        assert!(registry.remove(ConnectionId(1)));
        assert!(!registry.remove(ConnectionId(1)));

        let stats = registry.stats();
        assert_eq!(stats.members, 0);
        assert_eq!(stats.left, 1);
    }

    #[test]
    fn test_snapshot_is_point_in_time() {
        let registry = Registry::new();
        registry.add(connection(1, RecordingSink::default()));
        registry.add(connection(2, RecordingSink::default()));

        let snapshot = registry.snapshot();
        registry.remove(ConnectionId(1));
        registry.add(connection(3, RecordingSink::default()));

        let ids: HashSet<_> = snapshot.iter().map(|c| c.id()).collect();
        assert_eq!(ids, HashSet::from([ConnectionId(1), ConnectionId(2)]));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_next_id_unique() {
        let registry = Registry::new();
        let a = registry.next_id();
        let b = registry.next_id();
        assert_ne!(a, b);
    }

    #[test]
    fn test_registration_removes_once() {
        let registry = Arc::new(Registry::new());

        let registration = registry
            .register(connection(1, RecordingSink::default()))
            .unwrap();
        assert_eq!(registration.id(), ConnectionId(1));
        assert!(registry.contains(ConnectionId(1)));

        // A second registration of the same identity is refused
        assert!(registry
            .register(connection(1, RecordingSink::default()))
            .is_none());

        drop(registration);
        assert!(!registry.contains(ConnectionId(1)));
        assert!(!registry.remove(ConnectionId(1)));
        assert_eq!(registry.stats().left, 1);
    }

    #[test]
    fn test_membership_events() {
        let registry = Registry::new();
        let mut events = registry.subscribe();

        registry.add(connection(1, RecordingSink::default()));
        registry.remove(ConnectionId(1));
        registry.remove(ConnectionId(1));

        let joined = events.try_recv().unwrap();
        assert!(joined.is_join());
        assert_eq!(joined.id(), ConnectionId(1));

        let left = events.try_recv().unwrap();
        assert!(!left.is_join());
        assert_eq!(left.id(), ConnectionId(1));

        assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_add_remove() {
        let registry = Arc::new(Registry::new());
        let tasks = 16u64;
        let per_task = 50u64;

        let mut handles = Vec::new();
        for t in 0..tasks {
            let registry = Arc::clone(&registry);
            handles.push(tokio::spawn(async move {
                for i in 0..per_task {
                    let id = t * per_task + i;
                    assert!(registry.add(connection(id, RecordingSink::default())));
                    tokio::task::yield_now().await;
                    if id % 2 == 0 {
                        assert!(registry.remove(ConnectionId(id)));
                        // Second removal never counts
                        assert!(!registry.remove(ConnectionId(id)));
                    }
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let expected: HashSet<_> = (0..tasks * per_task)
            .filter(|id| id % 2 == 1)
            .map(ConnectionId)
            .collect();
        let actual: HashSet<_> = registry.snapshot().iter().map(|c| c.id()).collect();
        assert_eq!(actual, expected);

        let stats = registry.stats();
        assert_eq!(stats.joined, tasks * per_task);
        assert_eq!(stats.left, tasks * per_task / 2);
        assert_eq!(stats.members as u64, stats.joined - stats.left);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_duplicate_add() {
        let registry = Arc::new(Registry::new());

        let mut handles = Vec::new();
        for _ in 0..32 {
            let registry = Arc::clone(&registry);
            handles.push(tokio::spawn(async move {
                registry.add(connection(9, RecordingSink::default()))
            }));
        }

        let mut inserted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                inserted += 1;
            }
        }

        assert_eq!(inserted, 1);
        assert_eq!(registry.len(), 1);
    }
}
