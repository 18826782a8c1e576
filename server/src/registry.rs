//! Shared lookup tables of the directory server.
//!
//! Both registries follow the same discipline: reads share the lock, and a
//! mutation checks existence under the read lock before taking the write
//! lock. The write path re-checks, so of two racing inserts exactly one wins.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt::{Display, Formatter};
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::strset::StringSet;

/// Where a registered user's listener can be reached.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self { host: host.into(), port }
    }
}

impl From<SocketAddr> for Endpoint {
    fn from(addr: SocketAddr) -> Self {
        Self::new(addr.ip().to_string(), addr.port())
    }
}

impl Display for Endpoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// Username to endpoint. One endpoint per user, inserted once at bootstrap.
#[derive(Debug, Default)]
pub struct AddrRegistry {
    addrs: RwLock<HashMap<String, Endpoint>>,
}

impl AddrRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, user: &str) -> Option<Endpoint> {
        self.addrs.read().await.get(user).cloned()
    }

    /// Returns false without touching the map if `user` is already present.
    pub async fn add(&self, user: &str, endpoint: Endpoint) -> bool {
        if self.addrs.read().await.contains_key(user) {
            return false;
        }
        match self.addrs.write().await.entry(user.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(endpoint);
                true
            }
        }
    }

    pub async fn remove(&self, user: &str) -> bool {
        if !self.addrs.read().await.contains_key(user) {
            return false;
        }
        self.addrs.write().await.remove(user).is_some()
    }

    pub async fn len(&self) -> usize {
        self.addrs.read().await.len()
    }
}

/// A named group. An empty `owner` marks a group nobody explicitly created,
/// such as "global" or a client's cached copy.
#[derive(Debug, Clone)]
pub struct Group {
    pub owner: String,
    pub members: Arc<StringSet>,
}

impl Group {
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            members: Arc::new(StringSet::new()),
        }
    }
}

/// Group name to owner and members.
#[derive(Debug, Default)]
pub struct GroupRegistry {
    groups: RwLock<HashMap<String, Group>>,
}

impl GroupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, group: &str) -> Option<Group> {
        self.groups.read().await.get(group).cloned()
    }

    /// Creates an empty group owned by `owner`. False if the name is taken.
    pub async fn create(&self, group: &str, owner: &str) -> bool {
        if self.groups.read().await.contains_key(group) {
            return false;
        }
        match self.groups.write().await.entry(group.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(Group::new(owner));
                true
            }
        }
    }

    pub async fn delete(&self, group: &str) -> bool {
        if !self.groups.read().await.contains_key(group) {
            return false;
        }
        self.groups.write().await.remove(group).is_some()
    }

    /// True only for a new membership of an existing group.
    pub async fn add_member(&self, group: &str, user: &str) -> bool {
        match self.get(group).await {
            Some(group) => group.members.add(user).await,
            None => false,
        }
    }

    /// False if the group does not exist or `user` is not a member.
    pub async fn remove_member(&self, group: &str, user: &str) -> bool {
        match self.get(group).await {
            Some(group) => group.members.remove(user).await,
            None => false,
        }
    }

    /// Returns `(is_member, group_exists)`.
    pub async fn contains_member(&self, group: &str, user: &str) -> (bool, bool) {
        match self.get(group).await {
            Some(group) => (group.members.contains(user).await, true),
            None => (false, false),
        }
    }

    pub async fn list_names(&self) -> Vec<String> {
        self.groups.read().await.keys().cloned().collect()
    }
}
