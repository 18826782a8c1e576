use std::collections::HashSet;
use tokio::sync::RwLock;

/// A set of names shared between tasks. Many readers, one writer.
#[derive(Debug, Default)]
pub struct StringSet {
    set: RwLock<HashSet<String>>,
}

impl StringSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if `s` was not already present.
    pub async fn add(&self, s: &str) -> bool {
        let mut set = self.set.write().await;
        set.insert(s.to_string())
    }

    pub async fn contains(&self, s: &str) -> bool {
        self.set.read().await.contains(s)
    }

    /// Returns true if `s` was present. Absent names only take the read lock.
    pub async fn remove(&self, s: &str) -> bool {
        if !self.contains(s).await {
            return false;
        }
        self.set.write().await.remove(s)
    }

    /// Point-in-time copy of the members, in no particular order.
    pub async fn snapshot(&self) -> Vec<String> {
        self.set.read().await.iter().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.set.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.set.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_add_is_idempotent() {
        let set = StringSet::new();
        assert!(set.add("alice").await);
        assert!(!set.add("alice").await);
        assert_eq!(set.len().await, 1);
        assert!(set.contains("alice").await);
    }

    #[tokio::test]
    async fn test_remove_missing_is_noop() {
        let set = StringSet::new();
        set.add("alice").await;
        assert!(!set.remove("bob").await);
        assert!(set.remove("alice").await);
        assert!(set.is_empty().await);
    }

    #[tokio::test]
    async fn test_snapshot_is_detached() {
        let set = StringSet::new();
        set.add("alice").await;
        let snapshot = set.snapshot().await;
        set.add("bob").await;
        assert_eq!(snapshot, vec!["alice".to_string()]);
    }

    #[tokio::test]
    async fn test_concurrent_adds() {
        let set = Arc::new(StringSet::new());
        let mut handles = Vec::new();
        for i in 0..32 {
            let set = Arc::clone(&set);
            handles.push(tokio::spawn(async move { set.add(&format!("user{}", i % 8)).await }));
        }

        let mut inserted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                inserted += 1;
            }
        }
        assert_eq!(inserted, 8);
        assert_eq!(set.len().await, 8);
    }
}
