//! The client's private view of the groups it belongs to.
//!
//! It is never reconciled with the server; it only follows the records the
//! server pushes. Every rule is an idempotent add or remove, so duplicated
//! or reordered pushes cannot corrupt it.

use std::fmt::{Display, Formatter};

use peerchat_server::{Command, GLOBAL_GROUP, GroupRegistry, Message};

#[derive(Debug, Default)]
pub struct GroupCache {
    groups: GroupRegistry,
}

impl GroupCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the membership every session starts with.
    pub async fn seed(&self, me: &str) {
        self.groups.create(GLOBAL_GROUP, "").await;
        self.groups.add_member(GLOBAL_GROUP, me).await;
    }

    /// Applies one pushed record. `me` is this client's username.
    pub async fn apply(&self, me: &str, message: &Message) {
        let group = message.to.as_str();
        if message.user == me {
            match message.command {
                Command::Leave | Command::Delete => {
                    self.groups.delete(group).await;
                }
                Command::Create | Command::Join => {
                    self.groups.create(group, "").await;
                    self.groups.add_member(group, me).await;
                }
                _ => {}
            }
        } else {
            match message.command {
                Command::Leave | Command::Kick => {
                    self.groups.remove_member(group, &message.user).await;
                }
                Command::Delete => {
                    self.groups.delete(group).await;
                }
                // No-op when the group is not cached.
                Command::Join => {
                    self.groups.add_member(group, &message.user).await;
                }
                _ => {}
            }
        }
    }

    /// Cached group names, sorted.
    pub async fn group_names(&self) -> Vec<String> {
        let mut names = self.groups.list_names().await;
        names.sort();
        names
    }

    /// Cached members of `group`, sorted, or `None` if it is not cached.
    pub async fn members(&self, group: &str) -> Option<Vec<String>> {
        let group = self.groups.get(group).await?;
        let mut members = group.members.snapshot().await;
        members.sort();
        Some(members)
    }

    /// Answers the `groups` command.
    pub async fn groups_reply(&self) -> LocalReply {
        LocalReply::Groups(self.group_names().await)
    }

    /// Answers the `users` command.
    pub async fn users_reply(&self, group: Option<&str>) -> LocalReply {
        let Some(group) = group else {
            return LocalReply::MissingGroup;
        };
        match self.members(group).await {
            Some(members) => LocalReply::Users { group: group.to_string(), members },
            None => LocalReply::NotMember(group.to_string()),
        }
    }
}

/// Output of a command answered from the cache alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalReply {
    Groups(Vec<String>),
    Users { group: String, members: Vec<String> },
    NotMember(String),
    MissingGroup,
}

impl Display for LocalReply {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            LocalReply::Groups(names) if names.is_empty() => write!(f, "You belong to no groups."),
            LocalReply::Groups(names) => {
                write!(f, "Groups:")?;
                for name in names {
                    write!(f, "\n * {}", name)?;
                }
                Ok(())
            }
            LocalReply::Users { group, members } => {
                write!(f, "Users in {}:", group)?;
                for member in members {
                    write!(f, "\n * {}", member)?;
                }
                Ok(())
            }
            LocalReply::NotMember(group) => write!(f, "You do not belong to the group {}.", group),
            LocalReply::MissingGroup => write!(f, "Please enter a group name to get the users of."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push(user: &str, group: &str, command: Command) -> Message {
        Message::new(user, group, "", command)
    }

    async fn seeded(me: &str) -> GroupCache {
        let cache = GroupCache::new();
        cache.seed(me).await;
        cache
    }

    #[tokio::test]
    async fn test_seeded_with_global() {
        let cache = seeded("alice").await;
        assert_eq!(cache.group_names().await, vec!["global"]);
        assert_eq!(cache.members("global").await, Some(vec!["alice".to_string()]));
    }

    #[tokio::test]
    async fn test_self_join_then_third_party_leave() {
        let cache = seeded("alice").await;

        cache.apply("alice", &push("alice", "g", Command::Join)).await;
        cache.apply("alice", &push("bob", "g", Command::Join)).await;
        assert_eq!(cache.group_names().await, vec!["g", "global"]);
        assert_eq!(cache.members("g").await.unwrap(), vec!["alice", "bob"]);

        cache.apply("alice", &push("bob", "g", Command::Leave)).await;
        assert_eq!(cache.members("g").await.unwrap(), vec!["alice"]);
    }

    #[tokio::test]
    async fn test_self_leave_and_delete_drop_group() {
        let cache = seeded("alice").await;
        cache.apply("alice", &push("alice", "g", Command::Create)).await;
        cache.apply("alice", &push("alice", "h", Command::Join)).await;

        cache.apply("alice", &push("alice", "g", Command::Delete)).await;
        cache.apply("alice", &push("alice", "h", Command::Leave)).await;
        assert_eq!(cache.group_names().await, vec!["global"]);
    }

    #[tokio::test]
    async fn test_third_party_kick_and_delete() {
        let cache = seeded("alice").await;
        cache.apply("alice", &push("alice", "g", Command::Join)).await;
        cache.apply("alice", &push("bob", "g", Command::Join)).await;

        cache.apply("alice", &push("bob", "g", Command::Kick)).await;
        assert_eq!(cache.members("g").await.unwrap(), vec!["alice"]);

        cache.apply("alice", &push("owner", "g", Command::Delete)).await;
        assert_eq!(cache.members("g").await, None);
    }

    #[tokio::test]
    async fn test_duplicates_and_reordering() {
        let cache = seeded("alice").await;

        // A sync that overtakes our own join confirmation is dropped.
        cache.apply("alice", &push("bob", "g", Command::Join)).await;
        assert_eq!(cache.members("g").await, None);

        cache.apply("alice", &push("alice", "g", Command::Join)).await;
        cache.apply("alice", &push("alice", "g", Command::Join)).await;
        cache.apply("alice", &push("bob", "g", Command::Join)).await;
        cache.apply("alice", &push("bob", "g", Command::Join)).await;
        assert_eq!(cache.members("g").await.unwrap(), vec!["alice", "bob"]);

        cache.apply("alice", &push("bob", "g", Command::Leave)).await;
        cache.apply("alice", &push("bob", "g", Command::Leave)).await;
        assert_eq!(cache.members("g").await.unwrap(), vec!["alice"]);
    }

    #[tokio::test]
    async fn test_late_join_after_leave_does_not_restore_group() {
        let cache = seeded("alice").await;
        cache.apply("alice", &push("alice", "g", Command::Join)).await;
        cache.apply("alice", &push("alice", "g", Command::Leave)).await;

        let late = Message::new("bob", "g", "[g] bob has joined the group.", Command::Join);
        cache.apply("alice", &late).await;

        assert_eq!(cache.group_names().await, vec!["global"]);
        assert_eq!(
            cache.users_reply(Some("g")).await.to_string(),
            "You do not belong to the group g."
        );
    }

    #[tokio::test]
    async fn test_messages_without_cache_rules() {
        let cache = seeded("alice").await;
        cache.apply("alice", &Message::new("bob", "alice", "bob whispers hi", Command::Dm)).await;
        cache.apply("alice", &Message::notice("alice", "g", "Group g doesn't exist.")).await;
        assert_eq!(cache.group_names().await, vec!["global"]);
    }

    #[tokio::test]
    async fn test_local_replies() {
        let cache = seeded("alice").await;
        assert_eq!(cache.groups_reply().await.to_string(), "Groups:\n * global");
        assert_eq!(
            cache.users_reply(Some("global")).await.to_string(),
            "Users in global:\n * alice"
        );
        assert_eq!(
            cache.users_reply(Some("chess")).await.to_string(),
            "You do not belong to the group chess."
        );
        assert_eq!(cache.users_reply(None).await, LocalReply::MissingGroup);

        cache.apply("alice", &push("alice", "global", Command::Leave)).await;
        assert_eq!(cache.groups_reply().await.to_string(), "You belong to no groups.");
    }
}
