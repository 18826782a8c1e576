use std::fmt::{Display, Formatter};
use std::str::FromStr;
use serde::{Deserialize, Serialize};

/// Name of the implicit group every registered user belongs to.
pub const GLOBAL_GROUP: &str = "global";

/// Bootstrap reply sent instead of a port when the username is taken.
pub const ALREADY_EXISTS: &str = "alreadyExists";

/// Commands understood by the directory server.
///
/// `Notice` marks a plain reply that carries text only and never touches a
/// client's group cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Command {
    Init,
    Join,
    Dm,
    Group,
    Leave,
    Create,
    Delete,
    Kick,
    Disconnect,
    Notice,
}

impl Command {
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Init => "init",
            Command::Join => "join",
            Command::Dm => "dm",
            Command::Group => "group",
            Command::Leave => "leave",
            Command::Create => "create",
            Command::Delete => "delete",
            Command::Kick => "kick",
            Command::Disconnect => "disconnect",
            Command::Notice => "notice",
        }
    }
}

impl Display for Command {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown command '{0}'")]
pub struct UnknownCommand(pub String);

impl FromStr for Command {
    type Err = UnknownCommand;

    /// Parses the commands a user may send to the server. `notice` is reserved
    /// for server replies and is not accepted here.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "init" => Ok(Command::Init),
            "join" => Ok(Command::Join),
            "dm" => Ok(Command::Dm),
            "group" => Ok(Command::Group),
            "leave" => Ok(Command::Leave),
            "create" => Ok(Command::Create),
            "delete" => Ok(Command::Delete),
            "kick" => Ok(Command::Kick),
            "disconnect" => Ok(Command::Disconnect),
            other => Err(UnknownCommand(other.to_string())),
        }
    }
}

/// The single unit sent over a connection.
///
/// `to` is a user or group name depending on the command; `kick` carries the
/// target user in `body`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub user: String,
    pub to: String,
    pub body: String,
    pub command: Command,
}

impl Message {
    pub fn new(
        user: impl Into<String>,
        to: impl Into<String>,
        body: impl Into<String>,
        command: Command,
    ) -> Self {
        Self {
            user: user.into(),
            to: to.into(),
            body: body.into(),
            command,
        }
    }

    pub fn init(user: impl Into<String>) -> Self {
        Self::new(user, "", "", Command::Init)
    }

    pub fn disconnect(user: impl Into<String>) -> Self {
        Self::new(user, "", "", Command::Disconnect)
    }

    /// Plain text reply to `user` about `group`.
    pub fn notice(user: impl Into<String>, group: impl Into<String>, body: impl Into<String>) -> Self {
        Self::new(user, group, body, Command::Notice)
    }

    /// Reply confirming that `user` performed `command` on `group`; the
    /// receiving client updates its cache from it.
    pub fn confirm(
        user: impl Into<String>,
        group: impl Into<String>,
        body: impl Into<String>,
        command: Command,
    ) -> Self {
        Self::new(user, group, body, command)
    }

    /// Body-less `join` telling a client that `member` belongs to `group`.
    pub fn cache_sync(member: impl Into<String>, group: impl Into<String>) -> Self {
        Self::new(member, group, "", Command::Join)
    }

    /// Copy of this record with its body prefixed by the group name, as
    /// delivered to each member during fan-out.
    pub fn for_group_member(&self) -> Self {
        let body = if self.body.is_empty() {
            String::new()
        } else {
            format!("[{}] {}", self.to, self.body)
        };
        Self::new(self.user.clone(), self.to.clone(), body, self.command)
    }
}

impl Display for Message {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {} -> {}: {}", self.command, self.user, self.to, self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_parse() {
        assert_eq!("kick".parse::<Command>(), Ok(Command::Kick));
        assert_eq!(
            "groups".parse::<Command>(),
            Err(UnknownCommand("groups".to_string()))
        );
        assert!("notice".parse::<Command>().is_err());
    }

    #[test]
    fn test_command_wire_names() {
        let json = serde_json::to_string(&Command::Disconnect).unwrap();
        assert_eq!(json, "\"disconnect\"");
        for command in [Command::Init, Command::Join, Command::Group, Command::Kick] {
            let encoded = serde_json::to_string(&command).unwrap();
            assert_eq!(encoded, format!("\"{}\"", command.as_str()));
        }
    }

    #[test]
    fn test_group_member_copy_prefixes_body() {
        let message = Message::new("alice", "football", "alice: hello", Command::Group);
        let delivered = message.for_group_member();

        assert_eq!(delivered.body, "[football] alice: hello");
        assert_eq!(delivered.user, "alice");
        assert_eq!(delivered.command, Command::Group);
    }

    #[test]
    fn test_cache_sync_has_no_body() {
        let message = Message::cache_sync("bob", GLOBAL_GROUP).for_group_member();
        assert!(message.body.is_empty());
        assert_eq!(message.command, Command::Join);
    }
}
