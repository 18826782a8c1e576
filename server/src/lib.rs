//! Directory server for peerchat.
//!
//! Tracks which users are online and where their listeners are, which groups
//! exist and who belongs to them. Every record travels on its own TCP
//! connection: clients dial in with a command, the server dials back out to
//! push notifications to each affected peer.

pub mod codec;
pub mod config;
pub mod directory;
pub mod error;
pub mod logging;
pub mod messages;
pub mod registry;
pub mod strset;

pub use directory::{Directory, FanoutReport};
pub use error::{ChatError, Result};
pub use messages::{ALREADY_EXISTS, Command, GLOBAL_GROUP, Message};
pub use registry::{AddrRegistry, Endpoint, Group, GroupRegistry};
pub use strset::StringSet;
