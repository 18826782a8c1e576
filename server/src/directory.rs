use std::net::SocketAddr;
use std::sync::Arc;

use futures::SinkExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::codec::{self, RecordCodec, read_record, send_record};
use crate::error::{ChatError, Result};
use crate::messages::{ALREADY_EXISTS, Command, GLOBAL_GROUP, Message};
use crate::registry::{AddrRegistry, Endpoint, GroupRegistry};

/// Outcome of pushing one record to every other member of a group.
#[derive(Debug, Default)]
pub struct FanoutReport {
    pub delivered: Vec<String>,
    pub failed: Vec<(String, ChatError)>,
}

/// The directory server: who is online where, and who is in which group.
#[derive(Debug, Default)]
pub struct Directory {
    addrs: AddrRegistry,
    groups: GroupRegistry,
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn addrs(&self) -> &AddrRegistry {
        &self.addrs
    }

    pub fn groups(&self) -> &GroupRegistry {
        &self.groups
    }

    /// Accepts connections forever, one task per connection.
    pub async fn serve(self: Arc<Self>, listener: TcpListener) {
        loop {
            match listener.accept().await {
                Ok((stream, addr)) => {
                    debug!(%addr, "accepted connection");
                    let directory = Arc::clone(&self);
                    tokio::spawn(async move {
                        if let Err(e) = directory.handle_connection(stream, addr).await {
                            warn!(%addr, error = %e, "dropping connection");
                        }
                    });
                }
                Err(e) => {
                    error!(error = %e, "error accepting connection");
                }
            }
        }
    }

    /// Decodes the connection's single record and acts on it.
    pub async fn handle_connection(&self, stream: TcpStream, peer: SocketAddr) -> Result<()> {
        let mut framed = codec::framed::<_, Message>(stream);
        let request = read_record(&mut framed).await?;
        debug!(%peer, %request, "received record");

        let outcome = match request.command {
            Command::Init => {
                return self.handle_init(request.user, peer, framed.into_inner()).await;
            }
            Command::Join => self.handle_join(&request).await,
            Command::Dm => {
                self.handle_dm(&request).await;
                Ok(())
            }
            Command::Group => self.handle_group(&request).await,
            Command::Leave => self.handle_leave(&request).await,
            Command::Create => self.handle_create(&request).await,
            Command::Delete => self.handle_delete(&request).await,
            Command::Kick => self.handle_kick(&request).await,
            Command::Disconnect => {
                self.handle_disconnect(&request.user).await;
                Ok(())
            }
            Command::Notice => {
                warn!(%peer, user = %request.user, "ignoring notice sent to the server");
                Ok(())
            }
        };

        if let Err(refusal) = outcome {
            debug!(user = %request.user, command = %request.command, reason = %refusal, "refused");
            let notice = Message::notice(&request.user, &request.to, refusal.to_string());
            self.notify(&request.user, notice).await;
        }
        Ok(())
    }

    async fn handle_init(&self, user: String, peer: SocketAddr, stream: TcpStream) -> Result<()> {
        let mut reply = codec::framed::<_, String>(stream);

        let endpoint = Endpoint::from(peer);
        if !self.addrs.add(&user, endpoint.clone()).await {
            info!(%user, "rejecting duplicate registration");
            reply.send(ALREADY_EXISTS.to_string()).await?;
            return Ok(());
        }
        info!(%user, %endpoint, "registered user");
        reply.send(endpoint.port.to_string()).await?;

        // The client binds its listener before hanging up. If it cannot, it
        // sends a disconnect on this connection instead.
        let mut follow_up = reply.map_codec(|_| RecordCodec::<Message>::new());
        if let Ok(message) = read_record(&mut follow_up).await {
            if message.command == Command::Disconnect && message.user == user {
                info!(%user, "registration withdrawn");
                self.addrs.remove(&user).await;
                return Ok(());
            }
            debug!(%user, %message, "ignoring record on bootstrap connection");
        }
        drop(follow_up);

        self.groups.create(GLOBAL_GROUP, "").await;
        self.groups.add_member(GLOBAL_GROUP, &user).await;

        if let Some(global) = self.groups.get(GLOBAL_GROUP).await {
            for member in global.members.snapshot().await {
                if member != user {
                    self.notify(&user, Message::cache_sync(member, GLOBAL_GROUP)).await;
                }
            }
        }

        let online = Message::new(&user, GLOBAL_GROUP, format!("{} is online.", user), Command::Join);
        self.send_group(&online).await;
        Ok(())
    }

    async fn handle_join(&self, request: &Message) -> Result<()> {
        let (user, group) = (&request.user, &request.to);
        if !self.groups.add_member(group, user).await {
            return match self.groups.contains_member(group, user).await {
                (true, _) => Err(ChatError::AlreadyMember(group.clone())),
                (false, _) => Err(ChatError::GroupNotFound(group.clone())),
            };
        }

        let joined = Message::new(user, group, format!("{} has joined the group.", user), Command::Join);
        self.send_group(&joined).await;

        let confirm = Message::confirm(user, group, format!("You have joined the group {}.", group), Command::Join);
        self.notify(user, confirm).await;

        if let Some(members) = self.groups.get(group).await {
            for member in members.members.snapshot().await {
                if &member != user {
                    self.notify(user, Message::cache_sync(member, group)).await;
                }
            }
        }
        Ok(())
    }

    async fn handle_dm(&self, request: &Message) {
        let whisper = Message::new(
            &request.user,
            &request.to,
            format!("{} whispers {}", request.user, request.body),
            Command::Dm,
        );
        self.notify(&request.to, whisper).await;
    }

    async fn handle_group(&self, request: &Message) -> Result<()> {
        let (user, group) = (&request.user, &request.to);
        match self.groups.contains_member(group, user).await {
            (true, _) => {
                let broadcast = Message::new(user, group, format!("{}: {}", user, request.body), Command::Group);
                self.send_group(&broadcast).await;

                let echo = Message::notice(user, group, format!("[{}] {}: {}", group, user, request.body));
                self.notify(user, echo).await;
                Ok(())
            }
            (false, true) => Err(ChatError::NoAccess(group.clone())),
            (false, false) => Err(ChatError::GroupNotFound(group.clone())),
        }
    }

    async fn handle_leave(&self, request: &Message) -> Result<()> {
        let (user, group) = (&request.user, &request.to);
        if !self.groups.remove_member(group, user).await {
            return match self.groups.get(group).await {
                Some(_) => Err(ChatError::NotMember { user: user.clone(), group: group.clone() }),
                None => Err(ChatError::GroupNotFound(group.clone())),
            };
        }

        let left = Message::new(user, group, format!("{} has left the group.", user), Command::Leave);
        self.send_group(&left).await;

        let confirm = Message::confirm(user, group, format!("You have left the group {}.", group), Command::Leave);
        self.notify(user, confirm).await;
        Ok(())
    }

    async fn handle_create(&self, request: &Message) -> Result<()> {
        let (user, group) = (&request.user, &request.to);
        if !self.groups.create(group, user).await {
            return Err(ChatError::AlreadyExists(group.clone()));
        }
        self.groups.add_member(group, user).await;
        info!(%user, %group, "created group");

        let confirm = Message::confirm(user, group, format!("You created the group {}!", group), Command::Create);
        self.notify(user, confirm).await;
        Ok(())
    }

    async fn handle_delete(&self, request: &Message) -> Result<()> {
        let (user, group) = (&request.user, &request.to);
        let existing = self
            .groups
            .get(group)
            .await
            .ok_or_else(|| ChatError::GroupNotFound(group.clone()))?;
        if &existing.owner != user {
            return Err(ChatError::Permission { action: "delete the group", group: group.clone() });
        }

        let deleted = Message::new(user, group, "has been deleted.", Command::Delete);
        self.send_group(&deleted).await;
        self.groups.delete(group).await;
        info!(%user, %group, "deleted group");

        let confirm = Message::confirm(user, group, format!("You deleted the group {}!", group), Command::Delete);
        self.notify(user, confirm).await;
        Ok(())
    }

    /// The user to remove travels in the request body.
    async fn handle_kick(&self, request: &Message) -> Result<()> {
        let (user, group, target) = (&request.user, &request.to, request.body.trim());
        let existing = self
            .groups
            .get(group)
            .await
            .ok_or_else(|| ChatError::GroupNotFound(group.clone()))?;
        if &existing.owner != user {
            return Err(ChatError::Permission { action: "remove users from group", group: group.clone() });
        }
        if !self.groups.remove_member(group, target).await {
            return Err(ChatError::NotMember { user: target.to_string(), group: group.clone() });
        }
        info!(%user, %group, %target, "kicked member");

        let kicked = Message::new(target, group, format!("{} has been kicked from the group.", target), Command::Kick);
        self.send_group(&kicked).await;

        let removed = Message::confirm(
            target,
            group,
            format!("[{}] You've been removed from the group.", group),
            Command::Leave,
        );
        self.notify(target, removed).await;
        Ok(())
    }

    async fn handle_disconnect(&self, user: &str) {
        if !self.addrs.remove(user).await {
            info!(%user, "disconnect from unknown user");
            return;
        }
        info!(%user, "user disconnected");

        for group in self.groups.list_names().await {
            if let (true, _) = self.groups.contains_member(&group, user).await {
                self.groups.remove_member(&group, user).await;
                let left = Message::new(user, &group, format!("{} has left the group.", user), Command::Leave);
                self.send_group(&left).await;
            }
        }
    }

    /// Pushes `message` to `user` on a fresh connection.
    pub async fn send_one(&self, message: Message, user: &str) -> Result<()> {
        let endpoint = self
            .addrs
            .get(user)
            .await
            .ok_or_else(|| ChatError::UserNotFound(user.to_string()))?;
        send_record(&endpoint.to_string(), message).await
    }

    async fn notify(&self, user: &str, message: Message) {
        if let Err(e) = self.send_one(message, user).await {
            warn!(%user, error = %e, "could not deliver record");
        }
    }

    /// Pushes `message` to every member of `message.to` except its sender.
    ///
    /// Each delivery runs as its own task; results come back over a channel
    /// that closes once the last task finishes. A failed member is logged
    /// and does not stop delivery to the others.
    pub async fn send_group(&self, message: &Message) -> FanoutReport {
        let mut report = FanoutReport::default();
        let Some(group) = self.groups.get(&message.to).await else {
            warn!(group = %message.to, "group message to missing group");
            report
                .failed
                .push((message.to.clone(), ChatError::GroupNotFound(message.to.clone())));
            return report;
        };

        let (tx, mut rx) = mpsc::unbounded_channel();
        for member in group.members.snapshot().await {
            if member == message.user {
                continue;
            }
            let endpoint = self.addrs.get(&member).await;
            let delivery = message.for_group_member();
            let tx = tx.clone();
            tokio::spawn(async move {
                let result = match endpoint {
                    Some(endpoint) => send_record(&endpoint.to_string(), delivery).await,
                    None => Err(ChatError::UserNotFound(member.clone())),
                };
                let _ = tx.send((member, result));
            });
        }
        drop(tx);

        while let Some((member, result)) = rx.recv().await {
            match result {
                Ok(()) => report.delivered.push(member),
                Err(e) => {
                    warn!(%member, group = %message.to, error = %e, "group message error");
                    report.failed.push((member, e));
                }
            }
        }
        report
    }
}
