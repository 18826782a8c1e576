//! Client agent for peerchat.
//!
//! A client registers with the directory server, then listens on the port the
//! server hands back for records pushed to it. Outgoing commands each travel
//! on their own connection; `groups` and `users` are answered from the local
//! [`GroupCache`] without touching the network.

pub mod cache;
pub mod config;
pub mod error;
pub mod input;

use std::net::SocketAddr;
use std::sync::Arc;

use futures::SinkExt;
use peerchat_server::codec::{self, RecordCodec, read_record, send_record};
use peerchat_server::{ALREADY_EXISTS, Message};
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio::sync::{Mutex, mpsc};
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

pub use cache::{GroupCache, LocalReply};
pub use config::ClientConfig;
pub use error::{ClientError, Result};
pub use input::Request;

pub type MessageReceiver = Arc<Mutex<mpsc::Receiver<Message>>>;

const LISTEN_BACKLOG: u32 = 1024;

#[derive(Clone, Debug)]
pub struct Client {
    username: String,
    server: String,
    listen_addr: SocketAddr,
    cache: Arc<GroupCache>,
    message_receiver: MessageReceiver,
    _listener_handle: Arc<tokio::task::JoinHandle<()>>,
}

impl Client {
    /// Registers `config.username` with the server and starts the inbound
    /// listener on the port the server replies with.
    ///
    /// Fails with [`ClientError::DuplicateUser`] if the name is taken, or
    /// [`ClientError::Bind`] if the listener cannot be started. In the latter
    /// case the registration is withdrawn so the name is free again.
    pub async fn connect(config: &ClientConfig) -> Result<Self> {
        let stream = Self::dial_reusable(&config.server).await?;
        let local_addr = stream.local_addr()?;

        let mut request = codec::framed::<_, Message>(stream);
        request.send(Message::init(&config.username)).await?;
        let mut reply = request.map_codec(|_| RecordCodec::<String>::new());
        let answer = read_record(&mut reply).await?;

        if answer == ALREADY_EXISTS {
            return Err(ClientError::DuplicateUser(config.username.clone()));
        }
        let Ok(port) = answer.parse::<u16>() else {
            Self::withdraw(reply, &config.username).await;
            return Err(ClientError::InvalidPort(answer));
        };

        let host = config.listen_host.unwrap_or(local_addr.ip());
        let listener = match Self::bind_listener(SocketAddr::new(host, port)) {
            Ok(listener) => listener,
            Err(e) => {
                Self::withdraw(reply, &config.username).await;
                return Err(e);
            }
        };
        let listen_addr = listener.local_addr()?;
        // Hanging up tells the server our listener is ready.
        drop(reply);
        info!(user = %config.username, %listen_addr, "listening for pushes");

        let cache = Arc::new(GroupCache::new());
        cache.seed(&config.username).await;

        let (incoming_tx, incoming_rx) = mpsc::channel::<Message>(100);
        let listener_handle = Self::spawn_listener(
            listener,
            config.username.clone(),
            Arc::clone(&cache),
            incoming_tx,
        );

        Ok(Client {
            username: config.username.clone(),
            server: config.server.clone(),
            listen_addr,
            cache,
            message_receiver: Arc::new(Mutex::new(incoming_rx)),
            _listener_handle: Arc::new(listener_handle),
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn listen_addr(&self) -> SocketAddr {
        self.listen_addr
    }

    pub fn cache(&self) -> &GroupCache {
        &self.cache
    }

    /// Handles one line of user input. Local commands return their reply;
    /// everything else is sent to the server and returns `None`.
    pub async fn handle_input(&self, line: &str) -> Result<Option<LocalReply>> {
        match input::parse(&self.username, line)? {
            None => Ok(None),
            Some(Request::Groups) => Ok(Some(self.cache.groups_reply().await)),
            Some(Request::Users(group)) => Ok(Some(self.cache.users_reply(group.as_deref()).await)),
            Some(Request::Remote(message)) => {
                self.send(message).await?;
                Ok(None)
            }
        }
    }

    pub async fn send(&self, message: Message) -> Result<()> {
        send_record(&self.server, message).await?;
        Ok(())
    }

    /// Tells the server we are leaving. No reply is expected.
    pub async fn disconnect(&self) -> Result<()> {
        self.send(Message::disconnect(&self.username)).await
    }

    /// Next pushed record that carries text to show.
    pub async fn receive_message(&self) -> Option<Message> {
        self.message_receiver.lock().await.recv().await
    }

    pub fn try_receive_message(&self) -> Option<Message> {
        self.message_receiver
            .try_lock()
            .ok()?
            .try_recv()
            .ok()
    }

    /// Connects with `SO_REUSEADDR` so the listener can later bind the same
    /// local port while this connection is still open.
    async fn dial_reusable(server: &str) -> Result<TcpStream> {
        Ok(codec::connect_with(server, |socket| socket.set_reuseaddr(true)).await?)
    }

    /// Asks the server to drop a registration we cannot use, on the
    /// bootstrap connection that is still open.
    async fn withdraw(reply: Framed<TcpStream, RecordCodec<String>>, username: &str) {
        let mut request = reply.map_codec(|_| RecordCodec::<Message>::new());
        if let Err(e) = request.send(Message::disconnect(username)).await {
            debug!(error = %e, "could not withdraw registration");
        }
    }

    fn bind_listener(addr: SocketAddr) -> Result<TcpListener> {
        let bind = || -> std::io::Result<TcpListener> {
            let socket = if addr.is_ipv4() { TcpSocket::new_v4()? } else { TcpSocket::new_v6()? };
            socket.set_reuseaddr(true)?;
            socket.bind(addr)?;
            socket.listen(LISTEN_BACKLOG)
        };
        bind().map_err(|source| ClientError::Bind { addr, source })
    }

    fn spawn_listener(
        listener: TcpListener,
        username: String,
        cache: Arc<GroupCache>,
        incoming_tx: mpsc::Sender<Message>,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, addr)) => {
                        debug!(%addr, "accepted push");
                        tokio::spawn(Self::handle_push(
                            stream,
                            username.clone(),
                            Arc::clone(&cache),
                            incoming_tx.clone(),
                        ));
                    }
                    Err(e) => warn!(error = %e, "error accepting push"),
                }
            }
        })
    }

    /// Decodes one pushed record, updates the cache and surfaces its text.
    async fn handle_push(
        stream: TcpStream,
        username: String,
        cache: Arc<GroupCache>,
        incoming_tx: mpsc::Sender<Message>,
    ) {
        let mut framed = codec::framed::<_, Message>(stream);
        let message = match read_record(&mut framed).await {
            Ok(message) => message,
            Err(e) => {
                debug!(error = %e, "dropping push");
                return;
            }
        };
        debug!(%message, "received push");

        cache.apply(&username, &message).await;
        if !message.body.is_empty() {
            // The receiver only goes away when the front end is shutting down.
            let _ = incoming_tx.send(message).await;
        }
    }
}
