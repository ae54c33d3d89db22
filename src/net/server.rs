//! The P2P server: binds a WebSocket listener, dials configured peers, and
//! gossips blockchain state over four channels (node/chain/sync/transact).

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tracing::{error, info, instrument, warn};

use crate::blockchain::chain::Blockchain;
use crate::config::{CHANNEL_CHAIN, CHANNEL_NODE, CHANNEL_SYNC, CHANNEL_TRANSACT, HEARTBEAT_RATE_SEC};
use crate::error::P2PServerError;
use crate::mempool::Mempool;
use crate::net::nodes::NodesNetwork;
use crate::net::protocol::WireMessage;

pub struct P2PServer {
    host: String,
    port: u16,
    blockchain: Arc<Mutex<Blockchain>>,
    mempool: Arc<Mutex<Mempool>>,
    nodes: Arc<Mutex<NodesNetwork>>,
}

impl P2PServer {
    pub fn new(blockchain: Arc<Mutex<Blockchain>>, mempool: Arc<Mutex<Mempool>>) -> P2PServer {
        P2PServer {
            host: String::new(),
            port: 0,
            blockchain,
            mempool,
            nodes: Arc::new(Mutex::new(NodesNetwork::new())),
        }
    }

    pub fn bind(&mut self, host: &str, port: u16) {
        self.host = host.to_string();
        self.port = port;
    }

    pub fn uri(&self) -> String {
        format!("ws://{}:{}", self.host, self.port)
    }

    /// Bind a TCP listener and spawn a task that accepts and dispatches
    /// inbound peer connections. Returns immediately; the accept loop runs
    /// in the background for the lifetime of the returned `JoinHandle`.
    pub async fn start(&self) -> Result<tokio::task::JoinHandle<()>, P2PServerError> {
        let addr = format!("{}:{}", self.host, self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| P2PServerError::Transport(e.to_string()))?;
        info!(%addr, "p2p server listening");

        let own_uri = self.uri();
        let blockchain = self.blockchain.clone();
        let mempool = self.mempool.clone();
        let nodes = self.nodes.clone();

        let handle = tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, peer_addr)) => {
                        let own_uri = own_uri.clone();
                        let blockchain = blockchain.clone();
                        let mempool = mempool.clone();
                        let nodes = nodes.clone();
                        tokio::spawn(async move {
                            if let Err(err) =
                                handle_inbound(stream, own_uri, blockchain, mempool, nodes).await
                            {
                                warn!(%peer_addr, %err, "inbound connection ended with error");
                            }
                        });
                    }
                    Err(err) => {
                        error!(%err, "accept failed");
                    }
                }
            }
        });

        Ok(handle)
    }

    /// Add every peer in `uris` (filtering out our own address), then dial
    /// each one with a short-lived socket announcing our own address. A
    /// peer that can't be reached is logged and skipped — one unreachable
    /// peer must not stop the rest of the set from connecting.
    pub async fn connect_nodes(&self, uris: &[String]) {
        let own_uri = self.uri();
        let filtered: Vec<String> = uris.iter().filter(|uri| **uri != own_uri).cloned().collect();

        let mut nodes = self.nodes.lock().await;
        nodes.add_uris(filtered.iter().cloned());

        let announce = WireMessage::node_announce(&own_uri);
        for uri in &filtered {
            match dial_and_send(uri, &announce).await {
                Ok(socket) => {
                    nodes.add_socket(socket);
                    info!(%uri, "connected to peer");
                }
                Err(err) => warn!(%uri, %err, "could not connect to peer"),
            }
        }
    }

    /// Broadcast the local chain to every known peer.
    pub async fn broadcast_chain(&self) -> Result<(), P2PServerError> {
        let chain = self.blockchain.lock().await.chain.clone();
        let message = WireMessage::chain(&chain)?;
        self.broadcast(&message).await
    }

    /// Broadcast a pending transaction to every known peer.
    pub async fn broadcast_transaction(
        &self,
        transaction: &crate::transaction::Transaction,
    ) -> Result<(), P2PServerError> {
        let message = WireMessage::transaction(transaction)?;
        self.broadcast(&message).await
    }

    /// Open one short-lived socket per known peer URI and send `message` on
    /// it. A peer that can't be reached or doesn't accept the send is
    /// logged and skipped — it does not fail the broadcast for the rest of
    /// the set.
    async fn broadcast(&self, message: &WireMessage) -> Result<(), P2PServerError> {
        let uris: Vec<String> = self.nodes.lock().await.known_uris().cloned().collect();
        for uri in &uris {
            if let Err(err) = dial_and_send(uri, message).await {
                warn!(%uri, %err, "failed to deliver broadcast to peer");
            }
        }
        Ok(())
    }

    /// Periodic synchronization tick: drop the outbound socket set, re-dial
    /// every known peer with the full local URI list, and warn if the
    /// known-peer and reconnected-socket counts end up incoherent.
    #[instrument(skip(self))]
    pub async fn heartbeat(&self) {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(HEARTBEAT_RATE_SEC));
        loop {
            interval.tick().await;
            self.synchronize().await;
        }
    }

    async fn synchronize(&self) {
        let mut nodes = self.nodes.lock().await;
        nodes.clear_sockets();

        let known: Vec<String> = nodes.known_uris().cloned().collect();
        let sync_message = match WireMessage::sync(&known) {
            Ok(message) => message,
            Err(err) => {
                warn!(%err, "could not build sync message, skipping this tick");
                return;
            }
        };

        for uri in &known {
            match dial_and_send(uri, &sync_message).await {
                Ok(socket) => nodes.add_socket(socket),
                Err(err) => warn!(%uri, %err, "could not reconnect to peer during synchronization"),
            }
        }

        if nodes.uri_count() != nodes.socket_count() {
            warn!(
                known_uris = nodes.uri_count(),
                open_sockets = nodes.socket_count(),
                "node/socket count incoherent after synchronization tick"
            );
        }
    }
}

/// Dial `uri`, send `message` over the new socket, and return the socket's
/// write half still open (the caller decides whether to keep it registered
/// or let it drop and close).
async fn dial_and_send(
    uri: &str,
    message: &WireMessage,
) -> Result<crate::net::nodes::OutboundSocket, P2PServerError> {
    let json = message.to_json()?;
    let (socket, _) = tokio_tungstenite::connect_async(uri)
        .await
        .map_err(|e| P2PServerError::Transport(e.to_string()))?;
    let (mut write, _read) = socket.split();
    write
        .send(Message::Text(json.into()))
        .await
        .map_err(|e| P2PServerError::Transport(e.to_string()))?;
    Ok(write)
}

async fn handle_inbound(
    stream: tokio::net::TcpStream,
    own_uri: String,
    blockchain: Arc<Mutex<Blockchain>>,
    mempool: Arc<Mutex<Mempool>>,
    nodes: Arc<Mutex<NodesNetwork>>,
) -> Result<(), P2PServerError> {
    let socket = tokio_tungstenite::accept_async(stream)
        .await
        .map_err(|e| P2PServerError::Transport(e.to_string()))?;
    let (_write, mut read) = socket.split();

    while let Some(frame) = read.next().await {
        let frame = frame.map_err(|e| P2PServerError::Transport(e.to_string()))?;
        let Message::Text(text) = frame else {
            continue;
        };
        let message = match WireMessage::from_json(&text) {
            Ok(m) => m,
            Err(err) => {
                warn!(%err, "dropping malformed inbound message");
                continue;
            }
        };
        dispatch(&message, &own_uri, &blockchain, &mempool, &nodes).await;
    }
    Ok(())
}

/// Dispatch a single parsed inbound message per its channel, per the
/// node/chain/sync/transact contract.
async fn dispatch(
    message: &WireMessage,
    own_uri: &str,
    blockchain: &Arc<Mutex<Blockchain>>,
    mempool: &Arc<Mutex<Mempool>>,
    nodes: &Arc<Mutex<NodesNetwork>>,
) {
    match message.channel.as_str() {
        CHANNEL_NODE => match message.as_uri() {
            Ok(uri) => {
                nodes.lock().await.add_uri(uri.clone());
                info!(%uri, "node listed");

                // A newcomer introducing itself expects to converge immediately:
                // dial it back and push our chain rather than waiting for the
                // next heartbeat tick.
                let chain_snapshot = blockchain.lock().await.chain.clone();
                match WireMessage::chain(&chain_snapshot) {
                    Ok(chain_message) => {
                        if let Err(err) = dial_and_send(&uri, &chain_message).await {
                            warn!(%uri, %err, "could not push chain to newly introduced peer");
                        }
                    }
                    Err(err) => warn!(%err, "failed to serialize chain for newly introduced peer"),
                }
            }
            Err(err) => warn!(%err, "dropping malformed node message"),
        },
        CHANNEL_SYNC => match message.as_uris() {
            Ok(uris) => {
                let mut nodes = nodes.lock().await;
                nodes.add_uris(uris.into_iter().filter(|uri| uri != own_uri));
            }
            Err(err) => warn!(%err, "dropping malformed sync message"),
        },
        CHANNEL_CHAIN => match message.as_chain() {
            Ok(candidate) => {
                let mut chain_guard = blockchain.lock().await;
                chain_guard.set_valid_chain(candidate);
                let chain_snapshot = chain_guard.chain.clone();
                drop(chain_guard);
                mempool.lock().await.clear_against(&Blockchain {
                    chain: chain_snapshot,
                });
            }
            Err(err) => warn!(%err, "dropping malformed chain message"),
        },
        CHANNEL_TRANSACT => match message.as_transaction() {
            Ok(transaction) => {
                if transaction.is_valid().is_ok() {
                    mempool.lock().await.add(transaction);
                } else {
                    warn!("dropping transaction that failed validation");
                }
            }
            Err(err) => warn!(%err, "dropping malformed transaction message"),
        },
        other => warn!(channel = other, "unknown channel, dropping message"),
    }
}
