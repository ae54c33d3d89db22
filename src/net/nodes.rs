//! Tracks the set of known peer URIs and the sockets currently open to them.

use std::collections::HashSet;

use futures_util::stream::SplitSink;
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, tungstenite::Message};

pub type OutboundSocket = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// Known peer `ws://host:port` URIs and the outbound sockets open to them.
///
/// The two sets are kept deliberately separate, mirroring the protocol's own
/// split: a URI can be known without a live socket (not yet dialed, or the
/// dial failed) and a socket always implies its URI is known.
#[derive(Default)]
pub struct NodesNetwork {
    uris: HashSet<String>,
    sockets: Vec<OutboundSocket>,
}

impl NodesNetwork {
    pub fn new() -> NodesNetwork {
        NodesNetwork {
            uris: HashSet::new(),
            sockets: Vec::new(),
        }
    }

    /// Register a peer URI, deduplicating against already-known peers.
    pub fn add_uri(&mut self, uri: impl Into<String>) {
        self.uris.insert(uri.into());
    }

    pub fn add_uris<I: IntoIterator<Item = String>>(&mut self, uris: I) {
        for uri in uris {
            self.add_uri(uri);
        }
    }

    pub fn known_uris(&self) -> impl Iterator<Item = &String> {
        self.uris.iter()
    }

    pub fn uri_count(&self) -> usize {
        self.uris.len()
    }

    pub fn add_socket(&mut self, socket: OutboundSocket) {
        self.sockets.push(socket);
    }

    /// Drop every currently registered outbound socket, closing each one.
    /// Called at the start of a synchronization tick before re-dialing.
    pub fn clear_sockets(&mut self) {
        self.sockets.clear();
    }

    pub fn socket_count(&self) -> usize {
        self.sockets.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adding_uris_deduplicates() {
        let mut nodes = NodesNetwork::new();
        nodes.add_uri("ws://127.0.0.1:9000");
        nodes.add_uri("ws://127.0.0.1:9000");
        nodes.add_uri("ws://127.0.0.1:9001");
        assert_eq!(nodes.uri_count(), 2);
    }
}
