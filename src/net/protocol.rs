//! Wire protocol: every peer message is a JSON object carrying a channel
//! name and a channel-specific content payload.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::blockchain::block::Block;
use crate::config::{CHANNEL_CHAIN, CHANNEL_NODE, CHANNEL_SYNC, CHANNEL_TRANSACT};
use crate::error::P2PServerError;
use crate::transaction::Transaction;

/// A message as it appears on the wire: `{"channel": ..., "content": ...}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireMessage {
    pub channel: String,
    pub content: Value,
}

impl WireMessage {
    pub fn new(channel: &str, content: Value) -> WireMessage {
        WireMessage {
            channel: channel.to_string(),
            content,
        }
    }

    pub fn node_announce(uri: &str) -> WireMessage {
        WireMessage::new(CHANNEL_NODE, Value::String(uri.to_string()))
    }

    pub fn chain(chain: &[Block]) -> Result<WireMessage, P2PServerError> {
        let content = serde_json::to_value(chain)
            .map_err(|e| P2PServerError::Stringify(e.to_string()))?;
        Ok(WireMessage::new(CHANNEL_CHAIN, content))
    }

    pub fn sync(known_uris: &[String]) -> Result<WireMessage, P2PServerError> {
        let content = serde_json::to_value(known_uris)
            .map_err(|e| P2PServerError::Stringify(e.to_string()))?;
        Ok(WireMessage::new(CHANNEL_SYNC, content))
    }

    pub fn transaction(transaction: &Transaction) -> Result<WireMessage, P2PServerError> {
        let content = serde_json::to_value(transaction)
            .map_err(|e| P2PServerError::Stringify(e.to_string()))?;
        Ok(WireMessage::new(CHANNEL_TRANSACT, content))
    }

    pub fn to_json(&self) -> Result<String, P2PServerError> {
        serde_json::to_string(self).map_err(|e| P2PServerError::Stringify(e.to_string()))
    }

    pub fn from_json(raw: &str) -> Result<WireMessage, P2PServerError> {
        serde_json::from_str(raw).map_err(|e| P2PServerError::Parse(e.to_string()))
    }

    pub fn as_chain(&self) -> Result<Vec<Block>, P2PServerError> {
        serde_json::from_value(self.content.clone()).map_err(|e| P2PServerError::Parse(e.to_string()))
    }

    pub fn as_transaction(&self) -> Result<Transaction, P2PServerError> {
        serde_json::from_value(self.content.clone()).map_err(|e| P2PServerError::Parse(e.to_string()))
    }

    pub fn as_uri(&self) -> Result<String, P2PServerError> {
        self.content
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| P2PServerError::Parse("node content is not a uri string".to_string()))
    }

    pub fn as_uris(&self) -> Result<Vec<String>, P2PServerError> {
        serde_json::from_value(self.content.clone()).map_err(|e| P2PServerError::Parse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::chain::Blockchain;

    #[test]
    fn chain_message_roundtrips() {
        let chain = Blockchain::new();
        let message = WireMessage::chain(&chain.chain).unwrap();
        let json = message.to_json().unwrap();
        let decoded = WireMessage::from_json(&json).unwrap();
        assert_eq!(decoded.channel, CHANNEL_CHAIN);
        let decoded_chain = decoded.as_chain().unwrap();
        assert_eq!(decoded_chain, chain.chain);
    }

    #[test]
    fn sync_message_roundtrips() {
        let uris = vec!["ws://127.0.0.1:9000".to_string(), "ws://127.0.0.1:9001".to_string()];
        let message = WireMessage::sync(&uris).unwrap();
        let json = message.to_json().unwrap();
        let decoded = WireMessage::from_json(&json).unwrap();
        assert_eq!(decoded.channel, CHANNEL_SYNC);
        assert_eq!(decoded.as_uris().unwrap(), uris);
    }

    #[test]
    fn unknown_channel_is_still_parseable() {
        let message = WireMessage::from_json(r#"{"channel":"bogus","content":null}"#).unwrap();
        assert_eq!(message.channel, "bogus");
    }

    #[test]
    fn malformed_json_is_rejected() {
        assert!(WireMessage::from_json("not json").is_err());
    }
}
