//! The wallet: holds a keypair and an address, and can compute its own
//! balance by scanning a chain.

use k256::ecdsa::SigningKey;
use uuid::Uuid;

use crate::blockchain::chain::Blockchain;
use crate::crypto::hash::to_json_string;
use crate::crypto::keys::{self, SignaturePair};
use crate::error::WalletError;

pub struct Wallet {
    /// 32 hex-character address, generated independently of the keypair —
    /// this system does not derive addresses from public keys.
    pub address: String,
    signing_key: SigningKey,
    pub public_key_pem: String,
}

impl Wallet {
    /// Create a new wallet: a random address and a fresh secp256k1 keypair.
    pub fn new() -> Result<Wallet, WalletError> {
        let signing_key = keys::generate_signing_key();
        let public_key_pem = keys::export_public_key_pem(&signing_key)?;
        Ok(Wallet {
            address: Uuid::new_v4().simple().to_string(),
            signing_key,
            public_key_pem,
        })
    }

    /// Sign JSON-serializable data with this wallet's private key.
    pub fn sign<T: serde::Serialize>(&self, data: &T) -> Result<SignaturePair, WalletError> {
        let encoded = to_json_string(data).map_err(|e| WalletError::Serialize(e.to_string()))?;
        keys::sign(&self.signing_key, encoded.as_bytes())
    }

    /// Current spendable balance for this wallet's address, computed by
    /// scanning `chain`.
    pub fn balance(&self, chain: &Blockchain) -> u64 {
        Wallet::get_balance(chain, &self.address)
    }

    /// Compute the balance for an arbitrary address by scanning `chain`.
    ///
    /// The balance resets to the declared output whenever `address` appears
    /// as a transaction's sender (its most recent outgoing transaction
    /// records its resulting balance as its own output entry), and
    /// accumulates every other transaction's output entry for `address`
    /// found afterwards.
    pub fn get_balance(chain: &Blockchain, address: &str) -> u64 {
        let mut balance = 0u64;
        for block in chain.chain.iter() {
            for transaction in block.data.iter() {
                if transaction.input.address == address {
                    balance = transaction.output.get(address).copied().unwrap_or(0);
                } else if let Some(amount) = transaction.output.get(address) {
                    balance += amount;
                }
            }
        }
        balance
    }
}
