//! Transactions: value transfer between a single sender wallet and one or
//! more recipient addresses.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::{MINING_REWARD, MINING_REWARD_ADDRESS};
use crate::crypto::keys::SignaturePair;
use crate::error::TransactionError;
use crate::wallet::Wallet;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransactionInput {
    pub timestamp: i64,
    pub amount: u64,
    pub address: String,
    pub public_key: String,
    pub signature: SignaturePair,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Transaction {
    pub uuid: u128,
    pub output: HashMap<String, u64>,
    pub input: TransactionInput,
}

fn utcnow_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before epoch")
        .as_millis() as i64
}

fn create_output(
    sender: &Wallet,
    recipient: &str,
    amount: u64,
    sender_balance: u64,
) -> HashMap<String, u64> {
    let mut output = HashMap::new();
    output.insert(recipient.to_string(), amount);
    output.insert(sender.address.clone(), sender_balance - amount);
    output
}

fn create_input(
    sender: &Wallet,
    output: &HashMap<String, u64>,
    sender_balance: u64,
) -> Result<TransactionInput, TransactionError> {
    let signature = sender
        .sign(output)
        .map_err(|e| TransactionError::Schema(e.to_string()))?;
    Ok(TransactionInput {
        timestamp: utcnow_millis(),
        amount: sender_balance,
        address: sender.address.clone(),
        public_key: sender.public_key_pem.clone(),
        signature,
    })
}

fn validate_recipient(recipient: &str) -> Result<(), TransactionError> {
    Uuid::parse_str(recipient)
        .map_err(|e| TransactionError::InvalidRecipient(e.to_string()))?;
    Ok(())
}

impl Transaction {
    /// Create a new transaction moving `amount` from `sender` to
    /// `recipient`, after validating the sender has a positive balance and
    /// enough of it.
    pub fn create(
        sender: &Wallet,
        recipient: &str,
        amount: u64,
        sender_balance: u64,
    ) -> Result<Transaction, TransactionError> {
        if sender_balance == 0 {
            return Err(TransactionError::NonPositiveAmount);
        }
        if amount >= sender_balance {
            return Err(TransactionError::InsufficientBalance {
                amount,
                balance: sender_balance,
            });
        }
        validate_recipient(recipient)?;

        let output = create_output(sender, recipient, amount, sender_balance);
        let input = create_input(sender, &output, sender_balance)?;
        Ok(Transaction {
            uuid: Uuid::new_v4().as_u128(),
            output,
            input,
        })
    }

    /// The protocol-minted reward transaction credited to a block's miner.
    /// Bypasses signing: its sentinel `input.address` identifies it as the
    /// one reward a block is allowed to contain.
    pub fn reward_mining(miner: &Wallet) -> Transaction {
        let mut output = HashMap::new();
        output.insert(miner.address.clone(), MINING_REWARD);
        Transaction {
            uuid: Uuid::new_v4().as_u128(),
            output,
            input: TransactionInput {
                timestamp: utcnow_millis(),
                amount: MINING_REWARD,
                address: MINING_REWARD_ADDRESS.to_string(),
                public_key: String::new(),
                signature: (Vec::new(), Vec::new()),
            },
        }
    }

    /// Whether this transaction's `input.address` is the mining-reward
    /// sentinel rather than a real wallet address.
    pub fn is_mining_reward(&self) -> bool {
        self.input.address == MINING_REWARD_ADDRESS
    }

    /// Extend an existing pending transaction with an additional transfer
    /// from the same sender, re-signing the updated output.
    pub fn update(
        &mut self,
        sender: &Wallet,
        recipient: &str,
        amount: u64,
    ) -> Result<(), TransactionError> {
        let address = sender.address.clone();
        let available = *self.output.get(&address).unwrap_or(&0);
        if amount > available {
            return Err(TransactionError::InsufficientBalance {
                amount,
                balance: available,
            });
        }
        validate_recipient(recipient)?;

        let existing = self.output.get(recipient).copied().unwrap_or(0);
        self.output.insert(recipient.to_string(), existing + amount);
        self.output.insert(address, available - amount);

        let sender_balance = self.input.amount;
        self.input = create_input(sender, &self.output, sender_balance)?;
        Ok(())
    }

    /// Validate the transaction's internal consistency: the sum of its
    /// outputs equals its declared input amount, and (for non-reward
    /// transactions) its signature verifies against its output.
    pub fn is_valid(&self) -> Result<(), TransactionError> {
        if self.is_mining_reward() {
            return Ok(());
        }

        let total: u64 = self.output.values().sum();
        if total != self.input.amount {
            return Err(TransactionError::Schema(format!(
                "output total {total} does not match input amount {}",
                self.input.amount
            )));
        }

        let encoded = crate::crypto::hash::to_json_string(&self.output)
            .map_err(|e| TransactionError::Serialize(e.to_string()))?;
        if !crate::crypto::keys::verify(&self.input.public_key, &self.input.signature, encoded.as_bytes()) {
            return Err(TransactionError::InvalidSignature);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recipient_address() -> String {
        Uuid::new_v4().simple().to_string()
    }

    #[test]
    fn create_splits_output_between_recipient_and_sender() {
        let sender = Wallet::new().unwrap();
        let recipient = recipient_address();
        let tx = Transaction::create(&sender, &recipient, 40, 100).unwrap();
        assert_eq!(tx.output.get(&recipient), Some(&40));
        assert_eq!(tx.output.get(&sender.address), Some(&60));
        assert!(tx.is_valid().is_ok());
    }

    #[test]
    fn create_rejects_amount_exceeding_balance() {
        let sender = Wallet::new().unwrap();
        let recipient = recipient_address();
        let err = Transaction::create(&sender, &recipient, 100, 100).unwrap_err();
        assert!(matches!(err, TransactionError::InsufficientBalance { .. }));
    }

    #[test]
    fn create_rejects_zero_balance_sender() {
        let sender = Wallet::new().unwrap();
        let recipient = recipient_address();
        let err = Transaction::create(&sender, &recipient, 10, 0).unwrap_err();
        assert!(matches!(err, TransactionError::NonPositiveAmount));
    }

    #[test]
    fn update_re_signs_and_adjusts_output() {
        let sender = Wallet::new().unwrap();
        let recipient = recipient_address();
        let mut tx = Transaction::create(&sender, &recipient, 20, 100).unwrap();
        tx.update(&sender, &recipient, 10).unwrap();
        assert_eq!(tx.output.get(&recipient), Some(&30));
        assert_eq!(tx.output.get(&sender.address), Some(&70));
        assert!(tx.is_valid().is_ok());
    }

    #[test]
    fn reward_mining_is_self_valid_without_signature() {
        let miner = Wallet::new().unwrap();
        let tx = Transaction::reward_mining(&miner);
        assert!(tx.is_mining_reward());
        assert_eq!(tx.output.get(&miner.address), Some(&MINING_REWARD));
        assert!(tx.is_valid().is_ok());
    }

    #[test]
    fn is_valid_rejects_tampered_output() {
        let sender = Wallet::new().unwrap();
        let recipient = recipient_address();
        let mut tx = Transaction::create(&sender, &recipient, 20, 100).unwrap();
        tx.output.insert(recipient, 999);
        assert!(tx.is_valid().is_err());
    }
}
