use thiserror::Error;

/// Errors raised while constructing, mining, or validating a single block.
#[derive(Debug, Error)]
pub enum BlockError {
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
    #[error("invalid difficulty: {0}")]
    InvalidDifficulty(String),
    #[error("invalid hash: {0}")]
    InvalidHash(String),
    #[error("invalid last_hash: {0}")]
    InvalidLastHash(String),
    #[error("hash does not meet declared difficulty")]
    DifficultyNotMet,
    #[error("block schema invalid: {0}")]
    Schema(String),
    #[error("{0}")]
    Invalid(String),
}

/// Errors raised while extending or validating a chain.
#[derive(Debug, Error)]
pub enum BlockchainError {
    #[error(transparent)]
    Block(#[from] BlockError),
    #[error("chain is empty")]
    EmptyChain,
    #[error("genesis block mismatch")]
    GenesisMismatch,
    #[error("{0}")]
    Invalid(String),
}

/// Errors raised while creating, updating, or validating a transaction.
#[derive(Debug, Error)]
pub enum TransactionError {
    #[error("amount must be greater than zero to make transaction")]
    NonPositiveAmount,
    #[error("amount {amount} exceeds wallet balance {balance}")]
    InsufficientBalance { amount: u64, balance: u64 },
    #[error("invalid recipient address: {0}")]
    InvalidRecipient(String),
    #[error("signature verification failed")]
    InvalidSignature,
    #[error("transaction schema invalid: {0}")]
    Schema(String),
    #[error("could not serialize transaction: {0}")]
    Serialize(String),
    #[error("could not deserialize transaction: {0}")]
    Deserialize(String),
}

/// Errors raised by wallet key management and signing.
#[derive(Debug, Error)]
pub enum WalletError {
    #[error("signing failed: {0}")]
    Signing(String),
    #[error("key encoding failed: {0}")]
    KeyEncoding(String),
    #[error("could not serialize: {0}")]
    Serialize(String),
}

/// Errors raised by the P2P server and wire transport.
#[derive(Debug, Error)]
pub enum P2PServerError {
    #[error("could not encode message: {0}")]
    Stringify(String),
    #[error("could not decode message data: {0}")]
    Parse(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("unknown channel: {0}")]
    UnknownChannel(String),
}
