//! The block: the storage unit of transactions linked into a blockchain by
//! proof-of-work.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::{BLOCK_HASH_LENGTH, BLOCK_MINING_RATE_MS, BLOCK_TIMESTAMP_LENGTH};
use crate::crypto::hash::{hash_block, hex_to_binary, to_json_string};
use crate::error::BlockError;
use crate::transaction::Transaction;

const GENESIS_LAST_HASH: &str = "genesis_last_hash";
const GENESIS_TIMESTAMP: i64 = 1;
const GENESIS_DIFFICULTY: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Block {
    pub index: u64,
    pub timestamp: i64,
    pub nonce: u64,
    pub difficulty: u32,
    pub data: Vec<Transaction>,
    pub last_hash: String,
    pub hash: String,
}

fn utcnow_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before epoch")
        .as_millis() as i64
}

/// The attributes that feed `hash_block`, in the original's field order.
/// Order doesn't affect the resulting hash (the arguments are sorted before
/// concatenation) but keeping it consistent keeps the code readable.
fn hashable_args(
    index: u64,
    timestamp: i64,
    nonce: u64,
    difficulty: u32,
    data: &[Transaction],
    last_hash: &str,
) -> Result<Vec<String>, BlockError> {
    Ok(vec![
        to_json_string(&index)?,
        to_json_string(&timestamp)?,
        to_json_string(&nonce)?,
        to_json_string(&difficulty)?,
        to_json_string(&data)?,
        to_json_string(&last_hash)?,
    ])
}

impl Block {
    /// The first block of any chain, constructed directly without running
    /// through schema validation — its sentinel `last_hash` and fixed
    /// `timestamp` would otherwise fail the timestamp-length and hash-format
    /// checks every other block must satisfy.
    pub fn genesis() -> Block {
        let args = hashable_args(
            0,
            GENESIS_TIMESTAMP,
            0,
            GENESIS_DIFFICULTY,
            &[],
            GENESIS_LAST_HASH,
        )
        .expect("genesis block attributes always serialize");
        let hash = hash_block(&args);
        Block {
            index: 0,
            timestamp: GENESIS_TIMESTAMP,
            nonce: 0,
            difficulty: GENESIS_DIFFICULTY,
            data: Vec::new(),
            last_hash: GENESIS_LAST_HASH.to_string(),
            hash,
        }
    }

    /// Mine a new block extending `last_block` with `data`, running
    /// proof-of-work until a hash meeting the adjusted difficulty is found.
    pub fn mine_block(last_block: &Block, data: Vec<Transaction>) -> Result<Block, BlockError> {
        let index = last_block.index + 1;
        let mut timestamp = utcnow_millis();
        let mut nonce = 0u64;
        let mut difficulty = Block::adjust_difficulty(last_block, timestamp);
        let last_hash = last_block.hash.clone();

        loop {
            let args = hashable_args(index, timestamp, nonce, difficulty, &data, &last_hash)?;
            let hash = hash_block(&args);
            if hex_to_binary(&hash).starts_with(&"0".repeat(difficulty as usize)) {
                return Ok(Block {
                    index,
                    timestamp,
                    nonce,
                    difficulty,
                    data,
                    last_hash,
                    hash,
                });
            }
            nonce += 1;
            timestamp = utcnow_millis();
            difficulty = Block::adjust_difficulty(last_block, timestamp);
        }
    }

    /// Adjust mining difficulty by at most one, to hold the mining rate
    /// steady at [`BLOCK_MINING_RATE_MS`]. Difficulty never drops below 1.
    pub fn adjust_difficulty(last_block: &Block, timestamp: i64) -> u32 {
        if last_block.timestamp + BLOCK_MINING_RATE_MS > timestamp {
            last_block.difficulty + 1
        } else if last_block.difficulty > 1 {
            last_block.difficulty - 1
        } else {
            1
        }
    }

    /// Validate the shape of a block's own attributes, independent of
    /// chain position. Does not apply to the genesis block.
    pub fn is_valid_schema(&self) -> Result<(), BlockError> {
        let digits = if self.timestamp == 0 {
            1
        } else {
            self.timestamp.unsigned_abs().ilog10() as usize + 1
        };
        if digits != BLOCK_TIMESTAMP_LENGTH {
            return Err(BlockError::InvalidTimestamp(self.timestamp.to_string()));
        }
        if self.difficulty == 0 {
            return Err(BlockError::InvalidDifficulty(self.difficulty.to_string()));
        }
        for (label, value) in [("last_hash", &self.last_hash), ("hash", &self.hash)] {
            if value.len() != BLOCK_HASH_LENGTH || !value.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(BlockError::InvalidHash(format!("{label}: {value}")));
            }
        }
        if !hex_to_binary(&self.hash).starts_with(&"0".repeat(self.difficulty as usize)) {
            return Err(BlockError::DifficultyNotMet);
        }
        let args = hashable_args(
            self.index,
            self.timestamp,
            self.nonce,
            self.difficulty,
            &self.data,
            &self.last_hash,
        )?;
        if self.hash != hash_block(&args) {
            return Err(BlockError::InvalidHash(self.hash.clone()));
        }
        Ok(())
    }

    /// Validate a candidate block against the chain's current last block:
    /// its own schema, hash linkage, and difficulty continuity.
    pub fn is_valid(last_block: &Block, candidate: &Block) -> Result<(), BlockError> {
        candidate.is_valid_schema()?;

        let mut failures = Vec::new();
        if candidate.last_hash != last_block.hash {
            failures.push("last_hash does not match previous block hash".to_string());
        }
        if last_block.difficulty.abs_diff(candidate.difficulty) > 1 {
            failures.push(format!(
                "block {} difficulty {} and block {} difficulty {} differ by more than 1",
                last_block.index, last_block.difficulty, candidate.index, candidate.difficulty
            ));
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(BlockError::Invalid(failures.join("; ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genesis_is_fixed() {
        let a = Block::genesis();
        let b = Block::genesis();
        assert_eq!(a, b);
        assert_eq!(a.index, 0);
    }

    #[test]
    fn mine_block_extends_chain() {
        let genesis = Block::genesis();
        let block = Block::mine_block(&genesis, vec![]).unwrap();
        assert_eq!(block.index, 1);
        assert_eq!(block.last_hash, genesis.hash);
        assert!(block.is_valid_schema().is_ok());
        assert!(Block::is_valid(&genesis, &block).is_ok());
    }

    #[test]
    fn difficulty_rises_when_mining_too_fast() {
        let last = Block::genesis();
        let fast_timestamp = last.timestamp + 1;
        assert_eq!(
            Block::adjust_difficulty(&last, fast_timestamp),
            last.difficulty + 1
        );
    }

    #[test]
    fn difficulty_falls_when_mining_too_slow_but_floors_at_one() {
        let last = Block::genesis();
        let slow_timestamp = last.timestamp + BLOCK_MINING_RATE_MS + 1;
        assert_eq!(Block::adjust_difficulty(&last, slow_timestamp), 1);
    }

    #[test]
    fn is_valid_rejects_hash_mismatch() {
        let genesis = Block::genesis();
        let mut block = Block::mine_block(&genesis, vec![]).unwrap();
        block.last_hash = "0".repeat(64);
        assert!(Block::is_valid(&genesis, &block).is_err());
    }

    #[test]
    fn is_valid_rejects_large_difficulty_jump() {
        let genesis = Block::genesis();
        let mut block = Block::mine_block(&genesis, vec![]).unwrap();
        block.difficulty += 5;
        // tamper difficulty only; hash will now fail schema too, which is
        // still a rejection, just via a different branch.
        assert!(Block::is_valid(&genesis, &block).is_err());
    }

    #[test]
    fn is_valid_reports_both_failures_at_once() {
        // Each mined block raises difficulty by 1 over its predecessor since
        // mining in a test takes far less than BLOCK_MINING_RATE_MS, so two
        // blocks chained past genesis differ from it by 2 in difficulty.
        // Checking the second block directly against genesis also mismatches
        // last_hash (it links to the first block, not genesis) — both link
        // checks fail on the same candidate.
        let genesis = Block::genesis();
        let block1 = Block::mine_block(&genesis, vec![]).unwrap();
        let block2 = Block::mine_block(&block1, vec![]).unwrap();

        let err = Block::is_valid(&genesis, &block2).unwrap_err().to_string();
        assert!(err.contains("last_hash"));
        assert!(err.contains("differ by more than 1"));
    }
}
