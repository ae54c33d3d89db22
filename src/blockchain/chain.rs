//! The blockchain: an ordered, append-only list of blocks.

use std::collections::HashSet;

use tracing::warn;

use crate::blockchain::block::Block;
use crate::error::BlockchainError;
use crate::transaction::Transaction;

pub struct Blockchain {
    pub chain: Vec<Block>,
}

impl Default for Blockchain {
    fn default() -> Self {
        Blockchain::new()
    }
}

impl Blockchain {
    /// A fresh chain containing only the genesis block.
    pub fn new() -> Blockchain {
        Blockchain {
            chain: vec![Block::genesis()],
        }
    }

    pub fn genesis(&self) -> &Block {
        &self.chain[0]
    }

    pub fn last_block(&self) -> &Block {
        self.chain.last().expect("chain always has a genesis block")
    }

    pub fn length(&self) -> usize {
        self.chain.len()
    }

    /// Mine a new block over `data` and append it.
    pub fn add_block(&mut self, data: Vec<Transaction>) -> Result<&Block, BlockchainError> {
        let block = Block::mine_block(self.last_block(), data)?;
        self.chain.push(block);
        Ok(self.last_block())
    }

    /// Replace the local chain with `candidate` if it is both longer and
    /// valid. Invalid or shorter candidates are logged and otherwise
    /// ignored — a rejected chain replacement is never propagated as an
    /// error, since receiving one is routine gossip noise, not a local
    /// fault.
    pub fn set_valid_chain(&mut self, candidate: Vec<Block>) {
        if candidate.len() <= self.chain.len() {
            warn!(
                candidate_length = candidate.len(),
                local_length = self.chain.len(),
                "rejected chain replacement: not longer than local chain"
            );
            return;
        }
        if let Err(err) = Blockchain::is_valid(&candidate) {
            warn!(%err, "rejected chain replacement: invalid candidate chain");
            return;
        }
        self.chain = candidate;
    }

    /// Validate a candidate chain's block-to-block schema and linkage.
    pub fn is_valid(chain: &[Block]) -> Result<(), BlockchainError> {
        let Some(genesis) = chain.first() else {
            return Err(BlockchainError::EmptyChain);
        };
        if *genesis != Block::genesis() {
            return Err(BlockchainError::GenesisMismatch);
        }
        for window in chain.windows(2) {
            Block::is_valid(&window[0], &window[1])?;
        }
        Blockchain::is_valid_transaction_data(chain)?;
        Ok(())
    }

    /// Validate the transaction-history invariants across every block in
    /// `chain`: no repeated transaction uuids, at most one mining-reward
    /// transaction per block, and historic balance consistency for every
    /// sender (a sender's declared `input.amount` must equal the balance
    /// computed over the chain strictly preceding that block).
    pub fn is_valid_transaction_data(chain: &[Block]) -> Result<(), BlockchainError> {
        let mut seen_uuids: HashSet<u128> = HashSet::new();

        for (index, block) in chain.iter().enumerate() {
            let mut reward_count = 0usize;

            for transaction in block.data.iter() {
                transaction
                    .is_valid()
                    .map_err(|e| BlockchainError::Invalid(format!("invalid transaction: {e}")))?;

                if !seen_uuids.insert(transaction.uuid) {
                    return Err(BlockchainError::Invalid(
                        "Repetead transaction uuid found".to_string(),
                    ));
                }

                if transaction.is_mining_reward() {
                    reward_count += 1;
                    if reward_count > 1 {
                        return Err(BlockchainError::Invalid(
                            "Multiple mining rewards in the same block".to_string(),
                        ));
                    }
                    continue;
                }

                let preceding = Blockchain {
                    chain: chain[..index].to_vec(),
                };
                let historic_balance =
                    crate::wallet::Wallet::get_balance(&preceding, &transaction.input.address);
                if historic_balance != transaction.input.amount {
                    return Err(BlockchainError::Invalid(format!(
                        "historic balance inconsistency for {}: expected {historic_balance}, found {}",
                        transaction.input.address, transaction.input.amount
                    )));
                }
            }
        }
        Ok(())
    }
}
