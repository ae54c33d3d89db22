//! Mining: assemble the mempool plus a reward transaction into a new block.

use crate::blockchain::block::Block;
use crate::blockchain::chain::Blockchain;
use crate::error::BlockchainError;
use crate::mempool::Mempool;
use crate::transaction::Transaction;
use crate::wallet::Wallet;

/// Mint the mining reward, mine a block over the mempool's pending
/// transactions plus the reward, append it to `chain`, and clear the
/// mempool of everything that just got mined.
pub fn mine_pending(
    chain: &mut Blockchain,
    mempool: &mut Mempool,
    miner: &Wallet,
) -> Result<Block, BlockchainError> {
    let reward = Transaction::reward_mining(miner);
    let mut data = mempool.data();
    data.push(reward);

    let block = chain.add_block(data)?.clone();
    mempool.clear_against(chain);
    Ok(block)
}
