pub mod swaps;
pub mod txs;
