use serde::Serialize;

/////////////////////////////////// Transformed Data ///////////////////////////////////
pub const SWAP_CSV_HEADER: [&str; 8] = [
    "HEIGHT",
    "TX_HASH",
    "SENDER",
    "RECEIVER",
    "OFFER_AMOUNT",
    "OFFER_DENOM",
    "ASK_AMOUNT",
    "ASK_DENOM",
];

// Field order is the CSV column order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwapRow {
    pub height: u64,
    pub tx_hash: String,
    pub sender: String,
    pub receiver: String,
    pub offer_amount: String,
    pub offer_denom: String,
    pub ask_amount: String,
    pub ask_denom: String,
}
