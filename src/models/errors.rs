use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid height range: start height {start} is greater than end height {end}")]
    InvalidHeightRange { start: u64, end: u64 },
    #[error("Invalid load unit: transaction search page size must be greater than zero")]
    ZeroLoadUnit,
    #[error("Invalid retry config: max_attempts must be at least 1")]
    ZeroMaxAttempts,
    #[error("Invalid LCD url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

#[derive(Error, Debug)]
pub enum ChainError {
    #[error("Chain ID mismatch: configured {expected}, node reports {actual}")]
    ChainIdMismatch { expected: String, actual: String },
}

#[derive(Error, Debug)]
pub enum RpcError {
    #[error("LCD request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("LCD returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Malformed LCD response: {reason}")]
    MalformedResponse { reason: String },
}

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Missing event log for message {msg_index} in tx {tx_hash}")]
    MissingEventLog { tx_hash: String, msg_index: usize },
    #[error("Missing swap.swap_coin attribute for message {msg_index} in tx {tx_hash}")]
    MissingSwapCoin { tx_hash: String, msg_index: usize },
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to open output file {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to write CSV record: {0}")]
    Csv(#[from] csv::Error),
    #[error("Failed to flush output file: {0}")]
    Flush(#[from] std::io::Error),
}
