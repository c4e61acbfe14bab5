use std::collections::HashMap;
use std::fs;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::Result;
use tokio::sync::broadcast;

use terra_swap_indexer::indexer::{self, rpc::LedgerClient};
use terra_swap_indexer::models::common::{Config, MetricsConfig, RpcConfig};
use terra_swap_indexer::models::datasets::swaps::SwapRow;
use terra_swap_indexer::models::datasets::txs::{
    Coin, Msg, MsgSwap, MsgSwapSend, SearchPage, TxInfo, TxLog,
};
use terra_swap_indexer::models::errors::{ChainError, ExtractError, RpcError};
use terra_swap_indexer::storage::{CsvSink, SwapSink};
use terra_swap_indexer::utils::retry::RetryConfig;

const CHAIN_ID: &str = "columbus-4";

/// In-memory ledger keyed by (height, page). Unknown pages come back empty
/// with a page_total of 0.
#[derive(Default)]
struct FakeLedger {
    pages: HashMap<(u64, u64), SearchPage>,
    failing_height: Option<u64>,
    calls: Mutex<Vec<(u64, u64, u32)>>,
}

impl FakeLedger {
    fn with_page(mut self, height: u64, page: u64, page_total: u64, txs: Vec<TxInfo>) -> Self {
        self.pages.insert((height, page), SearchPage { txs, page_total });
        self
    }

    fn failing_at(mut self, height: u64) -> Self {
        self.failing_height = Some(height);
        self
    }

    fn calls(&self) -> Vec<(u64, u64, u32)> {
        self.calls.lock().unwrap().clone()
    }
}

impl LedgerClient for FakeLedger {
    async fn search_txs(&self, height: u64, page: u64, limit: u32) -> Result<SearchPage, RpcError> {
        self.calls.lock().unwrap().push((height, page, limit));

        if self.failing_height == Some(height) {
            return Err(RpcError::Status {
                status: 502,
                body: "Bad Gateway".to_string(),
            });
        }

        Ok(self.pages.get(&(height, page)).cloned().unwrap_or_default())
    }

    async fn node_chain_id(&self) -> Result<String, RpcError> {
        Ok(CHAIN_ID.to_string())
    }
}

#[derive(Default)]
struct MemorySink {
    batches: Vec<Vec<SwapRow>>,
    flushes: usize,
}

impl SwapSink for MemorySink {
    fn append(&mut self, rows: &[SwapRow]) -> Result<(), terra_swap_indexer::models::errors::StorageError> {
        self.batches.push(rows.to_vec());
        Ok(())
    }

    fn flush(&mut self) -> Result<(), terra_swap_indexer::models::errors::StorageError> {
        self.flushes += 1;
        Ok(())
    }
}

fn config(start_height: u64, end_height: u64, result_file_name: &str) -> Config {
    Config {
        result_file_name: result_file_name.to_string(),
        start_height,
        end_height,
        terra_url: "http://localhost:1317".to_string(),
        terra_chain_id: CHAIN_ID.to_string(),
        terra_txs_load_unit: 50,
        height_delay_ms: 0,
        append: false,
        rpc: RpcConfig::default(),
        metrics: MetricsConfig::default(),
    }
}

fn swap_log(swap_coin: &str) -> TxLog {
    let mut log = TxLog::default();
    log.events_by_type
        .entry("swap".to_string())
        .or_default()
        .insert("swap_coin".to_string(), vec![swap_coin.to_string()]);
    log
}

fn direct_swap_tx(height: u64, txhash: &str, trader: &str) -> TxInfo {
    TxInfo {
        height,
        txhash: txhash.to_string(),
        code: None,
        msgs: vec![Msg::Swap(MsgSwap {
            trader: trader.to_string(),
            offer_coin: Coin {
                denom: "uusd".to_string(),
                amount: "100".to_string(),
            },
            ask_denom: "ukrw".to_string(),
        })],
        logs: Some(vec![swap_log("100000 ukrw")]),
    }
}

fn swap_send_tx(height: u64, txhash: &str) -> TxInfo {
    TxInfo {
        height,
        txhash: txhash.to_string(),
        code: None,
        msgs: vec![Msg::SwapSend(MsgSwapSend {
            from_address: "terra1a".to_string(),
            to_address: "terra1b".to_string(),
            offer_coin: Coin {
                denom: "uluna".to_string(),
                amount: "5".to_string(),
            },
            ask_denom: "usdr".to_string(),
        })],
        logs: Some(vec![swap_log("3 usdr")]),
    }
}

fn no_shutdown() -> (broadcast::Sender<()>, broadcast::Receiver<()>) {
    broadcast::channel(1)
}

const HEADER: &str = "HEIGHT,TX_HASH,SENDER,RECEIVER,OFFER_AMOUNT,OFFER_DENOM,ASK_AMOUNT,ASK_DENOM";

#[tokio::test]
async fn test_end_to_end_writes_only_heights_with_swaps() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("swaps.csv");
    let path_str = path.to_string_lossy().into_owned();

    let ledger = FakeLedger::default()
        .with_page(100, 1, 1, vec![])
        .with_page(101, 1, 1, vec![direct_swap_tx(101, "HASH101", "terra1abc")]);
    let config = config(100, 101, &path_str);
    let mut sink = CsvSink::new(&config.result_file_name, config.append);
    let (_tx, mut rx) = no_shutdown();

    let summary = indexer::run(&ledger, &mut sink, &config, &mut rx, None).await?;

    assert_eq!(summary.heights_processed, 2);
    assert_eq!(summary.rows_written, 1);
    assert_eq!(summary.last_height, Some(101));
    assert!(!summary.interrupted);

    let contents = fs::read_to_string(&path)?;
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(
        lines,
        vec![
            HEADER,
            "101,HASH101,terra1abc,terra1abc,100,uusd,100000,ukrw",
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_fetches_every_page_in_order() -> Result<()> {
    let ledger = FakeLedger::default()
        .with_page(7, 1, 3, vec![direct_swap_tx(7, "P1", "terra1one")])
        .with_page(7, 2, 3, vec![swap_send_tx(7, "P2")])
        .with_page(
            7,
            3,
            3,
            vec![
                direct_swap_tx(7, "P3A", "terra1three"),
                direct_swap_tx(7, "P3B", "terra1four"),
            ],
        );

    let rows =
        indexer::fetch_swaps_at_height(&ledger, 7, 50, &RetryConfig::default(), None).await?;

    assert_eq!(ledger.calls(), vec![(7, 1, 50), (7, 2, 50), (7, 3, 50)]);
    let hashes: Vec<&str> = rows.iter().map(|row| row.tx_hash.as_str()).collect();
    assert_eq!(hashes, vec!["P1", "P2", "P3A", "P3B"]);
    assert_eq!(rows[1].sender, "terra1a");
    assert_eq!(rows[1].receiver, "terra1b");
    assert_eq!(rows[1].ask_amount, "3");
    Ok(())
}

#[tokio::test]
async fn test_page_total_zero_fetches_once() -> Result<()> {
    let ledger = FakeLedger::default();

    let rows =
        indexer::fetch_swaps_at_height(&ledger, 9, 50, &RetryConfig::default(), None).await?;

    assert!(rows.is_empty());
    assert_eq!(ledger.calls(), vec![(9, 1, 50)]);
    Ok(())
}

#[tokio::test]
async fn test_failed_and_unrelated_txs_append_nothing() -> Result<()> {
    let mut failed = direct_swap_tx(5, "FAILED", "terra1abc");
    failed.code = Some(5);
    failed.logs = None;
    let unrelated = TxInfo {
        height: 5,
        txhash: "SEND".to_string(),
        code: None,
        msgs: vec![Msg::Other {
            type_tag: "bank/MsgSend".to_string(),
        }],
        logs: Some(vec![TxLog::default()]),
    };

    let ledger = FakeLedger::default().with_page(5, 1, 1, vec![failed, unrelated]);
    let config = config(5, 5, "unused.csv");
    let mut sink = MemorySink::default();
    let (_tx, mut rx) = no_shutdown();

    let summary = indexer::run(&ledger, &mut sink, &config, &mut rx, None).await?;

    assert_eq!(summary.heights_processed, 1);
    assert_eq!(summary.rows_written, 0);
    assert!(sink.batches.is_empty());
    assert_eq!(sink.flushes, 1);
    Ok(())
}

#[tokio::test]
async fn test_fetch_error_aborts_after_writing_earlier_heights() {
    let ledger = FakeLedger::default()
        .with_page(1, 1, 1, vec![direct_swap_tx(1, "ONE", "terra1abc")])
        .with_page(3, 1, 1, vec![direct_swap_tx(3, "THREE", "terra1abc")])
        .failing_at(2);
    let config = config(1, 3, "unused.csv");
    let mut sink = MemorySink::default();
    let (_tx, mut rx) = no_shutdown();

    let result = indexer::run(&ledger, &mut sink, &config, &mut rx, None).await;

    let err = result.unwrap_err();
    assert!(err.to_string().contains("height 2"));
    assert!(err.chain().any(|cause| cause.downcast_ref::<RpcError>().is_some()));
    assert_eq!(sink.batches.len(), 1);
    assert_eq!(sink.batches[0][0].tx_hash, "ONE");
    assert!(ledger.calls().iter().all(|(height, _, _)| *height < 3));
}

#[tokio::test]
async fn test_missing_event_log_aborts_run() {
    let mut tx = direct_swap_tx(4, "NOLOG", "terra1abc");
    tx.logs = Some(vec![]);
    let ledger = FakeLedger::default().with_page(4, 1, 1, vec![tx]);
    let config = config(4, 4, "unused.csv");
    let mut sink = MemorySink::default();
    let (_tx, mut rx) = no_shutdown();

    let err = indexer::run(&ledger, &mut sink, &config, &mut rx, None)
        .await
        .unwrap_err();

    match err.downcast_ref::<ExtractError>() {
        Some(ExtractError::MissingEventLog { tx_hash, msg_index }) => {
            assert_eq!(tx_hash, "NOLOG");
            assert_eq!(*msg_index, 0);
        }
        other => panic!("expected MissingEventLog, got {:?}", other),
    }
    assert!(sink.batches.is_empty());
}

#[tokio::test]
async fn test_shutdown_stops_before_next_height() -> Result<()> {
    let ledger = FakeLedger::default();
    let config = config(10, 20, "unused.csv");
    let mut sink = MemorySink::default();
    let (tx, mut rx) = no_shutdown();
    tx.send(())?;

    let summary = indexer::run(&ledger, &mut sink, &config, &mut rx, None).await?;

    assert!(summary.interrupted);
    assert_eq!(summary.heights_processed, 0);
    assert_eq!(summary.last_height, None);
    assert!(ledger.calls().is_empty());
    Ok(())
}

// Heights 200..=204 are all empty; 200 also crosses the progress interval
#[tokio::test]
async fn test_waits_after_every_height() -> Result<()> {
    let ledger = FakeLedger::default();
    let mut config = config(200, 204, "unused.csv");
    config.height_delay_ms = 10;
    let mut sink = MemorySink::default();
    let (_tx, mut rx) = no_shutdown();

    let started = Instant::now();
    let summary = indexer::run(&ledger, &mut sink, &config, &mut rx, None).await?;
    let elapsed = started.elapsed();

    assert!(
        elapsed >= Duration::from_millis(50),
        "five heights finished in {:?}",
        elapsed
    );
    assert_eq!(summary.heights_processed, 5);
    assert_eq!(summary.last_height, Some(204));
    let heights: Vec<u64> = ledger.calls().iter().map(|(height, _, _)| *height).collect();
    assert_eq!(heights, vec![200, 201, 202, 203, 204]);
    assert!(sink.batches.is_empty());
    Ok(())
}

// No dedup key exists, so a second pass over the same range duplicates rows
#[tokio::test]
async fn test_rerun_in_append_mode_duplicates_rows() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("swaps.csv");
    let path_str = path.to_string_lossy().into_owned();

    let ledger =
        FakeLedger::default().with_page(50, 1, 1, vec![direct_swap_tx(50, "DUP", "terra1abc")]);
    let mut config = config(50, 50, &path_str);
    config.append = true;

    for _ in 0..2 {
        let mut sink = CsvSink::new(&config.result_file_name, config.append);
        let (_tx, mut rx) = no_shutdown();
        indexer::run(&ledger, &mut sink, &config, &mut rx, None).await?;
    }

    let contents = fs::read_to_string(&path)?;
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], HEADER);
    assert_eq!(lines[1], lines[2]);
    Ok(())
}

#[tokio::test]
async fn test_chain_id_verification() -> Result<()> {
    let ledger = FakeLedger::default();
    let retry_config = RetryConfig::default();

    indexer::verify_chain_id(&ledger, CHAIN_ID, &retry_config, None).await?;

    let err = indexer::verify_chain_id(&ledger, "bombay-12", &retry_config, None)
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ChainError>(),
        Some(ChainError::ChainIdMismatch { .. })
    ));
    Ok(())
}
