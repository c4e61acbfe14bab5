use crate::models::datasets::txs::{
    Msg, MsgSwap, MsgSwapSend, RpcMsg, RpcSearchResponse, RpcTxInfo, RpcTxLog, SearchPage, TxInfo,
    TxLog, MSG_SWAP_SEND_TYPE, MSG_SWAP_TYPE,
};
use crate::models::errors::RpcError;

pub trait TxParser {
    fn parse_search_page(self) -> Result<SearchPage, RpcError>;
}

impl TxParser for RpcSearchResponse {
    fn parse_search_page(self) -> Result<SearchPage, RpcError> {
        let page_total = self
            .page_total
            .as_ref()
            .ok_or_else(|| malformed("search response is missing page_total"))?
            .as_u64()
            .ok_or_else(|| malformed("page_total is not an integer"))?;

        let txs = self
            .txs
            .ok_or_else(|| malformed("search response is missing txs"))?
            .into_iter()
            .map(parse_tx)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(SearchPage { txs, page_total })
    }
}

fn parse_tx(tx: RpcTxInfo) -> Result<TxInfo, RpcError> {
    let height = tx
        .height
        .as_u64()
        .ok_or_else(|| malformed(format!("tx {} has a non-integer height", tx.txhash)))?;

    let msgs = tx
        .tx
        .value
        .msg
        .into_iter()
        .map(|msg| parse_msg(msg, &tx.txhash))
        .collect::<Result<Vec<_>, _>>()?;

    let logs = tx
        .logs
        .map(|logs| logs.into_iter().map(parse_log).collect());

    Ok(TxInfo {
        height,
        txhash: tx.txhash,
        code: tx.code.map(Option::unwrap_or_default),
        msgs,
        logs,
    })
}

fn parse_msg(msg: RpcMsg, tx_hash: &str) -> Result<Msg, RpcError> {
    let decode_error = |e: serde_json::Error| {
        malformed(format!("tx {}: invalid {} payload: {}", tx_hash, msg.type_tag, e))
    };

    match msg.type_tag.as_str() {
        MSG_SWAP_TYPE => serde_json::from_value::<MsgSwap>(msg.value.clone())
            .map(Msg::Swap)
            .map_err(decode_error),
        MSG_SWAP_SEND_TYPE => serde_json::from_value::<MsgSwapSend>(msg.value.clone())
            .map(Msg::SwapSend)
            .map_err(decode_error),
        _ => Ok(Msg::Other {
            type_tag: msg.type_tag.clone(),
        }),
    }
}

fn parse_log(log: RpcTxLog) -> TxLog {
    let mut parsed = TxLog::default();

    for event in log.events {
        let attributes = parsed.events_by_type.entry(event.event_type).or_default();
        for attribute in event.attributes {
            attributes
                .entry(attribute.key)
                .or_default()
                .push(attribute.value.unwrap_or_default());
        }
    }

    parsed
}

fn malformed(reason: impl Into<String>) -> RpcError {
    RpcError::MalformedResponse {
        reason: reason.into(),
    }
}
