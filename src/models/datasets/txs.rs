use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::HashMap;

use crate::models::errors::ExtractError;

////////////////////////////////////// RPC Data ////////////////////////////////////////
////////////////////////////////////// GET /txs ////////////////////////////////////////
// The legacy LCD encodes most integers as strings, but not consistently
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RpcNumber {
    Number(u64),
    Text(String),
}

impl RpcNumber {
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            RpcNumber::Number(n) => Some(*n),
            RpcNumber::Text(s) => s.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcSearchResponse {
    pub page_total: Option<RpcNumber>,
    pub txs: Option<Vec<RpcTxInfo>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcTxInfo {
    pub height: RpcNumber,
    pub txhash: String,
    // Outer None: key absent. Some(None): the node sent `"code": null`
    #[serde(default, deserialize_with = "deserialize_present")]
    pub code: Option<Option<u32>>,
    pub logs: Option<Vec<RpcTxLog>>,
    pub tx: RpcStdTx,
}

fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<Option<u32>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<u32>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcStdTx {
    pub value: RpcStdTxValue,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcStdTxValue {
    #[serde(default)]
    pub msg: Vec<RpcMsg>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcMsg {
    #[serde(rename = "type")]
    pub type_tag: String,
    #[serde(default)]
    pub value: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcTxLog {
    #[serde(default)]
    pub events: Vec<RpcEvent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub attributes: Vec<RpcEventAttribute>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcEventAttribute {
    pub key: String,
    pub value: Option<String>,
}

////////////////////////////////////// GET /node_info //////////////////////////////////
#[derive(Debug, Clone, Deserialize)]
pub struct RpcNodeInfoResponse {
    pub node_info: RpcNodeInfo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcNodeInfo {
    pub network: String,
}

///////////////////////////////////// Parsed Data //////////////////////////////////////
pub const MSG_SWAP_TYPE: &str = "market/MsgSwap";
pub const MSG_SWAP_SEND_TYPE: &str = "market/MsgSwapSend";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Coin {
    pub denom: String,
    pub amount: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MsgSwap {
    pub trader: String,
    pub offer_coin: Coin,
    pub ask_denom: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MsgSwapSend {
    pub from_address: String,
    pub to_address: String,
    pub offer_coin: Coin,
    pub ask_denom: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    Swap(MsgSwap),
    SwapSend(MsgSwapSend),
    Other { type_tag: String },
}

/// event type -> attribute key -> values, in emission order
pub type EventsByType = HashMap<String, HashMap<String, Vec<String>>>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TxLog {
    pub events_by_type: EventsByType,
}

impl TxLog {
    pub fn first_attribute(&self, event_type: &str, key: &str) -> Option<&str> {
        self.events_by_type
            .get(event_type)
            .and_then(|attributes| attributes.get(key))
            .and_then(|values| values.first())
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxInfo {
    pub height: u64,
    pub txhash: String,
    // None on success. A null code from the node is kept as Some(0)
    pub code: Option<u32>,
    pub msgs: Vec<Msg>,
    pub logs: Option<Vec<TxLog>>,
}

impl TxInfo {
    pub fn is_failed(&self) -> bool {
        self.code.is_some()
    }

    /// Raw `swap.swap_coin` value emitted for the message at `msg_index`.
    ///
    /// Messages and logs are correlated purely by position, so this is the
    /// only place that indexes into `logs`.
    pub fn swap_coin_at(&self, msg_index: usize) -> Result<&str, ExtractError> {
        let log = self
            .logs
            .as_ref()
            .and_then(|logs| logs.get(msg_index))
            .ok_or_else(|| ExtractError::MissingEventLog {
                tx_hash: self.txhash.clone(),
                msg_index,
            })?;

        log.first_attribute("swap", "swap_coin")
            .ok_or_else(|| ExtractError::MissingSwapCoin {
                tx_hash: self.txhash.clone(),
                msg_index,
            })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPage {
    pub txs: Vec<TxInfo>,
    pub page_total: u64,
}
