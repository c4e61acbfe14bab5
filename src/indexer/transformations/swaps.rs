use crate::models::datasets::swaps::SwapRow;
use crate::models::datasets::txs::{Coin, Msg, TxInfo};
use crate::models::errors::ExtractError;
use crate::utils::strip_swap_coin_amount;

pub trait SwapTransformer {
    fn transform_swaps(&self) -> Result<Vec<SwapRow>, ExtractError>;
}

impl SwapTransformer for TxInfo {
    fn transform_swaps(&self) -> Result<Vec<SwapRow>, ExtractError> {
        // Failed txs can still carry swap messages; skip them
        if self.is_failed() || self.logs.is_none() {
            return Ok(Vec::new());
        }

        let mut rows = Vec::new();
        for (idx, msg) in self.msgs.iter().enumerate() {
            let (sender, receiver, offer_coin, ask_denom) = match msg {
                Msg::Swap(swap) => (&swap.trader, &swap.trader, &swap.offer_coin, &swap.ask_denom),
                Msg::SwapSend(send) => (
                    &send.from_address,
                    &send.to_address,
                    &send.offer_coin,
                    &send.ask_denom,
                ),
                Msg::Other { .. } => continue,
            };

            rows.push(self.swap_row(idx, sender, receiver, offer_coin, ask_denom)?);
        }

        Ok(rows)
    }
}

impl TxInfo {
    fn swap_row(
        &self,
        idx: usize,
        sender: &str,
        receiver: &str,
        offer_coin: &Coin,
        ask_denom: &str,
    ) -> Result<SwapRow, ExtractError> {
        let ask_amount = strip_swap_coin_amount(self.swap_coin_at(idx)?);

        Ok(SwapRow {
            height: self.height,
            tx_hash: self.txhash.clone(),
            sender: sender.to_string(),
            receiver: receiver.to_string(),
            offer_amount: offer_coin.amount.clone(),
            offer_denom: offer_coin.denom.clone(),
            ask_amount,
            ask_denom: ask_denom.to_string(),
        })
    }
}
