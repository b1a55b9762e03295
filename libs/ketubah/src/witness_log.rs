use common_ethers::contracts::{SmartKetubah, WitnessedFilter};
use ethers::{
    contract::LogMeta,
    providers::Middleware,
    types::{Address, TxHash},
};

use crate::error::ReadError;

/// One `Witnessed` event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WitnessEntry {
    pub witness: Address,
    pub message: String,
    pub block: u64,
    pub tx: TxHash,
}

/// All witness messages emitted since `from_block`, in chain order.
pub async fn witness_log<M: Middleware + 'static>(
    contract: &SmartKetubah<M>,
    from_block: u64,
) -> Result<Vec<WitnessEntry>, ReadError> {
    let events = contract
        .witnessed_filter()
        .from_block(from_block)
        .query_with_meta()
        .await
        .map_err(|err| ReadError::Call(err.to_string()))?;
    Ok(into_entries(events))
}

fn into_entries(mut events: Vec<(WitnessedFilter, LogMeta)>) -> Vec<WitnessEntry> {
    events.sort_by_key(|(_, meta)| (meta.block_number, meta.log_index));
    events
        .into_iter()
        .map(|(event, meta)| WitnessEntry {
            witness: event.witness,
            message: event.message,
            block: meta.block_number.as_u64(),
            tx: meta.transaction_hash,
        })
        .collect()
}
