//! Seams between the client and the chain.
//!
//! The sync loop and the transactor only talk to the contract through
//! [`KetubahReader`], [`KetubahWriter`] and [`BlockSource`]. The `ethers`
//! implementations live in [`crate::ethers_binding`], tests plug in-memory ones.

use std::collections::BTreeMap;

use async_trait::async_trait;
use ethers::types::{Address, TxHash, U256};
use futures::future::try_join_all;

use crate::{
    chain_state::{ChainState, ContractState},
    error::{ReadError, WriteError},
};

/// Every readable property of SmartKetubah
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KetubahField {
    Partner1,
    Partner2,
    ContractState,
    Consent(Address),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue {
    Address(Address),
    State(ContractState),
    Flag(bool),
}

impl FieldValue {
    pub fn into_address(self, field: KetubahField) -> Result<Address, ReadError> {
        match self {
            FieldValue::Address(address) => Ok(address),
            _ => Err(ReadError::UnexpectedValue(field)),
        }
    }

    pub fn into_state(self, field: KetubahField) -> Result<ContractState, ReadError> {
        match self {
            FieldValue::State(state) => Ok(state),
            _ => Err(ReadError::UnexpectedValue(field)),
        }
    }

    pub fn into_flag(self, field: KetubahField) -> Result<bool, ReadError> {
        match self {
            FieldValue::Flag(flag) => Ok(flag),
            _ => Err(ReadError::UnexpectedValue(field)),
        }
    }
}

/// State-changing calls a visitor can make
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteAction {
    RecordConsent,
    Witness { message: String },
}

impl WriteAction {
    pub fn method(&self) -> &'static str {
        match self {
            WriteAction::RecordConsent => "recordConsent",
            WriteAction::Witness { .. } => "witness",
        }
    }
}

/// What the node told us when accepting a transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Broadcast {
    pub hash: TxHash,
    pub gas_limit: Option<U256>,
    pub gas_price: Option<U256>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub success: bool,
    pub gas_used: Option<U256>,
    pub gas_price: Option<U256>,
    pub block: Option<u64>,
}

#[async_trait]
pub trait KetubahReader: Send + Sync {
    /// Read `field` at `block`, or at the latest block when `None`.
    async fn read(&self, field: KetubahField, block: Option<u64>) -> Result<FieldValue, ReadError>;
}

#[async_trait]
pub trait KetubahWriter: Send + Sync {
    /// Sign and send `action`. Fails without broadcasting when the call would revert.
    async fn broadcast(&self, action: &WriteAction) -> Result<Broadcast, WriteError>;

    /// Wait until `hash` is mined. `None` means it was dropped from the mempool.
    async fn confirm(&self, hash: TxHash) -> Result<Option<Receipt>, WriteError>;
}

#[async_trait]
pub trait BlockSource: Send + Sync {
    async fn block_number(&self) -> Result<u64, ReadError>;
}

/// Read a complete [`ChainState`] pinned at `block`.
///
/// Partners and state are fetched first, then the consent of both partners and of
/// `viewer`. Any failed read fails the whole snapshot.
pub async fn read_snapshot<R>(
    reader: &R,
    block: u64,
    viewer: Option<Address>,
) -> Result<ChainState, ReadError>
where
    R: KetubahReader + ?Sized,
{
    let at = Some(block);
    let (contract_state, partner1, partner2) = futures::try_join!(
        reader.read(KetubahField::ContractState, at),
        reader.read(KetubahField::Partner1, at),
        reader.read(KetubahField::Partner2, at),
    )?;
    let contract_state = contract_state.into_state(KetubahField::ContractState)?;
    let partner1 = partner1.into_address(KetubahField::Partner1)?;
    let partner2 = partner2.into_address(KetubahField::Partner2)?;

    let keys = ChainState::consent_keys(partner1, partner2, viewer);
    let flags = try_join_all(keys.iter().map(|address| async move {
        let field = KetubahField::Consent(*address);
        reader.read(field, at).await?.into_flag(field)
    }))
    .await?;

    Ok(ChainState {
        block,
        contract_state,
        partner1,
        partner2,
        consent: keys.into_iter().zip(flags).collect::<BTreeMap<_, _>>(),
    })
}
