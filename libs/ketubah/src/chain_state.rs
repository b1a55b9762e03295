use std::{collections::BTreeMap, fmt};

use ethers::types::Address;

use crate::{binding::WriteAction, transactor::PendingTransaction};

/// Phase of the ceremony, as stored in the contract's `uint8 contractState`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContractState {
    Created,
    Proposed,
    Witnessing,
    Finalized,
    Unknown(u8),
}

impl ContractState {
    pub fn to_u8(self) -> u8 {
        match self {
            ContractState::Created => 0,
            ContractState::Proposed => 1,
            ContractState::Witnessing => 2,
            ContractState::Finalized => 3,
            ContractState::Unknown(raw) => raw,
        }
    }

    /// Witnesses may sign while the union is proposed or being witnessed.
    pub fn accepts_witnesses(self) -> bool {
        matches!(self, ContractState::Proposed | ContractState::Witnessing)
    }
}

impl From<u8> for ContractState {
    fn from(raw: u8) -> Self {
        match raw {
            0 => ContractState::Created,
            1 => ContractState::Proposed,
            2 => ContractState::Witnessing,
            3 => ContractState::Finalized,
            raw => ContractState::Unknown(raw),
        }
    }
}

impl fmt::Display for ContractState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContractState::Unknown(raw) => write!(f, "Unknown({})", raw),
            other => write!(f, "{:?}", other),
        }
    }
}

/// A value read from chain which may not have arrived yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field<T> {
    Pending,
    Ready(T),
}

impl<T> Field<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, Field::Pending)
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            Field::Pending => None,
            Field::Ready(value) => Some(value),
        }
    }

    pub fn into_ready(self) -> Option<T> {
        match self {
            Field::Pending => None,
            Field::Ready(value) => Some(value),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Field<U> {
        match self {
            Field::Pending => Field::Pending,
            Field::Ready(value) => Field::Ready(f(value)),
        }
    }
}

impl<T> Default for Field<T> {
    fn default() -> Self {
        Field::Pending
    }
}

impl<T> From<Option<T>> for Field<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Field::Pending, Field::Ready)
    }
}

/// Snapshot of everything the client shows about the contract, read at one block.
///
/// Snapshots are only ever produced by reading the chain. The one exception is
/// [`ChainState::with_optimistic`], which returns a derived copy and leaves the
/// original untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainState {
    pub block: u64,
    pub contract_state: ContractState,
    pub partner1: Address,
    pub partner2: Address,
    pub consent: BTreeMap<Address, bool>,
}

impl ChainState {
    pub fn is_partner(&self, address: Address) -> bool {
        address == self.partner1 || address == self.partner2
    }

    /// Consent recorded for `address`, `false` when it was not part of the read.
    pub fn consent_of(&self, address: Address) -> bool {
        self.consent.get(&address).copied().unwrap_or(false)
    }

    /// Addresses whose consent belongs in a snapshot taken for `viewer`
    pub fn consent_keys(
        partner1: Address,
        partner2: Address,
        viewer: Option<Address>,
    ) -> Vec<Address> {
        let mut keys = vec![partner1, partner2];
        keys.extend(viewer);
        keys.sort();
        keys.dedup();
        keys
    }

    /// View of this snapshot with in-flight writes of session `epoch` assumed to succeed.
    ///
    /// Only non-terminal transactions contribute, so the overlay vanishes as soon as
    /// a transaction confirms or fails, and the next fresh read takes over.
    pub fn with_optimistic<'a>(
        &self,
        pending: impl IntoIterator<Item = &'a PendingTransaction>,
        epoch: u64,
    ) -> ChainState {
        let mut view = self.clone();
        for tx in pending {
            if tx.status.is_terminal() || tx.epoch != epoch {
                continue;
            }
            if let WriteAction::RecordConsent = tx.action {
                if view.is_partner(tx.from) {
                    view.consent.insert(tx.from, true);
                }
            }
        }
        view
    }
}
