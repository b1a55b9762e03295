use std::{collections::BTreeMap, fmt, sync::Arc};

use common::{log_msg, warn_msg};
use ethers::{
    types::{Address, TxHash, U256},
    utils::format_units,
};
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::{
    binding::{KetubahWriter, WriteAction},
    chain_state::ChainState,
    error::WriteError,
    session::SessionManager,
};

/// Lifecycle of a broadcast transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxStatus {
    Submitted { hash: TxHash },
    Confirmed { hash: TxHash, gas: GasMetrics },
    Failed { hash: TxHash, reason: String },
}

impl TxStatus {
    pub fn hash(&self) -> TxHash {
        match self {
            TxStatus::Submitted { hash }
            | TxStatus::Confirmed { hash, .. }
            | TxStatus::Failed { hash, .. } => *hash,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, TxStatus::Submitted { .. })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GasMetrics {
    pub gas_limit: Option<U256>,
    pub gas_used: Option<U256>,
    pub gas_price: Option<U256>,
    pub block: Option<u64>,
}

impl fmt::Display for GasMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn or_unknown(value: Option<U256>) -> String {
            value.map_or_else(|| "?".to_owned(), |v| v.to_string())
        }
        let gwei = self
            .gas_price
            .and_then(|price| format_units(price, "gwei").ok())
            .unwrap_or_else(|| "?".to_owned());
        write!(
            f,
            "{}/{} @ {} gwei",
            or_unknown(self.gas_used),
            or_unknown(self.gas_limit),
            gwei
        )
    }
}

/// Record of a write the client has broadcast
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTransaction {
    pub hash: TxHash,
    pub from: Address,
    pub action: WriteAction,
    pub status: TxStatus,
    pub gas: GasMetrics,
    pub epoch: u64,
}

impl PendingTransaction {
    /// Sent from a session that is no longer the active one
    pub fn is_informational(&self, current_epoch: u64) -> bool {
        self.epoch != current_epoch
    }
}

/// Handle returned once a write is in the mempool.
///
/// The `Submitted` update is always queued before the handle is handed out.
/// A terminal update follows once the network decides, unless the provider
/// goes away first, in which case the stream just ends.
pub struct PendingWrite {
    hash: TxHash,
    updates: mpsc::UnboundedReceiver<TxStatus>,
    last: TxStatus,
}

impl PendingWrite {
    pub fn hash(&self) -> TxHash {
        self.hash
    }

    pub async fn next_update(&mut self) -> Option<TxStatus> {
        let status = self.updates.recv().await?;
        self.last = status.clone();
        Some(status)
    }

    /// Drain the remaining updates and return the last one seen.
    pub async fn outcome(mut self) -> TxStatus {
        while self.next_update().await.is_some() {}
        self.last
    }
}

/// Sends ceremony writes through the active session and tracks them until they settle.
pub struct Transactor<W> {
    session: Arc<SessionManager<W>>,
    pending: Arc<Mutex<BTreeMap<TxHash, PendingTransaction>>>,
}

impl<W> Clone for Transactor<W> {
    fn clone(&self) -> Self {
        Self {
            session: self.session.clone(),
            pending: self.pending.clone(),
        }
    }
}

impl<W: KetubahWriter + 'static> Transactor<W> {
    pub fn new(session: Arc<SessionManager<W>>) -> Self {
        Self {
            session,
            pending: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }

    pub fn session(&self) -> &Arc<SessionManager<W>> {
        &self.session
    }

    /// Broadcast `action` signed by the connected wallet.
    ///
    /// Fails straight away when no wallet is connected, when it signs for the wrong
    /// chain, or when the call is rejected before reaching the mempool. Does not
    /// deduplicate: two calls send two transactions.
    pub async fn submit_write(&self, action: WriteAction) -> Result<PendingWrite, WriteError> {
        let active = self.session.signer().ok_or(WriteError::NoSigner)?;
        let expected = self.session.target_chain_id();
        if active.identity.chain_id != expected {
            return Err(WriteError::WrongNetwork {
                expected,
                actual: active.identity.chain_id,
            });
        }

        log_msg!(
            method = action.method(),
            from = ?active.identity.address,
            "submitting transaction"
        );
        let broadcast = active.signer.broadcast(&action).await.map_err(|err| {
            warn_msg!(method = action.method(), %err, "transaction not sent");
            err
        })?;

        let hash = broadcast.hash;
        let submitted = TxStatus::Submitted { hash };
        self.pending.lock().insert(
            hash,
            PendingTransaction {
                hash,
                from: active.identity.address,
                action,
                status: submitted.clone(),
                gas: GasMetrics {
                    gas_limit: broadcast.gas_limit,
                    gas_price: broadcast.gas_price,
                    ..Default::default()
                },
                epoch: active.epoch,
            },
        );
        log_msg!(?hash, "📡 transaction submitted");

        let (updates_tx, updates) = mpsc::unbounded_channel();
        let _ = updates_tx.send(submitted.clone());

        let pending = self.pending.clone();
        let signer = active.signer;
        tokio::spawn(async move {
            let receipt = match signer.confirm(hash).await {
                Ok(receipt) => receipt,
                Err(err) => {
                    warn_msg!(?hash, %err, "lost track of transaction");
                    return;
                }
            };

            let status = {
                let mut pending = pending.lock();
                let gas = match pending.get_mut(&hash) {
                    Some(record) => {
                        if let Some(receipt) = &receipt {
                            record.gas.gas_used = receipt.gas_used;
                            record.gas.gas_price = receipt.gas_price.or(record.gas.gas_price);
                            record.gas.block = receipt.block;
                        }
                        record.gas.clone()
                    }
                    None => GasMetrics::default(),
                };
                let status = match receipt {
                    Some(receipt) if receipt.success => TxStatus::Confirmed { hash, gas },
                    Some(_) => TxStatus::Failed {
                        hash,
                        reason: "execution reverted".to_owned(),
                    },
                    None => TxStatus::Failed {
                        hash,
                        reason: "dropped from mempool".to_owned(),
                    },
                };
                if let Some(record) = pending.get_mut(&hash) {
                    record.status = status.clone();
                }
                status
            };

            match &status {
                TxStatus::Confirmed { gas, .. } => {
                    log_msg!(?hash, "🍾 transaction finished! ⛽️ {}", gas)
                }
                TxStatus::Failed { reason, .. } => warn_msg!(?hash, %reason, "transaction failed"),
                TxStatus::Submitted { .. } => {}
            }
            let _ = updates_tx.send(status);
        });

        Ok(PendingWrite {
            hash,
            updates,
            last: submitted,
        })
    }

    /// Submit `action` and feed every lifecycle update into `on_update`.
    ///
    /// Resolves once the update stream ends, with the last status seen.
    pub async fn submit_write_with(
        &self,
        action: WriteAction,
        mut on_update: impl FnMut(&TxStatus),
    ) -> Result<TxStatus, WriteError> {
        let mut write = self.submit_write(action).await?;
        while let Some(status) = write.next_update().await {
            on_update(&status);
        }
        Ok(write.last)
    }

    /// All tracked transactions, ordered by hash
    pub fn pending(&self) -> Vec<PendingTransaction> {
        self.pending.lock().values().cloned().collect()
    }

    /// Forget a settled transaction.
    ///
    /// Returns `None` and keeps the record while it is still in flight.
    pub fn acknowledge(&self, hash: TxHash) -> Option<PendingTransaction> {
        let mut pending = self.pending.lock();
        match pending.get(&hash) {
            Some(record) if record.status.is_terminal() => pending.remove(&hash),
            _ => None,
        }
    }

    /// `state` as the connected wallet should see it while its writes are in flight
    pub fn optimistic_view(&self, state: &ChainState) -> ChainState {
        let pending = self.pending.lock();
        state.with_optimistic(pending.values(), self.session.epoch())
    }
}
