use std::{collections::HashMap, sync::Arc, time::Duration};

use common::{debug_msg, log_msg, warn_msg};
use ethers::types::Address;
use futures::{Stream, StreamExt};
use parking_lot::Mutex;
use tokio::{
    sync::watch,
    time::{interval, MissedTickBehavior},
};

use crate::{
    binding::{read_snapshot, BlockSource, FieldValue, KetubahField, KetubahReader},
    chain_state::{ChainState, Field},
    session::SessionIdentity,
};

/// Call `on_block` once for every new block in `blocks`.
///
/// Only strictly increasing numbers are delivered: duplicates and stragglers
/// are dropped, gaps are passed through as they are. Returns the last block
/// delivered once the stream ends.
pub async fn observe_new_blocks<S, F>(blocks: S, mut on_block: F) -> Option<u64>
where
    S: Stream<Item = u64>,
    F: FnMut(u64),
{
    futures::pin_mut!(blocks);
    let mut last = None;
    while let Some(number) = blocks.next().await {
        if last.is_some_and(|last| number <= last) {
            continue;
        }
        last = Some(number);
        on_block(number);
    }
    last
}

/// Poll `source` every `period` for the current block number.
///
/// Failed polls are logged and skipped. The stream never ends.
pub fn watch_blocks<B>(source: Arc<B>, period: Duration) -> impl Stream<Item = u64>
where
    B: BlockSource + ?Sized,
{
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    futures::stream::unfold((source, ticker), |(source, mut ticker)| async move {
        loop {
            ticker.tick().await;
            match source.block_number().await {
                Ok(number) => return Some((number, (source, ticker))),
                Err(err) => warn_msg!(%err, "failed to poll block number"),
            }
        }
    })
}

/// Mirrors SmartKetubah into local state, one full snapshot per block.
///
/// Refreshes may overlap. A snapshot is applied only if it was read at a block
/// at least as high as the mirrored one, so a slow read of an older block can
/// never overwrite a newer snapshot. Two reads of the same block resolve
/// last-resolved-wins. A failed refresh leaves the mirror as it was.
pub struct SyncLoop<R> {
    reader: Arc<R>,
    viewer: watch::Receiver<Option<SessionIdentity>>,
    state: watch::Sender<Field<ChainState>>,
    fields: Mutex<HashMap<KetubahField, FieldValue>>,
}

impl<R: KetubahReader + 'static> SyncLoop<R> {
    /// `viewer` tells whose consent to include in each snapshot, usually
    /// [`SessionManager::subscribe`](crate::session::SessionManager::subscribe).
    pub fn new(reader: Arc<R>, viewer: watch::Receiver<Option<SessionIdentity>>) -> Self {
        let (state, _) = watch::channel(Field::Pending);
        Self {
            reader,
            viewer,
            state,
            fields: Mutex::new(HashMap::new()),
        }
    }

    pub fn state(&self) -> Field<ChainState> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Field<ChainState>> {
        self.state.subscribe()
    }

    pub fn viewer(&self) -> Option<Address> {
        self.viewer.borrow().map(|identity| identity.address)
    }

    /// Read a full snapshot at `block` and mirror it. Returns whether the mirror changed.
    pub async fn refresh(&self, block: u64) -> bool {
        let viewer = self.viewer();
        match read_snapshot(self.reader.as_ref(), block, viewer).await {
            Ok(snapshot) => self.apply(snapshot),
            Err(err) => {
                warn_msg!(block, %err, "failed to refresh contract state, keeping previous");
                false
            }
        }
    }

    fn apply(&self, snapshot: ChainState) -> bool {
        self.state.send_if_modified(|current| {
            if let Field::Ready(mirrored) = current {
                if mirrored.block > snapshot.block {
                    debug_msg!(
                        stale = snapshot.block,
                        mirrored = mirrored.block,
                        "discarding stale snapshot"
                    );
                    return false;
                }
                if *mirrored == snapshot {
                    return false;
                }
            }
            log_msg!(
                block = snapshot.block,
                state = %snapshot.contract_state,
                "⛓ contract state updated"
            );
            *current = Field::Ready(snapshot);
            true
        })
    }

    /// Read a single field at the latest block.
    ///
    /// Never fails: on error the previously read value is returned, or
    /// [`Field::Pending`] if the field was never read successfully.
    pub async fn read_field(&self, field: KetubahField) -> Field<FieldValue> {
        match self.reader.read(field, None).await {
            Ok(value) => {
                debug_msg!(?field, ?value, "field read");
                self.fields.lock().insert(field, value);
                Field::Ready(value)
            }
            Err(err) => {
                warn_msg!(?field, %err, "read failed, keeping previous value");
                self.cached_field(field)
            }
        }
    }

    /// Last value [`read_field`](Self::read_field) resolved, without calling the chain.
    pub fn cached_field(&self, field: KetubahField) -> Field<FieldValue> {
        self.fields.lock().get(&field).copied().into()
    }

    /// Refresh on every new block of `blocks` until the stream ends.
    ///
    /// Each refresh runs in its own task, so a slow read never holds back
    /// the next block.
    pub async fn run<S>(self: &Arc<Self>, blocks: S) -> Option<u64>
    where
        S: Stream<Item = u64>,
    {
        observe_new_blocks(blocks, |block| {
            let this = self.clone();
            tokio::spawn(async move {
                this.refresh(block).await;
            });
        })
        .await
    }
}
