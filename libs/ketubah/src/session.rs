use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use common::log_msg;
use ethers::types::Address;
use parking_lot::{Mutex, RwLock, RwLockWriteGuard};
use tokio::sync::watch;

/// Who is connected, and to which chain their wallet signs for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionIdentity {
    pub address: Address,
    pub chain_id: u64,
}

/// Signer of the current session, together with the epoch it was connected in
pub struct ActiveSigner<W> {
    pub identity: SessionIdentity,
    pub signer: Arc<W>,
    pub epoch: u64,
}

impl<W> Clone for ActiveSigner<W> {
    fn clone(&self) -> Self {
        Self {
            identity: self.identity,
            signer: self.signer.clone(),
            epoch: self.epoch,
        }
    }
}

type Listener = Box<dyn Fn(Option<&SessionIdentity>) + Send + Sync>;

/// Owns the wallet connection.
///
/// There is at most one active session. Every `connect` starts a new epoch, so
/// anything tagged with an older epoch is known to belong to a session that has
/// since been replaced or closed.
pub struct SessionManager<W> {
    target_chain_id: u64,
    active: RwLock<Option<ActiveSigner<W>>>,
    epoch: AtomicU64,
    identity_tx: watch::Sender<Option<SessionIdentity>>,
    listeners: Mutex<Vec<Listener>>,
}

impl<W> SessionManager<W> {
    pub fn new(target_chain_id: u64) -> Self {
        let (identity_tx, _) = watch::channel(None);
        Self {
            target_chain_id,
            active: RwLock::new(None),
            epoch: AtomicU64::new(0),
            identity_tx,
            listeners: Mutex::new(Vec::new()),
        }
    }

    pub fn target_chain_id(&self) -> u64 {
        self.target_chain_id
    }

    /// Replace whatever session is active. Returns the new epoch.
    pub fn connect(&self, identity: SessionIdentity, signer: Arc<W>) -> u64 {
        let mut active = self.active.write();
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        *active = Some(ActiveSigner {
            identity,
            signer,
            epoch,
        });
        log_msg!(
            address = ?identity.address,
            chain_id = identity.chain_id,
            epoch,
            "wallet connected"
        );
        self.notify(active, Some(identity));
        epoch
    }

    pub fn disconnect(&self) {
        let mut active = self.active.write();
        if active.take().is_some() {
            // bump so that transactions of the closed session read as informational
            self.epoch.fetch_add(1, Ordering::SeqCst);
            log_msg!("wallet disconnected");
            self.notify(active, None);
        }
    }

    /// Call `listener` on every connect and disconnect.
    ///
    /// Listeners run on the caller's thread while the listener list is locked,
    /// so they must not register further listeners. They may read the session.
    pub fn on_change(&self, listener: impl Fn(Option<&SessionIdentity>) + Send + Sync + 'static) {
        self.listeners.lock().push(Box::new(listener));
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<SessionIdentity>> {
        self.identity_tx.subscribe()
    }

    pub fn identity(&self) -> Option<SessionIdentity> {
        self.active.read().as_ref().map(|active| active.identity)
    }

    pub fn address(&self) -> Option<Address> {
        self.identity().map(|identity| identity.address)
    }

    pub fn signer(&self) -> Option<ActiveSigner<W>> {
        self.active.read().clone()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// `true` when a wallet is connected to a chain other than the target one.
    pub fn network_mismatch(&self) -> bool {
        self.identity()
            .is_some_and(|identity| identity.chain_id != self.target_chain_id)
    }

    /// Publish `identity` while the session is locked. Listeners run once it is
    /// released, in the order the changes happened.
    fn notify(
        &self,
        active: RwLockWriteGuard<'_, Option<ActiveSigner<W>>>,
        identity: Option<SessionIdentity>,
    ) {
        self.identity_tx.send_replace(identity);
        let listeners = self.listeners.lock();
        drop(active);
        for listener in listeners.iter() {
            listener(identity.as_ref());
        }
    }
}
