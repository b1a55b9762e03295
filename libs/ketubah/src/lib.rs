//! Client side of the SmartKetubah ceremony: mirrors contract state block by
//! block, decides which action the connected wallet may take, and tracks the
//! writes it sends.

pub mod binding;
pub mod chain_state;
pub mod error;
pub mod ethers_binding;
pub mod selector;
pub mod session;
pub mod sync_loop;
pub mod transactor;
pub mod witness_log;


pub use binding::{FieldValue, KetubahField, WriteAction};
pub use chain_state::{ChainState, ContractState, Field};
pub use error::{ReadError, WriteError};
pub use selector::{select_action, Action};
pub use session::{SessionIdentity, SessionManager};
pub use sync_loop::{observe_new_blocks, watch_blocks, SyncLoop};
pub use transactor::{GasMetrics, PendingTransaction, PendingWrite, Transactor, TxStatus};
