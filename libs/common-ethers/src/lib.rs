pub mod artifact;
pub mod contracts;
pub mod tx_sender;
