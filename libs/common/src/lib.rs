pub mod log;
pub mod networks;
