pub mod types;

pub use types::{TransferRecord, CONTRACT_CREATION};
