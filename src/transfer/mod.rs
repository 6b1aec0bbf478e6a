pub mod tagger;

pub use tagger::{PrTransfer, TransferSummary};
