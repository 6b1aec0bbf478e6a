pub mod state_files;

pub use state_files::{LogKind, StateDir};
