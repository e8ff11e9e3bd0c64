pub mod config;
pub mod error;
mod block_list;
mod provider;
mod service;

pub use block_list::MemoryBlockList;
pub use config::SenderConfig;
pub use error::SendError;
pub use provider::{SimulatedProvider, SmsProvider};
pub use service::{validate_request, Dispatch, DispatchOutcome, SmsService};
