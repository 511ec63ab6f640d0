//! Cloud-drive client: token lifecycle, typed wire contract, and the
//! chunked content-addressed upload protocol.

pub mod client;
pub mod token;
pub mod transaction;
pub mod types;
pub mod upload;

pub use client::DriveClient;
pub use token::TokenState;
pub use transaction::{UploadEndpoint, UploadOutcome};
pub use types::CheckNameMode;
