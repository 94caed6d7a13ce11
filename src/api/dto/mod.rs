//! Data Transfer Objects for REST request/response serialization.
//!
//! Every response, success or failure, uses the same
//! `{success, message, data?, error?}` envelope.

pub mod common_dto;
pub mod snapshot_dto;
pub mod system_dto;

pub use common_dto::*;
pub use snapshot_dto::*;
pub use system_dto::*;
