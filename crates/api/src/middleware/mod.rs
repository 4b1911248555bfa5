//! HTTP middleware components.

pub mod admin_key;
pub mod logging;
pub mod trace_id;

pub use admin_key::require_admin_key;
pub use trace_id::{trace_id, RequestId, REQUEST_ID_HEADER};
