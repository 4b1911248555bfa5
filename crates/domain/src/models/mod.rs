//! Domain model definitions.

pub mod invite;
pub mod profile;
pub mod request;
pub mod role;
