//! HTTP route handlers.

pub mod admin;
pub mod health;
pub mod invites;
pub mod requests;
