//! Domain layer for the Club Portal backend.
//!
//! This crate contains:
//! - Domain models (invites, membership requests, profiles, roles)
//! - The client-session state machine and its storage traits
//! - The role-based authorization guard

pub mod models;
pub mod session;
