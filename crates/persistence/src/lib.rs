//! Persistence layer for the Club Portal backend.
//!
//! This crate contains:
//! - Database connection management
//! - Entity definitions (database row mappings)
//! - Repository implementations
//! - The in-process profile change notifier backing live session sync

pub mod db;
pub mod entities;
pub mod notify;
pub mod repositories;
