//! Shared utilities for the Club Portal backend.

pub mod crypto;
pub mod validation;
