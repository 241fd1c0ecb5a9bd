//! Command implementations.

pub mod diagnose;
pub mod explain;
pub mod export;
pub mod policy;
