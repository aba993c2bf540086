//! # Shared Types Crate
//!
//! Ledger primitives shared by the log bus and the contract extension
//! subsystem.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: Every crate agrees on one `Address`,
//!   `Hash` and `Log` shape.
//! - **Text forms are canonical**: addresses and hashes render as `0x` hex,
//!   encrypted payload handles as standard base64, and serde uses the same
//!   text so persisted snapshots stay human readable.

pub mod entities;
pub mod errors;

pub use entities::*;
pub use errors::*;
