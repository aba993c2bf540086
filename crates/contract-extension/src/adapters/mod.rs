//! # Adapters
//!
//! Concrete port implementations: registry file persistence, creation event
//! decoding, and in-memory doubles for tests.

pub mod abi_decoder;
pub mod file_store;
pub mod mock;

pub use abi_decoder::AbiEventDecoder;
pub use file_store::JsonFileStore;
