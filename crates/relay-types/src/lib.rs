//! Common types module for the gasless relay system.
//!
//! This module defines the core data types shared by every relay crate:
//! transfer intents, signing payloads, authorization records and their
//! lifecycle status, transaction types for the chain layer, and the
//! configuration-schema framework used to validate backend settings.

/// API types for HTTP endpoints and request/response structures.
pub mod api;
/// Transfer authorization types: intents, payloads, signatures and records.
pub mod authorization;
/// Transaction delivery types for blockchain interactions.
pub mod delivery;
/// Event types published while authorizations move through their lifecycle.
pub mod events;
/// Network and token configuration types.
pub mod networks;
/// Registry trait for self-registering implementations.
pub mod registry;
/// Secure string type for private keys.
pub mod secret_string;
/// Storage namespaces.
pub mod storage;
/// Utility functions for common type conversions.
pub mod utils;
/// Configuration validation types for ensuring type-safe configurations.
pub mod validation;

pub use alloy_primitives::{Address, B256, U256};
pub use api::*;
pub use authorization::*;
pub use delivery::*;
pub use events::*;
pub use networks::{NetworkConfig, NetworksConfig};
pub use registry::ImplementationRegistry;
pub use secret_string::SecretString;
pub use storage::*;
pub use utils::{
	current_timestamp, format_token_amount, truncate_id, with_0x_prefix, without_0x_prefix,
};
pub use validation::*;
