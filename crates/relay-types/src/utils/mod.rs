//! Utility functions shared across the relay crates.
//!
//! Hex prefix handling, display formatting, timestamps, and the minimal
//! EIP-712 encoding helpers used to hash authorization payloads.

pub mod eip712;
pub mod formatting;
pub mod helpers;

pub use eip712::{
	compute_domain_hash, compute_final_digest, Eip712AbiEncoder, DOMAIN_TYPE,
	TRANSFER_WITH_AUTHORIZATION_TYPE,
};
pub use formatting::{format_token_amount, truncate_id, with_0x_prefix, without_0x_prefix};
pub use helpers::current_timestamp;
