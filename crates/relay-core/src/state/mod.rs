//! Authorization record persistence and lifecycle.
//!
//! Records move `Pending -> Processing -> Executed`, or `Processing ->
//! Failed -> Processing` on retry. Every transition is a compare-and-swap
//! against the stored record, so two sponsors can never both claim one.

pub mod authorization;

pub use authorization::AuthorizationStateMachine;
