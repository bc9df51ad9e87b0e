//! Core domain entities
//!
//! Pure data structures with validation logic - no I/O or external dependencies.

mod account;
pub mod result;

pub use account::{format_amount, parse_amount, parse_withdrawal, pins_match, Account};
