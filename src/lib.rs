//! passgate - credential authentication service
//!
//! Registers accounts, authenticates them by password, issues signed bearer
//! tokens, and lets a token holder change the account password.

pub mod app;
pub mod core;
