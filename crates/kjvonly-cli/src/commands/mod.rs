// crates/kjvonly-cli/src/commands/mod.rs
//
// Command module declarations for the kjvonly CLI.

pub mod call;
pub mod keys;
pub mod login;
pub mod search;
