// crates/kjvonly-auth/src/lib.rs
//
// kjvonly-auth: Signing keys, session tokens, and password hashing.
//
// The key store holds the Ed25519 keys loaded at startup, the token service
// signs and checks session tokens against it, and the password module
// hashes user secrets for the credential store.

pub mod keystore;
pub mod password;
pub mod token;

pub use keystore::{derive_kid, generate_signing_key, retire_key_file, write_key_file, KeyStore, KeyStoreError, TokenKey};
pub use password::{hash_password, verify_password, PasswordError};
pub use token::{IssueError, TokenError, TokenService, DEFAULT_LIFETIME_SECS};
