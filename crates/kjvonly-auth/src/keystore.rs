// crates/kjvonly-auth/src/keystore.rs
//
// KeyStore: the set of Ed25519 keys used to sign and verify session tokens.
//
// Key files live in a single directory, one key per file, named by key id:
//   - `<kid>.key`  hex-encoded 32-byte secret seed (can sign and verify)
//   - `<kid>.pub`  hex-encoded 32-byte public key (verify only)
//
// Verify-only keys let tokens signed by a retired key stay valid until they
// expire. The store is loaded once at startup and is read-only afterwards.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Extension of signing key files.
pub const SECRET_KEY_EXT: &str = "key";
/// Extension of verify-only key files.
pub const PUBLIC_KEY_EXT: &str = "pub";

/// Startup errors while loading key material. All of them are fatal.
#[derive(Debug, Error)]
pub enum KeyStoreError {
    #[error("cannot read key directory {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("invalid key file {path}: {reason}")]
    InvalidKey { path: String, reason: String },

    #[error("key id {0:?} is defined more than once")]
    DuplicateKid(String),

    #[error("no signing keys available")]
    NoKeys,

    #[error("active key {0:?} not found or has no secret")]
    ActiveKeyUnavailable(String),
}

/// Key material held under a key id.
#[derive(Clone)]
enum KeyMaterial {
    Signing(SigningKey),
    VerifyOnly(VerifyingKey),
}

/// A key addressable by its key id.
#[derive(Clone)]
pub struct TokenKey {
    kid: String,
    material: KeyMaterial,
}

impl TokenKey {
    /// A key that can sign new tokens.
    pub fn signing(kid: impl Into<String>, key: SigningKey) -> Self {
        Self {
            kid: kid.into(),
            material: KeyMaterial::Signing(key),
        }
    }

    /// A retired key that can only verify existing tokens.
    pub fn verify_only(kid: impl Into<String>, key: VerifyingKey) -> Self {
        Self {
            kid: kid.into(),
            material: KeyMaterial::VerifyOnly(key),
        }
    }

    /// The key id embedded in tokens signed by this key.
    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// Whether this key holds a secret and can sign.
    pub fn can_sign(&self) -> bool {
        matches!(self.material, KeyMaterial::Signing(_))
    }

    /// The public half of the key.
    pub fn verifying_key(&self) -> VerifyingKey {
        match &self.material {
            KeyMaterial::Signing(key) => key.verifying_key(),
            KeyMaterial::VerifyOnly(key) => *key,
        }
    }

    /// Verify `signature` over `message`.
    pub(crate) fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        self.verifying_key().verify(message, signature).is_ok()
    }
}

impl fmt::Debug for TokenKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenKey")
            .field("kid", &self.kid)
            .field("can_sign", &self.can_sign())
            .finish()
    }
}

/// Immutable set of token keys with one active signing key.
#[derive(Debug, Clone)]
pub struct KeyStore {
    keys: HashMap<String, TokenKey>,
    active_kid: String,
    active_signer: ActiveSigner,
}

/// Secret half of the active key, split out so signing needs no lookup.
#[derive(Clone)]
struct ActiveSigner(SigningKey);

impl fmt::Debug for ActiveSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ActiveSigner(..)")
    }
}

impl KeyStore {
    /// Build a store from keys already in memory.
    ///
    /// With `active_kid == None` the lexicographically greatest kid that
    /// can sign becomes active.
    pub fn from_keys(keys: Vec<TokenKey>, active_kid: Option<&str>) -> Result<Self, KeyStoreError> {
        let mut map = HashMap::with_capacity(keys.len());
        for key in keys {
            if map.contains_key(&key.kid) {
                return Err(KeyStoreError::DuplicateKid(key.kid));
            }
            map.insert(key.kid.clone(), key);
        }

        let active = match active_kid {
            Some(kid) => map
                .get(kid)
                .filter(|key| key.can_sign())
                .ok_or_else(|| KeyStoreError::ActiveKeyUnavailable(kid.to_string()))?,
            None => map
                .values()
                .filter(|key| key.can_sign())
                .max_by(|a, b| a.kid.cmp(&b.kid))
                .ok_or(KeyStoreError::NoKeys)?,
        };
        let KeyMaterial::Signing(signer) = &active.material else {
            return Err(KeyStoreError::ActiveKeyUnavailable(active.kid.clone()));
        };
        let active_signer = ActiveSigner(signer.clone());
        let active_kid = active.kid.clone();

        Ok(Self {
            keys: map,
            active_kid,
            active_signer,
        })
    }

    /// Load every key file in `dir`.
    pub fn load_dir(dir: impl AsRef<Path>, active_kid: Option<&str>) -> Result<Self, KeyStoreError> {
        let dir = dir.as_ref();
        let entries = fs::read_dir(dir).map_err(|e| KeyStoreError::Io {
            path: dir.display().to_string(),
            reason: e.to_string(),
        })?;

        let mut keys = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| KeyStoreError::Io {
                path: dir.display().to_string(),
                reason: e.to_string(),
            })?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if let Some(key) = read_key_file(&path)? {
                tracing::debug!(kid = key.kid(), can_sign = key.can_sign(), "Loaded token key");
                keys.push(key);
            }
        }

        let store = Self::from_keys(keys, active_kid)?;
        tracing::info!(
            "Loaded {} token key(s) from {}, active kid {}",
            store.len(),
            dir.display(),
            store.active_kid
        );
        Ok(store)
    }

    /// The key used to sign new tokens.
    pub fn active_key(&self) -> &TokenKey {
        // Presence is checked in `from_keys` and the map is never mutated.
        &self.keys[&self.active_kid]
    }

    /// Id of the key used to sign new tokens.
    pub fn active_kid(&self) -> &str {
        &self.active_kid
    }

    /// Sign `message` with the active key.
    pub(crate) fn sign_active(&self, message: &[u8]) -> Signature {
        self.active_signer.0.sign(message)
    }

    /// Resolve a key by id.
    pub fn lookup_key(&self, kid: &str) -> Option<&TokenKey> {
        self.keys.get(kid)
    }

    /// Number of keys held.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Always false for a successfully built store.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// All key ids, sorted.
    pub fn kids(&self) -> Vec<&str> {
        let mut kids: Vec<&str> = self.keys.keys().map(String::as_str).collect();
        kids.sort_unstable();
        kids
    }
}

/// Parse one key file. Files with unrelated extensions are skipped.
fn read_key_file(path: &Path) -> Result<Option<TokenKey>, KeyStoreError> {
    let ext = path.extension().and_then(|e| e.to_str());
    let kid = path.file_stem().and_then(|s| s.to_str());
    let (Some(ext), Some(kid)) = (ext, kid) else {
        return Ok(None);
    };
    if ext != SECRET_KEY_EXT && ext != PUBLIC_KEY_EXT {
        return Ok(None);
    }

    let invalid = |reason: String| KeyStoreError::InvalidKey {
        path: path.display().to_string(),
        reason,
    };

    if kid.is_empty() {
        return Err(invalid("empty key id".to_string()));
    }

    let contents = fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
    let bytes = hex::decode(contents.trim()).map_err(|_| invalid("not hex encoded".to_string()))?;
    let bytes: [u8; 32] = bytes
        .try_into()
        .map_err(|_| invalid("expected 32 bytes".to_string()))?;

    let key = if ext == SECRET_KEY_EXT {
        TokenKey::signing(kid, SigningKey::from_bytes(&bytes))
    } else {
        let verifying = VerifyingKey::from_bytes(&bytes).map_err(|e| invalid(e.to_string()))?;
        TokenKey::verify_only(kid, verifying)
    };
    Ok(Some(key))
}

/// Generate a fresh random signing key.
pub fn generate_signing_key() -> SigningKey {
    SigningKey::generate(&mut OsRng)
}

/// Derive a sortable key id: `YYYYMMDD-` followed by the first eight hex
/// characters of the SHA-256 of the public key.
pub fn derive_kid(created: DateTime<Utc>, key: &VerifyingKey) -> String {
    let digest = Sha256::digest(key.as_bytes());
    format!("{}-{}", created.format("%Y%m%d"), &hex::encode(digest)[..8])
}

/// Write `<kid>.key` into `dir`, creating the directory if needed.
///
/// Refuses to overwrite an existing key of the same id. On unix the file is
/// created owner-only (0600). Returns the path of the written file.
pub fn write_key_file(dir: impl AsRef<Path>, kid: &str, key: &SigningKey) -> std::io::Result<PathBuf> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    let secret_path = dir.join(format!("{kid}.{SECRET_KEY_EXT}"));
    let public_path = dir.join(format!("{kid}.{PUBLIC_KEY_EXT}"));
    if secret_path.exists() || public_path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            format!("key {kid} already exists in {}", dir.display()),
        ));
    }

    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(&secret_path)?;
    file.write_all(hex::encode(key.to_bytes()).as_bytes())?;
    file.sync_all()?;
    Ok(secret_path)
}

/// Retire a signing key: replace `<kid>.key` with `<kid>.pub` so tokens it
/// signed still verify but no new tokens are issued with it.
pub fn retire_key_file(dir: impl AsRef<Path>, kid: &str) -> Result<PathBuf, KeyStoreError> {
    let dir = dir.as_ref();
    let secret_path = dir.join(format!("{kid}.{SECRET_KEY_EXT}"));
    let key = read_key_file(&secret_path)?.ok_or_else(|| KeyStoreError::InvalidKey {
        path: secret_path.display().to_string(),
        reason: "not a key file".to_string(),
    })?;

    let io_err = |e: std::io::Error| KeyStoreError::Io {
        path: dir.display().to_string(),
        reason: e.to_string(),
    };
    let public_path = dir.join(format!("{kid}.{PUBLIC_KEY_EXT}"));
    fs::write(&public_path, hex::encode(key.verifying_key().to_bytes())).map_err(io_err)?;
    fs::remove_file(&secret_path).map_err(io_err)?;
    Ok(public_path)
}
