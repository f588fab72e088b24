//! Strong-name identity derivation
//!
//! A signing key container yields a public key blob, and the public key
//! yields the 8-byte token written into `PublicKeyToken` markers.
//!
//! ```
//! use buildgen::identity::{derive_identity_token, derive_public_key, ECMA_KEY};
//!
//! let public_key = derive_public_key(&ECMA_KEY).unwrap();
//! let token = derive_identity_token(public_key.as_bytes());
//! assert_eq!(hex::encode(token), "b77a5c561934e089");
//! ```

mod strong_name;
mod token;

pub use strong_name::{derive_public_key, PublicKey, ECMA_KEY};
pub use token::{derive_identity_token, TOKEN_LEN};

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("Key file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read key file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Key blob truncated: need {needed} bytes, have {actual}")]
    Truncated { needed: usize, actual: usize },

    #[error("Unsupported key blob type 0x{0:02x}")]
    UnsupportedBlob(u8),

    #[error("Key blob magic mismatch, expected {expected}")]
    BadMagic { expected: String },

    #[error("Public key length field says {declared} bytes, blob has {actual}")]
    LengthMismatch { declared: usize, actual: usize },

    #[error("Malformed key blob: {0}")]
    Malformed(String),
}

/// Public key and token derived from one key container, hex-encoded.
///
/// # Example
///
/// ```
/// use buildgen::identity::{KeyMaterial, ECMA_KEY};
///
/// let material = KeyMaterial::from_key_bytes(&ECMA_KEY)?;
/// assert_eq!(material.public_key, "00000000000000000400000000000000");
/// assert_eq!(material.token, "b77a5c561934e089");
/// # Ok::<(), buildgen::identity::KeyError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyMaterial {
    pub public_key: String,
    pub token: String,
}

impl KeyMaterial {
    pub fn from_key_bytes(key: &[u8]) -> Result<Self, KeyError> {
        let public_key = derive_public_key(key)?;
        let token = derive_identity_token(public_key.as_bytes());
        Ok(Self {
            public_key: public_key.to_hex(),
            token: hex::encode(token),
        })
    }

    /// Read a `.snk` key pair or an `sn -p` public key file.
    ///
    /// # Arguments
    ///
    /// * `path` - Key container on disk
    ///
    /// # Errors
    ///
    /// [`KeyError::NotFound`] when the file is missing, [`KeyError::Read`] when
    /// it cannot be read, and any blob parsing error from [`derive_public_key`].
    pub fn from_key_file(path: &Path) -> Result<Self, KeyError> {
        if !path.is_file() {
            return Err(KeyError::NotFound(path.to_path_buf()));
        }
        let bytes = fs::read(path).map_err(|source| KeyError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let material = Self::from_key_bytes(&bytes)?;
        debug!(key = %path.display(), token = %material.token, "Derived key material");
        Ok(material)
    }
}
