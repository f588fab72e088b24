use sha1::{Digest, Sha1};

pub const TOKEN_LEN: usize = 8;

/// Public key token: the last eight bytes of the SHA-1 digest, reversed.
pub fn derive_identity_token(public_key: &[u8]) -> [u8; TOKEN_LEN] {
    let digest = Sha1::digest(public_key);
    let mut token = [0u8; TOKEN_LEN];
    for (i, byte) in token.iter_mut().enumerate() {
        *byte = digest[digest.len() - 1 - i];
    }
    token
}
