//! Strong-name key blob parsing
//!
//! Reads the CryptoAPI key containers produced by `sn -k` / `sn -p` and
//! produces the public key blob embedded into signed assemblies.

use super::KeyError;

const PRIVATE_KEY_BLOB: u8 = 0x07;
const PUBLIC_KEY_BLOB: u8 = 0x06;
const BLOB_VERSION: u8 = 0x02;

const CALG_RSA_SIGN: u32 = 0x0000_2400;
const CALG_SHA1: u32 = 0x0000_8004;

const RSA1_MAGIC: &[u8; 4] = b"RSA1";
const RSA2_MAGIC: &[u8; 4] = b"RSA2";

/// SigAlgId + HashAlgId + cbPublicKey
const STRONG_NAME_HEADER_LEN: usize = 12;
/// BLOBHEADER (8) + RSAPUBKEY (12)
const BLOB_PREFIX_LEN: usize = 20;

/// The 16-byte neutral key used by framework assemblies.
pub const ECMA_KEY: [u8; 16] = [0, 0, 0, 0, 0, 0, 0, 0, 4, 0, 0, 0, 0, 0, 0, 0];

/// Public key bytes as stored in assembly metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey(Vec<u8>);

impl PublicKey {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl AsRef<[u8]> for PublicKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Fields of an RSA key blob that make up the public part.
struct RsaPublicPart<'a> {
    bit_len: u32,
    exponent: u32,
    modulus: &'a [u8],
}

/// Derive the strong-name public key from a key container.
pub fn derive_public_key(key: &[u8]) -> Result<PublicKey, KeyError> {
    if key == ECMA_KEY {
        return Ok(PublicKey(key.to_vec()));
    }

    match key.first() {
        Some(&PRIVATE_KEY_BLOB) => {
            let part = parse_rsa_blob(key, PRIVATE_KEY_BLOB, RSA2_MAGIC)?;
            check_private_len(key, part.bit_len)?;
            Ok(PublicKey(encode_public_key(&part)))
        }
        Some(&PUBLIC_KEY_BLOB) => {
            let part = parse_rsa_blob(key, PUBLIC_KEY_BLOB, RSA1_MAGIC)?;
            Ok(PublicKey(encode_public_key(&part)))
        }
        Some(_) if is_wrapped_public_key(key) => {
            check_wrapped_public_key(key)?;
            Ok(PublicKey(key.to_vec()))
        }
        Some(&other) => Err(KeyError::UnsupportedBlob(other)),
        None => Err(KeyError::Truncated {
            needed: BLOB_PREFIX_LEN,
            actual: 0,
        }),
    }
}

fn is_wrapped_public_key(key: &[u8]) -> bool {
    key.len() > STRONG_NAME_HEADER_LEN + BLOB_PREFIX_LEN
        && key[STRONG_NAME_HEADER_LEN] == PUBLIC_KEY_BLOB
}

/// The header may name any hash algorithm; the signature algorithm must be RSA.
fn check_wrapped_public_key(key: &[u8]) -> Result<(), KeyError> {
    let blob = &key[STRONG_NAME_HEADER_LEN..];
    let part = parse_rsa_blob(blob, PUBLIC_KEY_BLOB, RSA1_MAGIC)?;

    let sig_alg = read_u32(key, 0)?;
    if sig_alg != CALG_RSA_SIGN {
        return Err(KeyError::Malformed(format!(
            "unsupported signature algorithm 0x{:08x}",
            sig_alg
        )));
    }
    let declared = read_u32(key, 8)? as usize;
    if declared != blob.len() {
        return Err(KeyError::LengthMismatch {
            declared,
            actual: blob.len(),
        });
    }
    let trailing = blob.len() - BLOB_PREFIX_LEN - part.modulus.len();
    if trailing > 0 {
        return Err(KeyError::Malformed(format!(
            "{} unexpected byte(s) after the modulus",
            trailing
        )));
    }
    Ok(())
}

fn parse_rsa_blob<'a>(
    blob: &'a [u8],
    blob_type: u8,
    magic: &[u8; 4],
) -> Result<RsaPublicPart<'a>, KeyError> {
    if blob.len() < BLOB_PREFIX_LEN {
        return Err(KeyError::Truncated {
            needed: BLOB_PREFIX_LEN,
            actual: blob.len(),
        });
    }
    if blob[0] != blob_type {
        return Err(KeyError::UnsupportedBlob(blob[0]));
    }
    if blob[1] != BLOB_VERSION {
        return Err(KeyError::Malformed(format!(
            "unsupported blob version {}",
            blob[1]
        )));
    }
    if &blob[8..12] != magic {
        return Err(KeyError::BadMagic {
            expected: String::from_utf8_lossy(magic).into_owned(),
        });
    }

    let bit_len = read_u32(blob, 12)?;
    if bit_len == 0 || bit_len % 16 != 0 {
        return Err(KeyError::Malformed(format!("invalid key length {} bits", bit_len)));
    }
    let exponent = read_u32(blob, 16)?;

    let modulus_len = (bit_len / 8) as usize;
    let needed = BLOB_PREFIX_LEN + modulus_len;
    if blob.len() < needed {
        return Err(KeyError::Truncated {
            needed,
            actual: blob.len(),
        });
    }

    Ok(RsaPublicPart {
        bit_len,
        exponent,
        modulus: &blob[BLOB_PREFIX_LEN..needed],
    })
}

/// prime1, prime2, exponent1, exponent2, coefficient (bitlen/16 each), privateExponent (bitlen/8)
fn check_private_len(blob: &[u8], bit_len: u32) -> Result<(), KeyError> {
    let byte_len = (bit_len / 8) as usize;
    let half_len = (bit_len / 16) as usize;
    let needed = BLOB_PREFIX_LEN + byte_len + 5 * half_len + byte_len;
    if blob.len() < needed {
        return Err(KeyError::Truncated {
            needed,
            actual: blob.len(),
        });
    }
    Ok(())
}

fn encode_public_key(part: &RsaPublicPart<'_>) -> Vec<u8> {
    let mut out = Vec::with_capacity(STRONG_NAME_HEADER_LEN + BLOB_PREFIX_LEN + part.modulus.len());
    out.extend_from_slice(&CALG_RSA_SIGN.to_le_bytes());
    out.extend_from_slice(&CALG_SHA1.to_le_bytes());
    out.extend_from_slice(&((BLOB_PREFIX_LEN + part.modulus.len()) as u32).to_le_bytes());

    out.push(PUBLIC_KEY_BLOB);
    out.push(BLOB_VERSION);
    out.extend_from_slice(&[0, 0]);
    out.extend_from_slice(&CALG_RSA_SIGN.to_le_bytes());
    out.extend_from_slice(RSA1_MAGIC);
    out.extend_from_slice(&part.bit_len.to_le_bytes());
    out.extend_from_slice(&part.exponent.to_le_bytes());
    out.extend_from_slice(part.modulus);
    out
}

fn read_u32(bytes: &[u8], offset: usize) -> Result<u32, KeyError> {
    let slice = bytes
        .get(offset..offset + 4)
        .ok_or(KeyError::Truncated {
            needed: offset + 4,
            actual: bytes.len(),
        })?;
    Ok(u32::from_le_bytes([slice[0], slice[1], slice[2], slice[3]]))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const TEST_PUBLIC_KEY_HEX: &str = "0024000004800000540000000602000000240000525341310002000001000100030a11181f262d343b424950575e656c737a81888f969da4abb2b9c0c7ced5dce3eaf1f8ff060d141b222930373e454c535a61686f767d848b9299a0a7aeb5bc";

    fn test_modulus() -> Vec<u8> {
        (0..64u32).map(|i| ((i * 7 + 3) & 0xff) as u8).collect()
    }

    /// 512-bit key pair blob with a deterministic modulus.
    pub(crate) fn test_key_pair() -> Vec<u8> {
        let mut blob = vec![PRIVATE_KEY_BLOB, BLOB_VERSION, 0, 0];
        blob.extend_from_slice(&CALG_RSA_SIGN.to_le_bytes());
        blob.extend_from_slice(RSA2_MAGIC);
        blob.extend_from_slice(&512u32.to_le_bytes());
        blob.extend_from_slice(&65537u32.to_le_bytes());
        blob.extend_from_slice(&test_modulus());
        blob.extend(std::iter::repeat(0xab).take(5 * 32 + 64));
        blob
    }

    #[test]
    fn test_private_key_blob() {
        let key = derive_public_key(&test_key_pair()).unwrap();
        assert_eq!(key.to_hex(), TEST_PUBLIC_KEY_HEX);
    }

    #[test]
    fn test_key_exchange_algorithm_is_normalized() {
        let mut blob = test_key_pair();
        blob[4..8].copy_from_slice(&0x0000_a400u32.to_le_bytes());
        let key = derive_public_key(&blob).unwrap();
        assert_eq!(key.to_hex(), TEST_PUBLIC_KEY_HEX);
    }

    #[test]
    fn test_bare_public_key_blob() {
        let wrapped = hex::decode(TEST_PUBLIC_KEY_HEX).unwrap();
        let bare = &wrapped[STRONG_NAME_HEADER_LEN..];
        let key = derive_public_key(bare).unwrap();
        assert_eq!(key.as_bytes(), wrapped.as_slice());
    }

    #[test]
    fn test_wrapped_public_key_is_returned_unchanged() {
        let wrapped = hex::decode(TEST_PUBLIC_KEY_HEX).unwrap();
        let key = derive_public_key(&wrapped).unwrap();
        assert_eq!(key.as_bytes(), wrapped.as_slice());
    }

    #[test]
    fn test_ecma_key() {
        let key = derive_public_key(&ECMA_KEY).unwrap();
        assert_eq!(key.to_hex(), "00000000000000000400000000000000");
    }

    #[test]
    fn test_truncated_private_key() {
        let blob = test_key_pair();
        let result = derive_public_key(&blob[..100]);
        assert!(matches!(result, Err(KeyError::Truncated { .. })));
    }

    #[test]
    fn test_bad_magic() {
        let mut blob = test_key_pair();
        blob[8..12].copy_from_slice(b"RSA1");
        let result = derive_public_key(&blob);
        assert!(matches!(result, Err(KeyError::BadMagic { .. })));
    }

    #[test]
    fn test_unknown_blob_type() {
        let result = derive_public_key(&[0x42; 40]);
        assert!(matches!(result, Err(KeyError::UnsupportedBlob(0x42))));
    }

    #[test]
    fn test_empty_input() {
        assert!(derive_public_key(&[]).is_err());
    }

    #[test]
    fn test_zero_bit_length() {
        let mut blob = test_key_pair();
        blob[12..16].copy_from_slice(&0u32.to_le_bytes());
        let result = derive_public_key(&blob);
        assert!(matches!(result, Err(KeyError::Malformed(_))));
    }

    #[test]
    fn test_wrapped_key_with_wrong_length() {
        let mut wrapped = hex::decode(TEST_PUBLIC_KEY_HEX).unwrap();
        wrapped.push(0);
        assert!(matches!(
            derive_public_key(&wrapped),
            Err(KeyError::LengthMismatch {
                declared: 84,
                actual: 85
            })
        ));
    }

    #[test]
    fn test_wrapped_key_with_trailing_bytes() {
        let mut wrapped = hex::decode(TEST_PUBLIC_KEY_HEX).unwrap();
        wrapped.extend_from_slice(&[0, 0, 0, 0]);
        wrapped[8..12].copy_from_slice(&88u32.to_le_bytes());
        match derive_public_key(&wrapped) {
            Err(KeyError::Malformed(message)) => {
                assert_eq!(message, "4 unexpected byte(s) after the modulus")
            }
            other => panic!("Expected trailing data error, got {:?}", other),
        }
    }

    #[test]
    fn test_wrapped_key_with_sha256_hash_algorithm() {
        let mut wrapped = hex::decode(TEST_PUBLIC_KEY_HEX).unwrap();
        wrapped[4..8].copy_from_slice(&0x0000_800cu32.to_le_bytes());
        let key = derive_public_key(&wrapped).unwrap();
        assert_eq!(key.as_bytes(), wrapped.as_slice());
        assert_ne!(key.to_hex(), TEST_PUBLIC_KEY_HEX);
    }

    #[test]
    fn test_wrapped_key_with_foreign_signature_algorithm() {
        let mut wrapped = hex::decode(TEST_PUBLIC_KEY_HEX).unwrap();
        wrapped[0..4].copy_from_slice(&0x0000_a400u32.to_le_bytes());
        match derive_public_key(&wrapped) {
            Err(KeyError::Malformed(message)) => assert!(message.contains("0x0000a400")),
            other => panic!("Expected signature algorithm error, got {:?}", other),
        }
    }

    #[test]
    fn test_bit_length_must_split_into_half_length_fields() {
        let mut blob = test_key_pair();
        blob[12..16].copy_from_slice(&520u32.to_le_bytes());
        blob.extend(std::iter::repeat(0xab).take(64));
        match derive_public_key(&blob) {
            Err(KeyError::Malformed(message)) => assert_eq!(message, "invalid key length 520 bits"),
            other => panic!("Expected invalid length error, got {:?}", other),
        }
    }
}
