//! Base64 and hexadecimal codecs.
//!
//! Base64 decoding is lenient: it decodes the longest prefix made of
//! alphabet characters and stops at the first character outside it,
//! padding included. Callers that need strict validation use
//! [`decode_base64_strict`]. Hex decoding is strict.

use base64::{
    alphabet,
    engine::{
        general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD},
        DecodePaddingMode,
    },
    Engine,
};

use crate::error::CryptoError;

/// Unpadded decoder that tolerates non-zero trailing bits, so that a
/// truncated prefix still yields every complete byte.
const PREFIX_DECODER: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::RequireNone)
        .with_decode_allow_trailing_bits(true),
);

/// Encodes bytes as standard, `=`-padded Base64.
pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Decodes as much leading valid Base64 as `data` contains.
pub fn decode_base64(data: &str) -> Vec<u8> {
    let valid = data.bytes().take_while(|b| is_base64_symbol(*b)).count();
    let mut prefix = &data[..valid];

    // A lone trailing sextet carries fewer than 8 bits.
    if prefix.len() % 4 == 1 {
        prefix = &prefix[..prefix.len() - 1];
    }

    PREFIX_DECODER.decode(prefix).unwrap_or_default()
}

/// Decodes canonical, `=`-padded standard Base64, rejecting anything else.
///
/// # Errors
///
/// Returns `InvalidParameter` on a character outside the alphabet, missing
/// or misplaced padding, or non-zero trailing bits.
pub fn decode_base64_strict(data: &str) -> Result<Vec<u8>, CryptoError> {
    STANDARD
        .decode(data)
        .map_err(|e| CryptoError::InvalidParameter(format!("invalid Base64: {e}")))
}

/// Encodes bytes as lowercase hexadecimal.
pub fn encode_hex(data: &[u8]) -> String {
    hex::encode(data)
}

/// Decodes a hexadecimal string (either case).
///
/// # Errors
///
/// Returns `InvalidParameter` on odd length or a non-hex digit.
pub fn decode_hex(data: &str) -> Result<Vec<u8>, CryptoError> {
    hex::decode(data).map_err(|e| CryptoError::InvalidParameter(format!("invalid hex: {e}")))
}

fn is_base64_symbol(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'+' || byte == b'/'
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_base64_rfc4648_vectors() {
        let vectors: &[(&[u8], &str)] = &[
            (b"", ""),
            (b"f", "Zg=="),
            (b"fo", "Zm8="),
            (b"foo", "Zm9v"),
            (b"foob", "Zm9vYg=="),
            (b"fooba", "Zm9vYmE="),
            (b"foobar", "Zm9vYmFy"),
        ];

        for (raw, encoded) in vectors {
            assert_eq!(encode_base64(raw), *encoded);
            assert_eq!(decode_base64(encoded), *raw);
        }
    }

    #[test]
    fn test_base64_stops_at_invalid_character() {
        assert_eq!(decode_base64("Zm9v!YmFy"), b"foo");
        assert_eq!(decode_base64("Zm9v YmFy"), b"foo");
        assert_eq!(decode_base64("!Zm9v"), b"");
    }

    #[test]
    fn test_base64_partial_quantum() {
        // "Zm9vYg" is "foob" without padding, "Zm9vY" leaves a lone sextet.
        assert_eq!(decode_base64("Zm9vYg"), b"foob");
        assert_eq!(decode_base64("Zm9vY"), b"foo");
        assert_eq!(decode_base64("Z"), b"");
    }

    #[test]
    fn test_base64_non_ascii_input() {
        assert_eq!(decode_base64("Zm9vé"), b"foo");
    }

    #[test]
    fn test_strict_base64_rejects_what_lenient_accepts() {
        for bad in ["Zm9v!!xyz", "Zm9v YmFy", "Zm9vYg", "Zm9vY", "Zm9=v"] {
            assert!(
                matches!(decode_base64_strict(bad), Err(CryptoError::InvalidParameter(_))),
                "{bad:?}"
            );
        }
        assert_eq!(decode_base64_strict("Zm9vYg==").unwrap(), b"foob");
        assert_eq!(decode_base64_strict("").unwrap(), b"");
    }

    #[test]
    fn test_hex_encode_lowercase() {
        assert_eq!(encode_hex(&[0x00, 0xab, 0xff, 0x10]), "00abff10");
    }

    #[test]
    fn test_hex_decode_accepts_uppercase() {
        assert_eq!(decode_hex("00ABff10").unwrap(), vec![0x00, 0xab, 0xff, 0x10]);
    }

    #[test]
    fn test_hex_decode_rejects_malformed() {
        for bad in ["abc", "zz", "0g", "12 4"] {
            assert!(
                matches!(decode_hex(bad), Err(CryptoError::InvalidParameter(_))),
                "{bad:?}"
            );
        }
    }

    proptest! {
        #[test]
        fn prop_base64_roundtrip(data in proptest::collection::vec(any::<u8>(), 0..256)) {
            let encoded = encode_base64(&data);
            prop_assert_eq!(encoded.len() % 4, 0);
            prop_assert_eq!(decode_base64(&encoded), data.clone());
            prop_assert_eq!(encode_base64(&decode_base64(&encoded)), encoded);
        }

        #[test]
        fn prop_hex_roundtrip(data in proptest::collection::vec(any::<u8>(), 0..256)) {
            let encoded = encode_hex(&data);
            prop_assert_eq!(decode_hex(&encoded).unwrap(), data);
            prop_assert_eq!(encode_hex(&decode_hex(&encoded).unwrap()), encoded);
        }
    }
}
