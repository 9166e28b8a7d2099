//! Pre-tile payload decryption
//!
//! The upstream protocol encrypts the pre-tile payload with AES in ECB mode
//! (no IV) and PKCS#7 padding. That is reproduced here only to interoperate;
//! it is not a secure construction and must not be reused as one.

use aes::{Aes128, Aes192, Aes256};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use ecb::cipher::{block_padding::Pkcs7, BlockDecryptMut, KeyInit};

use super::error::{CodecError, CodecResult};

const BLOCK_SIZE: usize = 16;

/// Decrypt a base64 ciphertext with the given AES key.
///
/// Returns the UTF-8 plaintext, or a miss on any decode, key or padding
/// failure. No partial plaintext is ever returned.
pub fn decrypt_payload(ciphertext_base64: &str, key: &[u8]) -> CodecResult<String> {
    let result = decode_and_decrypt(ciphertext_base64, key);
    if let Err(e) = &result {
        tracing::error!(
            ciphertext = %ciphertext_base64,
            key = %String::from_utf8_lossy(key),
            error = %e,
            "Failed to decrypt payload"
        );
    }
    result
}

fn decode_and_decrypt(ciphertext_base64: &str, key: &[u8]) -> CodecResult<String> {
    let ciphertext = BASE64.decode(ciphertext_base64.trim())?;
    if ciphertext.is_empty() || ciphertext.len() % BLOCK_SIZE != 0 {
        return Err(CodecError::CiphertextLength(ciphertext.len()));
    }

    let plaintext = match key.len() {
        16 => decrypt_ecb::<ecb::Decryptor<Aes128>>(key, &ciphertext)?,
        24 => decrypt_ecb::<ecb::Decryptor<Aes192>>(key, &ciphertext)?,
        32 => decrypt_ecb::<ecb::Decryptor<Aes256>>(key, &ciphertext)?,
        n => return Err(CodecError::KeyLength(n)),
    };

    Ok(String::from_utf8(plaintext)?)
}

fn decrypt_ecb<D>(key: &[u8], ciphertext: &[u8]) -> CodecResult<Vec<u8>>
where
    D: KeyInit + BlockDecryptMut,
{
    let decryptor = D::new_from_slice(key).map_err(|_| CodecError::KeyLength(key.len()))?;
    decryptor
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| CodecError::Padding)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ecb::cipher::{block_padding::NoPadding, BlockEncryptMut};

    const KEY: &[u8; 16] = b"0123456789abcdef";

    fn encrypt(plaintext: &[u8]) -> String {
        let ct = ecb::Encryptor::<Aes128>::new_from_slice(KEY)
            .unwrap()
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext);
        BASE64.encode(ct)
    }

    #[test]
    fn test_decrypts_pkcs7_ecb_payload() {
        let ciphertext = encrypt(br#"{"zn":"ha1TgXQ9J1c"}"#);
        let plaintext = decrypt_payload(&ciphertext, KEY).unwrap();
        assert_eq!(plaintext, r#"{"zn":"ha1TgXQ9J1c"}"#);
    }

    #[test]
    fn test_block_aligned_plaintext_gets_full_padding_block() {
        let ciphertext = encrypt(b"exactly16bytes!!");
        assert_eq!(BASE64.decode(&ciphertext).unwrap().len(), 32);
        assert_eq!(decrypt_payload(&ciphertext, KEY).unwrap(), "exactly16bytes!!");
    }

    #[test]
    fn test_invalid_padding_is_a_miss() {
        // Last byte 0x00 is never valid PKCS#7 padding
        let mut block = [0x41u8; 16];
        block[15] = 0;
        let ct = ecb::Encryptor::<Aes128>::new_from_slice(KEY)
            .unwrap()
            .encrypt_padded_vec_mut::<NoPadding>(&block);
        let result = decrypt_payload(&BASE64.encode(ct), KEY);
        assert!(matches!(result, Err(CodecError::Padding)));
    }

    #[test]
    fn test_input_errors() {
        assert!(matches!(decrypt_payload("%%%", KEY), Err(CodecError::Base64(_))));
        assert!(matches!(
            decrypt_payload(&BASE64.encode(b"short"), KEY),
            Err(CodecError::CiphertextLength(5))
        ));
        assert!(matches!(decrypt_payload("", KEY), Err(CodecError::CiphertextLength(0))));
        assert!(matches!(
            decrypt_payload(&encrypt(b"x"), b"tiny"),
            Err(CodecError::KeyLength(4))
        ));
    }
}
