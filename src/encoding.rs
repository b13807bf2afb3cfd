//! Hex and binary I/O plumbing.
//!
//! The packet formats themselves live in [`crate::packet`],
//! [`crate::payload`] and [`crate::blinded`]; this module only provides
//! the hex surface the CLI and the test suites speak, plus a
//! bounds-checked reader the decoders share.

use secp256k1::PublicKey;

use crate::constants::PUBLIC_KEY_LENGTH;
use crate::errors::OnionError;

/// Encode bytes to lowercase hex string.
pub fn to_hex(data: &[u8]) -> String {
    data.iter().map(|b| format!("{b:02x}")).collect()
}

/// Decode hex string to bytes.
///
/// # Errors
/// Returns `OnionError::Encoding` on odd-length or non-hex input.
pub fn from_hex(encoded: &str) -> Result<Vec<u8>, OnionError> {
    if encoded.len() % 2 != 0 {
        return Err(OnionError::Encoding("odd-length hex string".into()));
    }
    (0..encoded.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&encoded[i..i + 2], 16)
                .map_err(|e| OnionError::Encoding(format!("invalid hex: {e}")))
        })
        .collect()
}

/// Bounds-checked cursor over a byte slice. Every read names the field it
/// is after so decode failures point at the exact spot.
pub(crate) struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub(crate) fn take(&mut self, n: usize, field: &str) -> Result<&'a [u8], OnionError> {
        let left = self.buf.len() - self.pos;
        if left < n {
            return Err(OnionError::ShortPayload(format!(
                "{field} needs {n} bytes, {left} left"
            )));
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub(crate) fn u16_be(&mut self, field: &str) -> Result<u16, OnionError> {
        let bytes = self.take(2, field)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    /// Read a 33-byte compressed point that must parse.
    pub(crate) fn pubkey(&mut self, field: &str) -> Result<PublicKey, OnionError> {
        let bytes = self.take(PUBLIC_KEY_LENGTH, field)?;
        PublicKey::from_slice(bytes)
            .map_err(|e| OnionError::InvalidPubKey(format!("{field}: {e}")))
    }

    /// Read a 33-byte slot where all zeros means "absent".
    pub(crate) fn optional_pubkey(&mut self, field: &str) -> Result<Option<PublicKey>, OnionError> {
        let bytes = self.take(PUBLIC_KEY_LENGTH, field)?;
        if bytes.iter().all(|b| *b == 0) {
            return Ok(None);
        }
        PublicKey::from_slice(bytes)
            .map(Some)
            .map_err(|e| OnionError::InvalidPubKey(format!("{field}: {e}")))
    }
}
