//! Per-hop payload codecs.
//!
//! Two nested formats travel inside a hop's slot of the routing blob:
//!
//! ```text
//! HopPayload: u16_be(len) || payload[len] || next_pubkey[33]
//! HopData:    u16_be(len_clear) || clear || u16_be(len_enc) || enc
//!             || flag || (flag == 1 ? pubkey[33] : ε)
//! ```
//!
//! A `HopPayload` whose pubkey slot is all zeros has no forward hop; the
//! hop that decodes it is the terminal hop. The `HopData` flag byte marks
//! whether the first blinding ephemeral key of a blinded path rides along
//! (entry hop only).

use secp256k1::PublicKey;

use crate::constants::PUBLIC_KEY_LENGTH;
use crate::encoding::Reader;
use crate::errors::OnionError;

/// What a hop reads out of its slot: opaque payload bytes and, unless it
/// is the terminal hop, the public key to forward the rotated packet to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HopPayload {
    /// Opaque bytes for this hop; in a full onion this is an encoded
    /// [`HopData`], in a blinded-path fragment it is the recipient's
    /// clear data.
    pub payload: Vec<u8>,
    /// Next hop, or `None` for the terminal hop.
    pub forward_to: Option<PublicKey>,
}

impl HopPayload {
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(2 + self.payload.len() + PUBLIC_KEY_LENGTH);
        out.extend_from_slice(&(self.payload.len() as u16).to_be_bytes());
        out.extend_from_slice(&self.payload);
        match &self.forward_to {
            Some(key) => out.extend_from_slice(&key.serialize()),
            None => out.extend_from_slice(&[0u8; PUBLIC_KEY_LENGTH]),
        }
        out
    }

    /// # Errors
    /// `ShortPayload` if the buffer ends before the length-prefixed bytes
    /// or the pubkey slot; `InvalidPubKey` if a nonzero slot does not
    /// parse as a compressed point.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, OnionError> {
        let mut reader = Reader::new(bytes);
        let len = reader.u16_be("hop payload length")? as usize;
        let payload = reader.take(len, "hop payload")?.to_vec();
        let forward_to = reader.optional_pubkey("forward slot")?;
        Ok(Self {
            payload,
            forward_to,
        })
    }
}

/// Inner payload a hop decodes out of its [`HopPayload`]: the sender's
/// clear bytes, an optional recipient-encrypted route fragment, and (on
/// the entry hop of a blinded path only) the first blinding ephemeral
/// key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HopData {
    pub clear_data: Vec<u8>,
    pub encrypted_data: Vec<u8>,
    pub ephemeral_key: Option<PublicKey>,
}

impl HopData {
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(
            5 + self.clear_data.len() + self.encrypted_data.len() + PUBLIC_KEY_LENGTH,
        );
        out.extend_from_slice(&(self.clear_data.len() as u16).to_be_bytes());
        out.extend_from_slice(&self.clear_data);
        out.extend_from_slice(&(self.encrypted_data.len() as u16).to_be_bytes());
        out.extend_from_slice(&self.encrypted_data);
        match &self.ephemeral_key {
            Some(key) => {
                out.push(1);
                out.extend_from_slice(&key.serialize());
            }
            None => out.push(0),
        }
        out
    }

    /// # Errors
    /// `ShortPayload` on truncated input, `InvalidPubKey` if the flagged
    /// ephemeral key does not parse.
    pub fn decode(bytes: &[u8]) -> Result<Self, OnionError> {
        let mut reader = Reader::new(bytes);
        let clear_len = reader.u16_be("clear data length")? as usize;
        let clear_data = reader.take(clear_len, "clear data")?.to_vec();
        let enc_len = reader.u16_be("encrypted data length")? as usize;
        let encrypted_data = reader.take(enc_len, "encrypted data")?.to_vec();
        let flag = reader.take(1, "ephemeral key flag")?[0];
        let ephemeral_key = if flag == 1 {
            Some(reader.pubkey("ephemeral key")?)
        } else {
            None
        };
        Ok(Self {
            clear_data,
            encrypted_data,
            ephemeral_key,
        })
    }
}
