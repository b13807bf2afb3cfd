//! Wire-format constants.
//!
//! Every sizing decision in the packet format traces back to the values
//! here. The serialized onion is always exactly
//! [`ONION_PACKET_LENGTH`] bytes, no matter how many hops it carries.

/// Onion version byte. Hard-wired; there is no negotiation.
pub const ONION_VERSION: u8 = 0x00;

/// Compressed secp256k1 public key length in bytes (0x02/0x03 prefix + x).
pub const PUBLIC_KEY_LENGTH: usize = 33;

/// Obfuscated routing blob length in bytes.
pub const HOP_PAYLOADS_LENGTH: usize = 1300;

/// HMAC-SHA256 output length in bytes.
pub const HMAC_LENGTH: usize = 32;

/// Total serialized onion length: version + session pubkey + routing blob
/// + packet HMAC.
pub const ONION_PACKET_LENGTH: usize =
    1 + PUBLIC_KEY_LENGTH + HOP_PAYLOADS_LENGTH + HMAC_LENGTH;

/// Shared secrets and derived subkeys are all 32 bytes.
pub const KEY_LENGTH: usize = 32;

/// ChaCha20 nonce length; the keystream always uses an all-zero nonce.
pub const STREAM_NONCE_LENGTH: usize = 12;

/// Per-hop overhead inside the routing blob: u16 length prefix plus the
/// chained HMAC for the next hop.
pub const HOP_SLOT_OVERHEAD: usize = 2 + HMAC_LENGTH;

/// Largest payload a single hop slot may advertise. Decoders reject
/// anything larger before indexing into the unwrapped buffer.
pub const MAX_HOP_PAYLOAD_LENGTH: usize = HOP_PAYLOADS_LENGTH - HOP_SLOT_OVERHEAD;
