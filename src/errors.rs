//! Error types for onion-core.
//!
//! One crate-wide enum covers every failure the packet formats and the
//! peel/build operations can produce. All failures are terminal for the
//! operation in question; nothing is retried inside the core, and a hop
//! that fails to peel must not emit a forward packet.

/// Unified error type for all onion-core operations.
#[derive(Debug, thiserror::Error)]
pub enum OnionError {
    /// A serialized buffer is not the size the wire format requires.
    #[error("invalid length: {0}")]
    InvalidLength(String),

    /// A 33-byte field did not parse as a compressed secp256k1 point.
    #[error("invalid public key: {0}")]
    InvalidPubKey(String),

    /// The onion version byte is not 0x00.
    #[error("unsupported onion version {0:#04x}")]
    UnsupportedVersion(u8),

    /// Packet authentication failed. The hop must not decrypt the routing
    /// blob and must not forward anything.
    #[error("HMAC verification failed")]
    BadMac,

    /// A payload decoder reached end-of-buffer before the required fields.
    #[error("short payload: {0}")]
    ShortPayload(String),

    /// A hop list is too short for the requested construction.
    #[error("invalid hop count: {0}")]
    InvalidHopCount(String),

    /// The payload list handed to the front end does not match the hop
    /// list. Surfaced by the CLI, never by the core.
    #[error("{payloads} payloads do not match {hops} hops")]
    MismatchedPayloadCount { payloads: usize, hops: usize },

    /// Hex plumbing failure outside the core packet formats.
    #[error("encoding error: {0}")]
    Encoding(String),
}
