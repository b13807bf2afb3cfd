//! Onion packet construction and peeling.
//!
//! The wire object is always exactly 1366 bytes:
//!
//! ```text
//! offset  size  field
//! 0       1     version (0x00)
//! 1       33    session public key (compressed secp256k1)
//! 34      1300  obfuscated hop payloads
//! 1334    32    HMAC-SHA256 under mu of bytes [34..1334)
//! ```
//!
//! Construction wraps the route in reverse order: the routing blob starts
//! as padding-key keystream, and for each hop (last first) the blob is
//! shifted right, the hop's slot written at the front, the whole blob
//! XORed with that hop's `rho` stream, and the packet MAC chained under
//! `mu`. A deterministic filler overwrites the tail on the first (i.e.
//! innermost) iteration so that the bytes each later hop shifts into view
//! look like fresh keystream.
//!
//! Peeling is the mirror image: verify the MAC, XOR the `rho` stream over
//! a zero-extended 2600-byte copy, cut the front slot off, and forward the
//! next 1300 bytes under a re-blinded ephemeral key. The packet a hop
//! forwards is indistinguishable in size and shape from the one it
//! received.

use secp256k1::{PublicKey, SecretKey, SECP256K1};
use subtle::ConstantTimeEq;

use crate::constants::{
    HMAC_LENGTH, HOP_PAYLOADS_LENGTH, MAX_HOP_PAYLOAD_LENGTH, ONION_PACKET_LENGTH, ONION_VERSION,
};
use crate::errors::OnionError;
use crate::keys::{
    apply_stream, blind_public_key, derive_hop_keys, hmac_sha256, stream_bytes, BlindedReceive,
    HopKeys,
};
use crate::payload::{HopData, HopPayload};

/// The fixed-size onion packet.
///
/// `ephemeral_key` is not part of the wire format: inside a blinded
/// segment each hop hands the current blinding ephemeral key to the next
/// hop alongside the packet, and this field carries it in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Onion {
    pub version: u8,
    pub public_key: PublicKey,
    pub hop_payloads: [u8; HOP_PAYLOADS_LENGTH],
    pub hmac: [u8; HMAC_LENGTH],
    pub ephemeral_key: Option<PublicKey>,
}

impl Onion {
    /// Serialize to the fixed 1366-byte wire form. `ephemeral_key` is
    /// deliberately not represented.
    pub fn serialize(&self) -> [u8; ONION_PACKET_LENGTH] {
        let mut out = [0u8; ONION_PACKET_LENGTH];
        out[0] = self.version;
        out[1..34].copy_from_slice(&self.public_key.serialize());
        out[34..1334].copy_from_slice(&self.hop_payloads);
        out[1334..].copy_from_slice(&self.hmac);
        out
    }

    /// # Errors
    /// `InvalidLength` unless the input is exactly 1366 bytes;
    /// `InvalidPubKey` if the session key field does not parse. The
    /// version byte is preserved as-is and only checked by [`peel`].
    pub fn deserialize(bytes: &[u8]) -> Result<Self, OnionError> {
        if bytes.len() != ONION_PACKET_LENGTH {
            return Err(OnionError::InvalidLength(format!(
                "onion must be exactly {ONION_PACKET_LENGTH} bytes, got {}",
                bytes.len()
            )));
        }
        let public_key = PublicKey::from_slice(&bytes[1..34])
            .map_err(|e| OnionError::InvalidPubKey(format!("session key: {e}")))?;
        let mut hop_payloads = [0u8; HOP_PAYLOADS_LENGTH];
        hop_payloads.copy_from_slice(&bytes[34..1334]);
        let mut hmac = [0u8; HMAC_LENGTH];
        hmac.copy_from_slice(&bytes[1334..]);
        Ok(Self {
            version: bytes[0],
            public_key,
            hop_payloads,
            hmac,
            ephemeral_key: None,
        })
    }
}

/// Where a hop sits relative to a blinded segment of the route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HopKind {
    /// Ordinary hop addressed by its real node key.
    Clear,
    /// Entry node of a blinded path. Carries the recipient's first
    /// blinding ephemeral key next to its encrypted route fragment.
    BlindedEntry {
        encrypted_data: Vec<u8>,
        ephemeral_key: PublicKey,
    },
    /// Hop inside the blinded segment, addressed by its blinded node id.
    Blinded { encrypted_data: Vec<u8> },
}

/// Caller-supplied description of one hop on the route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HopInput {
    /// The hop's long-term public key, or its blinded node id when the
    /// hop sits inside a blinded segment.
    pub pubkey: PublicKey,
    /// Opaque sender-supplied bytes for this hop.
    pub clear_data: Vec<u8>,
    pub kind: HopKind,
}

impl HopInput {
    pub fn clear(pubkey: PublicKey, clear_data: impl Into<Vec<u8>>) -> Self {
        Self {
            pubkey,
            clear_data: clear_data.into(),
            kind: HopKind::Clear,
        }
    }

    pub fn blinded_entry(
        pubkey: PublicKey,
        clear_data: impl Into<Vec<u8>>,
        encrypted_data: Vec<u8>,
        ephemeral_key: PublicKey,
    ) -> Self {
        Self {
            pubkey,
            clear_data: clear_data.into(),
            kind: HopKind::BlindedEntry {
                encrypted_data,
                ephemeral_key,
            },
        }
    }

    pub fn blinded(
        pubkey: PublicKey,
        clear_data: impl Into<Vec<u8>>,
        encrypted_data: Vec<u8>,
    ) -> Self {
        Self {
            pubkey,
            clear_data: clear_data.into(),
            kind: HopKind::Blinded { encrypted_data },
        }
    }

    fn is_blinded(&self) -> bool {
        !matches!(self.kind, HopKind::Clear)
    }

    fn encrypted_data(&self) -> &[u8] {
        match &self.kind {
            HopKind::Clear => &[],
            HopKind::BlindedEntry { encrypted_data, .. } => encrypted_data,
            HopKind::Blinded { encrypted_data } => encrypted_data,
        }
    }

    fn ephemeral_key(&self) -> Option<PublicKey> {
        match &self.kind {
            HopKind::BlindedEntry { ephemeral_key, .. } => Some(*ephemeral_key),
            _ => None,
        }
    }
}

/// Build a fixed-size onion over `hops` with a fresh `session_key`.
///
/// The session key must be single-use; reusing it links the packets it
/// produced.
///
/// # Errors
/// `InvalidHopCount` on an empty route, `InvalidLength` when the hop
/// payloads exceed the 1300-byte routing blob.
pub fn build_onion(session_key: &SecretKey, hops: &[HopInput]) -> Result<Onion, OnionError> {
    if hops.is_empty() {
        return Err(OnionError::InvalidHopCount(
            "an onion needs at least one hop".into(),
        ));
    }

    // Forward key walk over the route.
    let node_keys: Vec<PublicKey> = hops.iter().map(|h| h.pubkey).collect();
    let hop_keys = derive_hop_keys(session_key, &node_keys);

    // Serialize each hop's slot content. From the first blinded hop
    // onward the forward slot stays empty: those hops learn their next
    // hop from the recipient-encrypted fragment instead.
    let mut payloads = Vec::with_capacity(hops.len());
    let mut in_blinded_segment = false;
    for (i, hop) in hops.iter().enumerate() {
        in_blinded_segment = in_blinded_segment || hop.is_blinded();
        let data = HopData {
            clear_data: hop.clear_data.clone(),
            encrypted_data: hop.encrypted_data().to_vec(),
            ephemeral_key: hop.ephemeral_key(),
        };
        let forward_to = if in_blinded_segment || i == hops.len() - 1 {
            None
        } else {
            Some(hops[i + 1].pubkey)
        };
        payloads.push(
            HopPayload {
                payload: data.encode(),
                forward_to,
            }
            .serialize(),
        );
    }

    let total: usize = payloads.iter().map(|p| slot_size(p)).sum();
    if total > HOP_PAYLOADS_LENGTH {
        return Err(OnionError::InvalidLength(format!(
            "hop payloads need {total} bytes, the routing blob holds {HOP_PAYLOADS_LENGTH}"
        )));
    }

    let filler = generate_filler(&hop_keys, &payloads);

    // Reverse wrap, last hop first. The blob starts as keystream under
    // the session padding key so untouched bytes never read as zeros.
    let pad_key = crate::keys::derive_key(crate::keys::PAD, &session_key.secret_bytes());
    let mut packet = [0u8; HOP_PAYLOADS_LENGTH];
    apply_stream(&pad_key, &mut packet);

    let mut next_hmac = [0u8; HMAC_LENGTH];
    for i in (0..hops.len()).rev() {
        let payload = &payloads[i];
        let size = slot_size(payload);

        packet.copy_within(0..HOP_PAYLOADS_LENGTH - size, size);
        packet[..2].copy_from_slice(&(payload.len() as u16).to_be_bytes());
        packet[2..2 + payload.len()].copy_from_slice(payload);
        packet[2 + payload.len()..size].copy_from_slice(&next_hmac);

        apply_stream(&hop_keys[i].rho, &mut packet);

        if i == hops.len() - 1 && !filler.is_empty() {
            packet[HOP_PAYLOADS_LENGTH - filler.len()..].copy_from_slice(&filler);
        }

        next_hmac = hmac_sha256(&hop_keys[i].mu, &packet);
    }

    Ok(Onion {
        version: ONION_VERSION,
        public_key: session_key.public_key(SECP256K1),
        hop_payloads: packet,
        hmac: next_hmac,
        ephemeral_key: None,
    })
}

/// Bytes one hop's slot occupies in the routing blob: length prefix,
/// serialized payload, chained HMAC.
fn slot_size(payload: &[u8]) -> usize {
    2 + payload.len() + HMAC_LENGTH
}

/// Deterministic tail that makes the bytes shifted into view by each peel
/// indistinguishable from keystream.
///
/// Hop i's peel XORs its `rho` stream over the zero-extended blob, so the
/// tail it exposes equals `stream_i[1300..1300+size_i]`. Accumulating
/// those windows across all non-final hops, each XORed over the growing
/// prefix, yields exactly the bytes the construction must plant at the
/// end of the innermost wrap.
fn generate_filler(hop_keys: &[HopKeys], payloads: &[Vec<u8>]) -> Vec<u8> {
    let mut filler: Vec<u8> = Vec::new();
    let last = payloads.len() - 1;
    for (keys, payload) in hop_keys.iter().zip(payloads).take(last) {
        let start = HOP_PAYLOADS_LENGTH - filler.len();
        filler.resize(filler.len() + slot_size(payload), 0);
        let stream = stream_bytes(&keys.rho, 2 * HOP_PAYLOADS_LENGTH);
        for (f, s) in filler.iter_mut().zip(&stream[start..]) {
            *f ^= s;
        }
    }
    filler
}

/// Peel one layer: authenticate, decrypt this hop's slot, and produce the
/// rotated packet for the next hop.
///
/// `secret_key` is the receiving node's long-term key. When the incoming
/// onion carries a blinding ephemeral key (either in-memory from the
/// previous hop, or inside this hop's own payload at the entry of a
/// blinded path), the node's key is blinded before the ECDH so it matches
/// the blinded node id the sender addressed.
///
/// Returns this hop's [`HopPayload`] — with `forward_to` grafted from the
/// decrypted recipient fragment when inside a blinded segment — and the
/// onion to pass on. A `forward_to` of `None` marks the terminal hop.
///
/// # Errors
/// `UnsupportedVersion`, `BadMac` (wrong key or tampered packet; nothing
/// is decrypted or forwarded), `ShortPayload` / `InvalidPubKey` from the
/// payload decoders.
pub fn peel(secret_key: &SecretKey, onion: &Onion) -> Result<(HopPayload, Onion), OnionError> {
    if onion.version != ONION_VERSION {
        return Err(OnionError::UnsupportedVersion(onion.version));
    }

    // Blinded receive: advance the segment's ephemeral chain and swap in
    // our blinded identity key before any ECDH.
    let mut receive = onion
        .ephemeral_key
        .as_ref()
        .map(|eph| BlindedReceive::derive(secret_key, eph));
    let local_key = receive
        .as_ref()
        .map(|r| r.blinded_key)
        .unwrap_or(*secret_key);

    let keys = HopKeys::receiver(local_key, onion.public_key);

    // Authenticate before touching the payload. Constant-time compare so
    // a forger learns nothing from timing.
    let expected = hmac_sha256(&keys.mu, &onion.hop_payloads);
    if !bool::from(expected.ct_eq(&onion.hmac)) {
        return Err(OnionError::BadMac);
    }

    // Unwrap over a zero-extended buffer; the extra 1300 bytes become the
    // keystream tail the next packet inherits.
    let mut buf = [0u8; 2 * HOP_PAYLOADS_LENGTH];
    buf[..HOP_PAYLOADS_LENGTH].copy_from_slice(&onion.hop_payloads);
    apply_stream(&keys.rho, &mut buf);

    let payload_len = u16::from_be_bytes([buf[0], buf[1]]) as usize;
    if payload_len > MAX_HOP_PAYLOAD_LENGTH {
        return Err(OnionError::ShortPayload(format!(
            "slot advertises {payload_len} bytes, at most {MAX_HOP_PAYLOAD_LENGTH} fit"
        )));
    }

    let mut payload = HopPayload::deserialize(&buf[2..2 + payload_len])?;
    let mut next_hmac = [0u8; HMAC_LENGTH];
    next_hmac.copy_from_slice(&buf[2 + payload_len..2 + payload_len + HMAC_LENGTH]);
    let mut next_packet = [0u8; HOP_PAYLOADS_LENGTH];
    let tail = 2 + payload_len + HMAC_LENGTH;
    next_packet.copy_from_slice(&buf[tail..tail + HOP_PAYLOADS_LENGTH]);

    let data = HopData::decode(&payload.payload)?;

    // Entry hop of a blinded path: the first blinding ephemeral arrives
    // inside our own payload rather than alongside the packet.
    if let Some(inner_eph) = &data.ephemeral_key {
        receive = Some(BlindedReceive::derive(secret_key, inner_eph));
    }

    // A hop inside a blinded segment learns its next hop only from the
    // recipient-encrypted fragment.
    if !data.encrypted_data.is_empty() {
        if let Some(r) = &receive {
            let mut fragment = data.encrypted_data.clone();
            apply_stream(&r.rho, &mut fragment);
            let inner = HopPayload::deserialize(&fragment)?;
            payload.forward_to = inner.forward_to;
        }
    }

    let next_onion = Onion {
        version: ONION_VERSION,
        // Re-blind with the blinding factor of the *outer* shared secret;
        // the next hop must see E_{i+1} = bf_i · E_i.
        public_key: blind_public_key(&keys.blinding, &onion.public_key),
        hop_payloads: next_packet,
        hmac: next_hmac,
        ephemeral_key: receive.as_ref().map(|r| r.next_ephemeral_key),
    };

    Ok((payload, next_onion))
}
