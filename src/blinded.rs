//! Blinded paths: recipient-built route suffixes that hide the trailing
//! hops' identities even from the sender.
//!
//! The recipient walks its own ephemeral key chain forward over the
//! segment, blinding every node id with the `blinded_node_id` factor and
//! leaving each hop an encrypted fragment that names its real next hop.
//! The sender only ever sees the entry node's real key, the blinded ids,
//! and opaque fragments; each hop recovers its fragment during peel via
//! the blinding ephemeral key that travels alongside the packet.
//!
//! Wire format of the published descriptor:
//!
//! ```text
//! entry_id[33] || u16_be(n) || blinded_id[33]·n
//!             || { u16_be(len) || bytes[len] }·(n+1) || first_eph[33]
//! ```
//!
//! Indexing gotcha encoded in the accessors below: `encrypted_data[0]`
//! belongs to the entry node, whose key is `entry_node_id` and *not* in
//! `blinded_node_ids`; fragment k+1 pairs with blinded id k.

use secp256k1::{PublicKey, SecretKey, SECP256K1};

use crate::encoding::Reader;
use crate::errors::OnionError;
use crate::keys::{
    apply_stream, blind_public_key, blind_secret_key, blinding_factor, derive_key, shared_secret,
    BLINDED_NODE_ID, RHO,
};
use crate::packet::{HopInput, HopKind};
use crate::payload::HopPayload;

/// Recipient-published descriptor of a blinded route suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlindedPath {
    /// Real public key of the node where the blinded segment begins.
    pub entry_node_id: PublicKey,
    /// Blinded ids for the hops after the entry node, in route order.
    pub blinded_node_ids: Vec<PublicKey>,
    /// One fragment per hop in the segment, entry node first; always
    /// `blinded_node_ids.len() + 1` entries.
    pub encrypted_data: Vec<Vec<u8>>,
    /// The blinding ephemeral key the sender must hand to the entry node.
    pub first_blinding_ephemeral_key: PublicKey,
}

impl BlindedPath {
    /// The entry node's encrypted fragment.
    pub fn entry_data(&self) -> &[u8] {
        &self.encrypted_data[0]
    }

    /// The blinded hops paired with their fragments, in route order.
    pub fn blinded_hops(&self) -> impl Iterator<Item = (&PublicKey, &[u8])> {
        self.blinded_node_ids
            .iter()
            .zip(self.encrypted_data[1..].iter().map(Vec::as_slice))
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&self.entry_node_id.serialize());
        out.extend_from_slice(&(self.blinded_node_ids.len() as u16).to_be_bytes());
        for id in &self.blinded_node_ids {
            out.extend_from_slice(&id.serialize());
        }
        for data in &self.encrypted_data {
            out.extend_from_slice(&(data.len() as u16).to_be_bytes());
            out.extend_from_slice(data);
        }
        out.extend_from_slice(&self.first_blinding_ephemeral_key.serialize());
        out
    }

    /// # Errors
    /// `InvalidPubKey` on any unparsable 33-byte point field,
    /// `ShortPayload` on truncation.
    pub fn decode(bytes: &[u8]) -> Result<Self, OnionError> {
        let mut reader = Reader::new(bytes);
        let entry_node_id = reader.pubkey("entry node id")?;
        let num_blinded = reader.u16_be("blinded id count")? as usize;
        let blinded_node_ids = (0..num_blinded)
            .map(|_| reader.pubkey("blinded node id"))
            .collect::<Result<Vec<_>, _>>()?;
        let encrypted_data = (0..num_blinded + 1)
            .map(|_| {
                let len = reader.u16_be("encrypted data length")? as usize;
                Ok(reader.take(len, "encrypted data")?.to_vec())
            })
            .collect::<Result<Vec<_>, OnionError>>()?;
        let first_blinding_ephemeral_key = reader.pubkey("first blinding ephemeral key")?;
        Ok(Self {
            entry_node_id,
            blinded_node_ids,
            encrypted_data,
            first_blinding_ephemeral_key,
        })
    }
}

/// Build a blinded path over `hops` (entry node first, recipient last)
/// with the recipient's fresh ephemeral `session_key`.
///
/// Only `pubkey` and `clear_data` of each input are read; the segment's
/// forwarding structure comes from hop order.
///
/// # Errors
/// `InvalidHopCount` with fewer than two hops: a blinded path needs an
/// entry node and at least the recipient behind it.
pub fn build_blinded_path(
    session_key: &SecretKey,
    hops: &[HopInput],
) -> Result<BlindedPath, OnionError> {
    if hops.len() < 2 {
        return Err(OnionError::InvalidHopCount(format!(
            "a blinded path needs at least 2 hops, got {}",
            hops.len()
        )));
    }

    let mut ephemeral = *session_key;
    let mut blinded_node_ids = Vec::with_capacity(hops.len() - 1);
    let mut encrypted_data = Vec::with_capacity(hops.len());

    for (i, hop) in hops.iter().enumerate() {
        let ss = shared_secret(&ephemeral, &hop.pubkey);
        let rho = derive_key(RHO, &ss);

        // The entry node is addressed by its real key; everyone after it
        // only ever appears under a blinded id.
        if i > 0 {
            let bf = derive_key(BLINDED_NODE_ID, &ss);
            blinded_node_ids.push(blind_public_key(&bf, &hop.pubkey));
        }

        let fragment = HopPayload {
            payload: hop.clear_data.clone(),
            forward_to: hops.get(i + 1).map(|next| next.pubkey),
        };
        let mut bytes = fragment.serialize();
        apply_stream(&rho, &mut bytes);
        encrypted_data.push(bytes);

        let ephemeral_pub = ephemeral.public_key(SECP256K1);
        ephemeral = blind_secret_key(&blinding_factor(&ss, &ephemeral_pub), &ephemeral);
    }

    Ok(BlindedPath {
        entry_node_id: hops[0].pubkey,
        blinded_node_ids,
        encrypted_data,
        first_blinding_ephemeral_key: session_key.public_key(SECP256K1),
    })
}

/// The onion hops a sender appends after its clear prefix to route into
/// `path`. `clear_data` supplies the sender's own payload for each hop of
/// the segment, entry node first; its length must be
/// `path.blinded_node_ids.len() + 1`.
pub fn blinded_segment_hops(path: &BlindedPath, clear_data: &[Vec<u8>]) -> Vec<HopInput> {
    let mut clear = clear_data.iter().cloned();
    let mut hops = Vec::with_capacity(path.encrypted_data.len());
    hops.push(HopInput {
        pubkey: path.entry_node_id,
        clear_data: clear.next().unwrap_or_default(),
        kind: HopKind::BlindedEntry {
            encrypted_data: path.entry_data().to_vec(),
            ephemeral_key: path.first_blinding_ephemeral_key,
        },
    });
    for (blinded_id, fragment) in path.blinded_hops() {
        hops.push(HopInput {
            pubkey: *blinded_id,
            clear_data: clear.next().unwrap_or_default(),
            kind: HopKind::Blinded {
                encrypted_data: fragment.to_vec(),
            },
        });
    }
    hops
}
