//! Per-hop key schedule.
//!
//! Everything a hop needs is derived from one ECDH shared secret:
//!
//! ```text
//! ss  = SHA256(compressed(e·P))            (ECDH on secp256k1)
//! bf  = SHA256(compressed(packet_key) || ss)
//! rho = HMAC-SHA256("rho", ss)             (routing blob obfuscation)
//! mu  = HMAC-SHA256("mu",  ss)             (packet MAC)
//! um  = HMAC-SHA256("um",  ss)             (error reporting, reserved)
//! pad = HMAC-SHA256("pad", ss)             (construction padding)
//! ```
//!
//! `packet_key` is the ephemeral public key riding on the packet as the
//! hop observes it; the blinding factor `bf` steps that key forward, so
//! successive hops see ephemerals related by `E_{i+1} = bf_i · E_i`
//! without being able to link them.
//!
//! Pseudo-random byte streams come from ChaCha20 keyed with `rho` (or
//! `pad`) under an all-zero 96-bit nonce.
//!
//! Shared secrets and subkeys are wiped with volatile writes when a
//! [`HopKeys`] or [`BlindedReceive`] is dropped.

use chacha20::cipher::{KeyIvInit, StreamCipher};
use chacha20::ChaCha20;
use hmac::{Hmac, Mac};
use secp256k1::ecdh::SharedSecret;
use secp256k1::{PublicKey, Scalar, SecretKey, SECP256K1};
use sha2::{Digest, Sha256};

use crate::constants::{KEY_LENGTH, STREAM_NONCE_LENGTH};

/// HMAC tag for the routing blob obfuscation key.
pub const RHO: &[u8] = b"rho";
/// HMAC tag for the MAC key.
pub const MU: &[u8] = b"mu";
/// HMAC tag for the error-reporting key. Derived for every hop, consumed
/// by nothing here; the failure-return protocol is out of scope.
pub const UM: &[u8] = b"um";
/// HMAC tag for the construction padding key.
pub const PAD: &[u8] = b"pad";
/// HMAC tag for receive-side node-id blinding.
pub const BLINDED_NODE_ID: &[u8] = b"blinded_node_id";

/// ECDH shared secret: SHA256 of the compressed shared point.
///
/// This is exactly libsecp256k1's default ECDH KDF, so the call is a
/// thin wrapper. Symmetric by construction:
/// `shared_secret(a, B) == shared_secret(b, A)`.
pub fn shared_secret(secret_key: &SecretKey, public_key: &PublicKey) -> [u8; KEY_LENGTH] {
    SharedSecret::new(public_key, secret_key).secret_bytes()
}

/// Blinding factor: SHA256(compressed(key) || ss).
pub fn blinding_factor(ss: &[u8; KEY_LENGTH], key: &PublicKey) -> [u8; KEY_LENGTH] {
    let mut sha = Sha256::new();
    sha.update(key.serialize());
    sha.update(ss);
    sha.finalize().into()
}

/// HMAC-SHA256 with an arbitrary key.
pub fn hmac_sha256(key: &[u8], msg: &[u8]) -> [u8; KEY_LENGTH] {
    let mut mac =
        <Hmac<Sha256> as Mac>::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(msg);
    mac.finalize().into_bytes().into()
}

/// Derive a typed subkey: HMAC-SHA256 keyed with the ASCII tag over the
/// shared secret.
pub fn derive_key(tag: &[u8], ss: &[u8]) -> [u8; KEY_LENGTH] {
    hmac_sha256(tag, ss)
}

/// Multiply a secret key by a blinding factor mod the curve order.
pub fn blind_secret_key(bf: &[u8; KEY_LENGTH], secret_key: &SecretKey) -> SecretKey {
    secret_key
        .mul_tweak(&scalar(bf))
        .expect("blinded secret key is nonzero")
}

/// Multiply a public key by a blinding factor.
pub fn blind_public_key(bf: &[u8; KEY_LENGTH], public_key: &PublicKey) -> PublicKey {
    public_key
        .mul_tweak(SECP256K1, &scalar(bf))
        .expect("blinded public key is a valid point")
}

fn scalar(bytes: &[u8; KEY_LENGTH]) -> Scalar {
    // A SHA256 output above the curve order has probability ~2^-128.
    Scalar::from_be_bytes(*bytes).expect("hash output is within the curve order")
}

/// XOR the ChaCha20 keystream for `key` (zero nonce) onto `buf`.
///
/// Applying the same stream twice restores the original bytes, so this
/// one function is both the encrypt and the decrypt direction.
pub fn apply_stream(key: &[u8; KEY_LENGTH], buf: &mut [u8]) {
    let mut cipher = ChaCha20::new(key.into(), &[0u8; STREAM_NONCE_LENGTH].into());
    cipher.apply_keystream(buf);
}

/// Produce `len` raw keystream bytes for `key` (zero nonce).
pub fn stream_bytes(key: &[u8; KEY_LENGTH], len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; len];
    apply_stream(key, &mut buf);
    buf
}

/// Full key material for one hop.
pub struct HopKeys {
    /// Our secret on this hop's edge: the sender's ephemeral key during
    /// construction, the node's (possibly blinded) identity key during
    /// peel.
    pub local_key: SecretKey,
    /// The ephemeral public key this hop observes on the packet.
    pub packet_key: PublicKey,
    /// ECDH shared secret with this hop.
    pub shared_secret: [u8; KEY_LENGTH],
    /// Blinding factor stepping the packet key to the next hop.
    pub blinding: [u8; KEY_LENGTH],
    /// Routing blob obfuscation subkey.
    pub rho: [u8; KEY_LENGTH],
    /// MAC subkey.
    pub mu: [u8; KEY_LENGTH],
    /// Error-reporting subkey (reserved, unused).
    pub um: [u8; KEY_LENGTH],
    /// Padding subkey.
    pub pad: [u8; KEY_LENGTH],
}

impl HopKeys {
    /// Sender-side derivation: a fresh ephemeral secret against the hop's
    /// (possibly blinded) node key. The packet key the hop will observe is
    /// the ephemeral's own public key.
    pub fn sender(ephemeral_key: SecretKey, node_key: &PublicKey) -> Self {
        let packet_key = ephemeral_key.public_key(SECP256K1);
        let ss = shared_secret(&ephemeral_key, node_key);
        Self::from_parts(ephemeral_key, packet_key, ss)
    }

    /// Receive-side derivation: the node's identity key (already blinded
    /// when inside a blinded segment) against the ephemeral key riding on
    /// the packet.
    pub fn receiver(local_key: SecretKey, packet_key: PublicKey) -> Self {
        let ss = shared_secret(&local_key, &packet_key);
        Self::from_parts(local_key, packet_key, ss)
    }

    fn from_parts(
        local_key: SecretKey,
        packet_key: PublicKey,
        shared_secret: [u8; KEY_LENGTH],
    ) -> Self {
        Self {
            blinding: blinding_factor(&shared_secret, &packet_key),
            rho: derive_key(RHO, &shared_secret),
            mu: derive_key(MU, &shared_secret),
            um: derive_key(UM, &shared_secret),
            pad: derive_key(PAD, &shared_secret),
            shared_secret,
            local_key,
            packet_key,
        }
    }

    /// The sender's ephemeral secret for the next hop:
    /// `E_{i+1} = bf_i · E_i`.
    pub fn next_ephemeral_key(&self) -> SecretKey {
        blind_secret_key(&self.blinding, &self.local_key)
    }
}

impl Drop for HopKeys {
    fn drop(&mut self) {
        self.local_key.non_secure_erase();
        for buf in [
            &mut self.shared_secret,
            &mut self.blinding,
            &mut self.rho,
            &mut self.mu,
            &mut self.um,
            &mut self.pad,
        ] {
            wipe(buf);
        }
    }
}

/// Walk the ephemeral key chain across a route, deriving [`HopKeys`] for
/// every hop. The first hop sees the session key's own public key.
pub fn derive_hop_keys(session_key: &SecretKey, node_keys: &[PublicKey]) -> Vec<HopKeys> {
    let mut ephemeral = *session_key;
    node_keys
        .iter()
        .map(|node_key| {
            let keys = HopKeys::sender(ephemeral, node_key);
            ephemeral = keys.next_ephemeral_key();
            keys
        })
        .collect()
}

/// Receive-side key material derived from a blinding ephemeral key inside
/// a blinded segment.
pub struct BlindedReceive {
    /// The node's identity key multiplied by the `blinded_node_id` factor;
    /// this is the key the onion layer was actually addressed to.
    pub blinded_key: SecretKey,
    /// Stream key for the recipient-encrypted route fragment.
    pub rho: [u8; KEY_LENGTH],
    /// The blinding ephemeral key to hand to the next hop alongside the
    /// forwarded packet.
    pub next_ephemeral_key: PublicKey,
}

impl BlindedReceive {
    pub fn derive(secret_key: &SecretKey, ephemeral_key: &PublicKey) -> Self {
        let ss = shared_secret(secret_key, ephemeral_key);
        let bf = derive_key(BLINDED_NODE_ID, &ss);
        Self {
            blinded_key: blind_secret_key(&bf, secret_key),
            rho: derive_key(RHO, &ss),
            next_ephemeral_key: blind_public_key(
                &blinding_factor(&ss, ephemeral_key),
                ephemeral_key,
            ),
        }
    }
}

impl Drop for BlindedReceive {
    fn drop(&mut self) {
        self.blinded_key.non_secure_erase();
        wipe(&mut self.rho);
    }
}

/// Volatile-write wipe so the compiler cannot elide the zeroization.
fn wipe(buf: &mut [u8; KEY_LENGTH]) {
    for byte in buf.iter_mut() {
        unsafe { std::ptr::write_volatile(byte as *mut u8, 0u8) };
    }
    std::sync::atomic::compiler_fence(std::sync::atomic::Ordering::SeqCst);
}
