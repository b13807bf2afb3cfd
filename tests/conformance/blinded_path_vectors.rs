//! Blinded-path wire-format vectors.
//!
//! Invariants under test:
//! - encode → decode is the identity on well-formed descriptors.
//! - The encoder reproduces a fixed reference encoding byte-exact.
//! - Point fields that fail to parse are rejected with `InvalidPubKey`.

use onion_core::blinded::BlindedPath;
use onion_core::encoding::{from_hex, to_hex};
use onion_core::errors::OnionError;
use secp256k1::PublicKey;

fn pubkey(hex: &str) -> PublicKey {
    PublicKey::from_slice(&from_hex(hex).unwrap()).unwrap()
}

fn reference_path() -> BlindedPath {
    BlindedPath {
        entry_node_id: pubkey(
            "02b206d58012315e12414d339667c985108780408cf55a6d2d5b2a198d14127d86",
        ),
        blinded_node_ids: vec![
            pubkey("022fe0175b3219bf919b5235c03bc18c948b34ed5f77202eece192fc154b0e5e0c"),
            pubkey("033316570e8e06daf4312808203c4c67c783cdbda48f3a7929ee3eaf761a383d53"),
        ],
        encrypted_data: vec![
            from_hex("d9dc5fd6f6ec1e90602d").unwrap(),
            from_hex("6a5af8a7a743f6d9").unwrap(),
            from_hex("08eb17a57fbd").unwrap(),
        ],
        first_blinding_ephemeral_key: pubkey(
            "0374f41e150c3315b3de62477fdeb9a6ce403e659e27fcb5ae1d04d1b6e664eb0e",
        ),
    }
}

const REFERENCE_ENCODING: &str = "02b206d58012315e12414d339667c985108780408cf55a6d2d5b2a198d14127d860002022fe0175b3219bf919b5235c03bc18c948b34ed5f77202eece192fc154b0e5e0c033316570e8e06daf4312808203c4c67c783cdbda48f3a7929ee3eaf761a383d53000ad9dc5fd6f6ec1e90602d00086a5af8a7a743f6d9000608eb17a57fbd0374f41e150c3315b3de62477fdeb9a6ce403e659e27fcb5ae1d04d1b6e664eb0e";

#[test]
fn reference_descriptor_encodes_byte_exact() {
    assert_eq!(to_hex(&reference_path().encode()), REFERENCE_ENCODING);
}

#[test]
fn reference_descriptor_round_trips() {
    let path = reference_path();
    let decoded = BlindedPath::decode(&path.encode()).unwrap();
    assert_eq!(decoded, path);
    assert_eq!(to_hex(&decoded.encode()), REFERENCE_ENCODING);
}

#[test]
fn decode_from_reference_hex() {
    let decoded = BlindedPath::decode(&from_hex(REFERENCE_ENCODING).unwrap()).unwrap();
    assert_eq!(decoded, reference_path());
    assert_eq!(decoded.blinded_node_ids.len(), 2);
    assert_eq!(decoded.encrypted_data.len(), 3);
}

#[test]
fn entry_fragment_pairs_with_entry_node() {
    let path = reference_path();
    assert_eq!(path.entry_data(), &from_hex("d9dc5fd6f6ec1e90602d").unwrap()[..]);

    let pairs: Vec<_> = path.blinded_hops().collect();
    assert_eq!(pairs.len(), 2);
    assert_eq!(pairs[0].0, &path.blinded_node_ids[0]);
    assert_eq!(pairs[0].1, &from_hex("6a5af8a7a743f6d9").unwrap()[..]);
    assert_eq!(pairs[1].1, &from_hex("08eb17a57fbd").unwrap()[..]);
}

#[test]
fn corrupt_blinded_id_rejected() {
    let mut bytes = reference_path().encode();
    // First blinded id starts after entry id (33) + count (2).
    bytes[35] = 0x09;
    assert!(matches!(
        BlindedPath::decode(&bytes),
        Err(OnionError::InvalidPubKey(_))
    ));
}
