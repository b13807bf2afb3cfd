//! Onion Core — didactic Sphinx-style onion packets on secp256k1.
//!
//! A sender builds a fixed-size 1366-byte packet over a route of hops.
//! Each hop can, using only its own private key, authenticate the packet,
//! decrypt exactly its own payload, learn the next hop, and forward a
//! packet of the same fixed size. No hop learns the full route, and a
//! recipient may publish a [`BlindedPath`] that hides the trailing hops'
//! identities even from the sender.
//!
//! The crate is a pure synchronous library: no IO, no clocks, no shared
//! mutable state beyond the fixture [`users`] registry. Everything is
//! driven by four operations:
//!
//! - [`build_onion`] — wrap a route into a packet with a fresh session key
//! - [`peel`] — one hop's authenticate / decrypt / rotate step
//! - [`build_blinded_path`] — recipient-side blinded route construction
//! - the `serialize` / `deserialize` pairs on [`Onion`] and [`BlindedPath`]
//!
//! Transport, replay protection, and the error-return onion are out of
//! scope; the `um` subkey is derived for every hop but consumed by
//! nothing here.

pub mod blinded;
pub mod constants;
pub mod encoding;
pub mod errors;
pub mod keys;
pub mod packet;
pub mod payload;
pub mod users;

pub use blinded::{blinded_segment_hops, build_blinded_path, BlindedPath};
pub use errors::OnionError;
pub use packet::{build_onion, peel, HopInput, HopKind, Onion};
pub use payload::{HopData, HopPayload};
