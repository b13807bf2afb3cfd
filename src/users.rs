//! Fixture users for tests and the CLI demo.
//!
//! Five named users with fixed private keys so that packet hex, node ids
//! and full routes are reproducible across runs. Initialized lazily,
//! read-only afterwards. Nothing in the core depends on this module.

use std::sync::OnceLock;

use secp256k1::{PublicKey, SecretKey, SECP256K1};

use crate::encoding::from_hex;

pub const ALICE: &str = "ALICE";
pub const BOB: &str = "BOB";
pub const CHARLIE: &str = "CHARLIE";
pub const DAVE: &str = "DAVE";
pub const EVE: &str = "EVE";

const FIXTURES: [(&str, &str); 5] = [
    (
        ALICE,
        "ad7e16172a13b571ec8bcd4b8c76d446a8be566d972c44742f08016c066a136b",
    ),
    (
        BOB,
        "e3e6fa3499dcbc47880c71650d3617b9d74cff3b85f295a4827a381c724804b8",
    ),
    (
        CHARLIE,
        "08d277077c093f9ba654ddf8afd2a58a03546ef74eaf54e2434d02e8f3ebaffb",
    ),
    (
        DAVE,
        "456ffe0a616b5f2dc4997ce2615d79b5f9cac126fe971ccd1372527edccf12fe",
    ),
    (
        EVE,
        "257c884234fdb637648a855dded8f0cfff9b02792330d2b670ab83536980ea3e",
    ),
];

/// A named fixture user.
pub struct User {
    pub name: &'static str,
    secret_key: SecretKey,
    pub public_key: PublicKey,
}

impl User {
    pub fn secret_key(&self) -> &SecretKey {
        &self.secret_key
    }
}

fn registry() -> &'static [User] {
    static REGISTRY: OnceLock<Vec<User>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        FIXTURES
            .iter()
            .map(|(name, hex)| {
                let bytes = from_hex(hex).expect("fixture keys are valid hex");
                let secret_key =
                    SecretKey::from_slice(&bytes).expect("fixture keys are within curve order");
                User {
                    name,
                    public_key: secret_key.public_key(SECP256K1),
                    secret_key,
                }
            })
            .collect()
    })
}

/// Look a user up by name, case-insensitively.
pub fn get_user(name: &str) -> Option<&'static User> {
    let upper = name.to_uppercase();
    registry().iter().find(|user| user.name == upper)
}

/// Reverse lookup from a compressed public key, used to name the next hop
/// when forwarding.
pub fn find_by_public_key(key: &PublicKey) -> Option<&'static User> {
    registry().iter().find(|user| user.public_key == *key)
}

/// All fixture users in registration order.
pub fn all() -> &'static [User] {
    registry()
}
