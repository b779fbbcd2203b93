//! Synthetic value generation
//!
//! Generated values are seeded from the original value, so the same input
//! always maps to the same replacement within a run and across runs.

use crate::domain::ids::PiiType;
use fake::faker::address::en::CityName;
use fake::faker::company::en::CompanyName;
use fake::faker::internet::en::{DomainSuffix, IPv4, SafeEmail, Username};
use fake::faker::name::en::Name;
use fake::Fake;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sha2::{Digest, Sha256};

/// Generates a replacement for `value` of the given type
pub fn synthesize(pii_type: &PiiType, value: &str) -> String {
    let mut rng = seeded_rng(pii_type, value);
    match pii_type.as_str() {
        "PERSON" => Name().fake_with_rng(&mut rng),
        "LOCATION" => CityName().fake_with_rng(&mut rng),
        "ORGANIZATION" => CompanyName().fake_with_rng(&mut rng),
        "EMAIL_ADDRESS" => SafeEmail().fake_with_rng(&mut rng),
        "IP_ADDRESS" => IPv4().fake_with_rng(&mut rng),
        "URL" => {
            let user: String = Username().fake_with_rng(&mut rng);
            let suffix: String = DomainSuffix().fake_with_rng(&mut rng);
            format!("https://{}.{suffix}", user.to_ascii_lowercase())
        }
        _ => reshape(value, &mut rng),
    }
}

fn seeded_rng(pii_type: &PiiType, value: &str) -> StdRng {
    let mut hasher = Sha256::new();
    hasher.update(pii_type.as_str().as_bytes());
    hasher.update([0u8]);
    hasher.update(value.as_bytes());
    let digest = hasher.finalize();
    let mut seed = [0u8; 8];
    seed.copy_from_slice(&digest[..8]);
    StdRng::seed_from_u64(u64::from_le_bytes(seed))
}

/// Replaces digits and ASCII letters with random ones of the same class,
/// keeping separators and length
fn reshape(value: &str, rng: &mut StdRng) -> String {
    value
        .chars()
        .map(|c| {
            if c.is_ascii_digit() {
                char::from(b'0' + rng.gen_range(0..10u8))
            } else if c.is_ascii_lowercase() {
                char::from(b'a' + rng.gen_range(0..26u8))
            } else if c.is_ascii_uppercase() {
                char::from(b'A' + rng.gen_range(0..26u8))
            } else {
                c
            }
        })
        .collect()
}
