use rand::Rng;

/// Uppercase alphanumeric alphabet for referral codes.
const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

pub const REFERRAL_CODE_LENGTH: usize = 8;
pub const TOKEN_TTL_HOURS: i64 = 24;

/// Random candidate code. Uniqueness is enforced by the storage layer,
/// which retries under the unique constraint.
pub fn generate_referral_code(length: usize) -> String {
  let mut rng = rand::rng();
  (0..length)
    .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
    .collect()
}

/// 32 random bytes, hex encoded.
pub fn generate_verification_token() -> String {
  let bytes: [u8; 32] = rand::rng().random();
  hex::encode(bytes)
}

pub fn referral_link(base_url: &str, referral_code: &str) -> String {
  format!("{}?ref={}", base_url.trim_end_matches('/'), referral_code)
}
