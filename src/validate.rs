//! Email validation for giveaway sign-ups.
//!
//! Disposable-address filtering fails closed: anything that looks like a
//! throwaway domain is rejected, even on a partial match.

/// Known disposable email domains.
const TEMP_EMAIL_DOMAINS: &[&str] = &[
  "tempmail.com",
  "temp-mail.org",
  "disposablemail.com",
  "mailinator.com",
  "guerrillamail.com",
  "guerrillamail.net",
  "guerrillamail.org",
  "sharklasers.com",
  "trashmail.com",
  "yopmail.com",
  "10minutemail.com",
  "temp-mail.ru",
  "discard.email",
  "maildrop.cc",
  "mailnesia.com",
  "throwawaymail.com",
  "tempemail.net",
  "emailondeck.com",
  "getnada.com",
  "tempmail.io",
];

/// Substrings common in disposable email domains.
const TEMP_EMAIL_PATTERNS: &[&str] = &[
  "temp",
  "disposable",
  "trash",
  "throw",
  "one-time",
  "temporary",
  "fake",
  "dispos",
  "discard",
  "nada",
  "guerrilla",
  "junk",
  "spam",
];

pub const MIN_EMAIL_LENGTH: usize = 5;
pub const MAX_EMAIL_LENGTH: usize = 255;

pub fn normalize_email(email: &str) -> String {
  email.trim().to_lowercase()
}

/// Basic `local@domain.tld` shape plus the disposable-domain denylist.
pub fn is_valid_email(email: &str) -> bool {
  let Some((local, domain)) = email.split_once('@') else {
    return false;
  };

  if local.is_empty()
    || domain.is_empty()
    || !domain.contains('.')
    || domain.starts_with('.')
    || domain.ends_with('.')
    || email.contains(char::is_whitespace)
    || domain.contains('@')
  {
    return false;
  }

  let domain = domain.to_lowercase();

  if TEMP_EMAIL_DOMAINS.contains(&domain.as_str()) {
    return false;
  }

  !TEMP_EMAIL_PATTERNS.iter().any(|pattern| domain.contains(pattern))
}

/// Length bounds are a separate client error with its own message.
pub fn is_valid_length(email: &str) -> bool {
  (MIN_EMAIL_LENGTH..=MAX_EMAIL_LENGTH).contains(&email.len())
}
