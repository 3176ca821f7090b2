use sha2::{Digest, Sha256};

use crate::prelude::*;

pub fn format_date(date: DateTime) -> String {
  date.format("%d.%m.%Y %H:%M").to_string()
}

/// Expiry countdown used everywhere a remaining window is shown.
pub fn format_duration(duration: TimeDelta) -> String {
  format!(
    "{}d {}h {}m",
    duration.num_days(),
    duration.num_hours() % 24,
    duration.num_minutes() % 60
  )
}

/// Salted SHA-256 digest for stored credentials. The profile id is the salt,
/// so equal passwords never share a digest.
pub fn hash_password(user_id: &str, password: &str) -> String {
  let mut hasher = Sha256::new();
  hasher.update(user_id.as_bytes());
  hasher.update(b":");
  hasher.update(password.as_bytes());
  hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn duration_formatting() {
    let delta = TimeDelta::days(2) + TimeDelta::hours(3) + TimeDelta::minutes(7);
    assert_eq!(format_duration(delta), "2d 3h 7m");

    assert_eq!(format_duration(TimeDelta::minutes(59)), "0d 0h 59m");
  }

  #[test]
  fn password_digest_is_salted() {
    let a = hash_password("user-a", "hunter2");
    let b = hash_password("user-b", "hunter2");

    assert_ne!(a, b);
    assert_eq!(a.len(), 64);
    assert_eq!(a, hash_password("user-a", "hunter2"));
  }
}
