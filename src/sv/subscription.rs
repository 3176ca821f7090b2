//! Subscription entitlements. The activity predicate and countdown live here
//! and nowhere else; every caller goes through them.

use crate::entity::subscription;
use crate::prelude::*;

/// The single source of truth for "subscription active".
pub fn is_active(expires_at: DateTime, now: DateTime) -> bool {
  expires_at > now
}

/// Remaining entitlement window, `None` once expired.
pub fn remaining(expires_at: DateTime, now: DateTime) -> Option<TimeDelta> {
  is_active(expires_at, now).then(|| expires_at - now)
}

/// Human-readable countdown for an entitlement window.
pub fn countdown(expires_at: DateTime, now: DateTime) -> Option<String> {
  remaining(expires_at, now).map(utils::format_duration)
}

pub struct Subscription<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> Subscription<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  pub async fn for_user(&self, user_id: &str) -> Result<Option<subscription::Model>> {
    let sub = subscription::Entity::find_by_id(user_id).one(self.db).await?;
    Ok(sub)
  }

  /// The user's subscription, only if it is still active.
  pub async fn active_for(&self, user_id: &str) -> Result<Option<subscription::Model>> {
    let now = Utc::now().naive_utc();
    Ok(self.for_user(user_id).await?.filter(|sub| is_active(sub.expires_at, now)))
  }

  /// Create or replace the user's entitlement window. Runs on whatever
  /// connection the caller holds so redemption can keep it transactional.
  pub async fn grant<C: ConnectionTrait>(
    conn: &C,
    user_id: &str,
    expires_at: DateTime,
    license_key_id: Option<&str>,
  ) -> Result<subscription::Model> {
    let now = Utc::now().naive_utc();

    let existing = subscription::Entity::find_by_id(user_id).one(conn).await?;

    let model = match existing {
      Some(current) => {
        subscription::ActiveModel {
          expires_at: Set(expires_at),
          source: Set("license_key".to_string()),
          license_key_id: Set(license_key_id.map(Into::into)),
          updated_at: Set(now),
          ..current.into()
        }
        .update(conn)
        .await?
      }
      None => {
        subscription::ActiveModel {
          user_id: Set(user_id.to_string()),
          expires_at: Set(expires_at),
          source: Set("license_key".to_string()),
          license_key_id: Set(license_key_id.map(Into::into)),
          updated_at: Set(now),
        }
        .insert(conn)
        .await?
      }
    };

    Ok(model)
  }

  pub async fn count_active(&self) -> Result<u64> {
    let now = Utc::now().naive_utc();
    let count = subscription::Entity::find()
      .filter(subscription::Column::ExpiresAt.gt(now))
      .count(self.db)
      .await?;
    Ok(count)
  }

  /// Active subscriptions running out within `window`, soonest first.
  pub async fn expiring_within(&self, window: TimeDelta) -> Result<Vec<subscription::Model>> {
    let now = Utc::now().naive_utc();
    let subs = subscription::Entity::find()
      .filter(subscription::Column::ExpiresAt.gt(now))
      .filter(subscription::Column::ExpiresAt.lte(now + window))
      .order_by_asc(subscription::Column::ExpiresAt)
      .all(self.db)
      .await?;
    Ok(subs)
  }
}
