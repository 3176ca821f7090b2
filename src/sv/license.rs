use rand::Rng;
use uuid::Uuid;

pub use crate::prelude::*;
use crate::{entity::license_key, sv};

const KEY_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const KEY_GROUPS: usize = 4;
const KEY_GROUP_LEN: usize = 4;

pub struct License<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> License<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  /// Produce a `XXXX-XXXX-XXXX-XXXX` code over `[A-Z0-9]`.
  pub fn generate_key() -> String {
    let mut rng = rand::thread_rng();
    let mut key = String::with_capacity(KEY_GROUPS * (KEY_GROUP_LEN + 1) - 1);

    for group in 0..KEY_GROUPS {
      if group > 0 {
        key.push('-');
      }
      for _ in 0..KEY_GROUP_LEN {
        let idx = rng.gen_range(0..KEY_ALPHABET.len());
        key.push(KEY_ALPHABET[idx] as char);
      }
    }

    key
  }

  /// User-entered codes are matched case-insensitively.
  pub fn normalize_key(input: &str) -> String {
    input.trim().to_uppercase()
  }

  /// Insert `quantity` unused keys. Expiry is not computed here: duration is
  /// applied when a key is redeemed, never at creation time.
  pub async fn create_batch(
    &self,
    created_by: Option<&str>,
    duration_days: i64,
    quantity: u32,
  ) -> Result<Vec<license_key::Model>> {
    let now = Utc::now().naive_utc();
    let mut created = Vec::with_capacity(quantity as usize);

    for _ in 0..quantity {
      let model = license_key::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        key: Set(Self::generate_key()),
        duration_days: Set(duration_days),
        is_used: Set(false),
        created_by: Set(created_by.map(Into::into)),
        used_by: Set(None),
        created_at: Set(now),
        used_at: Set(None),
        expires_at: Set(None),
        last_activity: Set(None),
      };

      created.push(model.insert(self.db).await?);
    }

    Ok(created)
  }

  #[allow(dead_code)]
  pub async fn by_key(&self, key: &str) -> Result<Option<license_key::Model>> {
    let license = license_key::Entity::find()
      .filter(license_key::Column::Key.eq(Self::normalize_key(key)))
      .one(self.db)
      .await?;
    Ok(license)
  }

  pub async fn all(&self) -> Result<Vec<license_key::Model>> {
    let licenses = license_key::Entity::find()
      .order_by_desc(license_key::Column::CreatedAt)
      .all(self.db)
      .await?;
    Ok(licenses)
  }

  pub async fn delete(&self, id: &str) -> Result<()> {
    let deleted = license_key::Entity::delete_by_id(id).exec(self.db).await?;
    if deleted.rows_affected == 0 {
      return Err(Error::LicenseNotFound);
    }
    Ok(())
  }

  /// Consume a key for `user_id`. Atomic: the key flips to used and the
  /// caller's subscription window is replaced in one transaction, with
  /// `expires_at = now + duration_days` fixed here and never again.
  pub async fn redeem(&self, user_id: &str, raw_key: &str) -> Result<DateTime> {
    let key = Self::normalize_key(raw_key);
    let txn = self.db.begin().await?;

    let license = license_key::Entity::find()
      .filter(license_key::Column::Key.eq(&key))
      .one(&txn)
      .await?
      .ok_or(Error::LicenseNotFound)?;

    if license.is_used {
      return Err(Error::LicenseUsed);
    }

    let now = Utc::now().naive_utc();
    let expires_at = now + TimeDelta::days(license.duration_days);
    let license_id = license.id.clone();

    license_key::ActiveModel {
      is_used: Set(true),
      used_by: Set(Some(user_id.to_string())),
      used_at: Set(Some(now)),
      expires_at: Set(Some(expires_at)),
      last_activity: Set(Some(now)),
      ..license.into()
    }
    .update(&txn)
    .await?;

    sv::Subscription::grant(&txn, user_id, expires_at, Some(&license_id)).await?;

    txn.commit().await?;
    Ok(expires_at)
  }

  /// Stamp `last_activity` on the caller's live key, if any. Silent when the
  /// user holds no active key.
  pub async fn touch_activity(&self, user_id: &str) -> Result<()> {
    use sea_orm::sea_query::Expr;

    let now = Utc::now().naive_utc();
    license_key::Entity::update_many()
      .col_expr(license_key::Column::LastActivity, Expr::value(now))
      .filter(license_key::Column::UsedBy.eq(user_id))
      .filter(license_key::Column::ExpiresAt.gt(now))
      .exec(self.db)
      .await?;

    Ok(())
  }

  pub async fn count(&self) -> Result<u64> {
    Ok(license_key::Entity::find().count(self.db).await?)
  }

  pub async fn count_unused(&self) -> Result<u64> {
    let count = license_key::Entity::find()
      .filter(license_key::Column::IsUsed.eq(false))
      .count(self.db)
      .await?;
    Ok(count)
  }
}

#[cfg(test)]
mod tests {
  use sea_orm::{Database, DbBackend, Schema};

  use super::*;
  use crate::entity::*;

  async fn setup_test_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.unwrap();

    let schema = Schema::new(DbBackend::Sqlite);

    let stmt = schema.create_table_from_entity(profile::Entity);
    db.execute(db.get_database_backend().build(&stmt)).await.unwrap();

    let stmt = schema.create_table_from_entity(license_key::Entity);
    db.execute(db.get_database_backend().build(&stmt)).await.unwrap();

    let stmt = schema.create_table_from_entity(subscription::Entity);
    db.execute(db.get_database_backend().build(&stmt)).await.unwrap();

    db
  }

  async fn test_user(db: &DatabaseConnection, email: &str) -> profile::Model {
    sv::Profile::new(db).register("tester", email, "secret123").await.unwrap()
  }

  #[test]
  fn generated_keys_match_format() {
    for _ in 0..50 {
      let key = License::generate_key();
      let groups: Vec<&str> = key.split('-').collect();

      assert_eq!(groups.len(), 4, "{key}");
      for group in groups {
        assert_eq!(group.len(), 4, "{key}");
        assert!(
          group.bytes().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit()),
          "{key}"
        );
      }
    }
  }

  #[test]
  fn normalization_uppercases_and_trims() {
    assert_eq!(License::normalize_key("  ab12-cd34-ef56-gh78 "), "AB12-CD34-EF56-GH78");
  }

  #[tokio::test]
  async fn batch_creation_leaves_keys_unused() {
    let db = setup_test_db().await;
    let admin = test_user(&db, "admin@example.com").await;

    let keys =
      License::new(&db).create_batch(Some(&admin.id), 30, 5).await.unwrap();

    assert_eq!(keys.len(), 5);
    for key in keys {
      assert!(!key.is_used);
      assert_eq!(key.duration_days, 30);
      assert_eq!(key.expires_at, None);
      assert_eq!(key.created_by.as_deref(), Some(admin.id.as_str()));
    }
  }

  #[tokio::test]
  async fn redemption_fixes_expiry_and_grants_subscription() {
    let db = setup_test_db().await;
    let user = test_user(&db, "user@example.com").await;
    let sv = License::new(&db);

    let keys = sv.create_batch(None, 30, 1).await.unwrap();
    let before = Utc::now().naive_utc();

    let expires_at = sv.redeem(&user.id, &keys[0].key).await.unwrap();

    let days = (expires_at - before).num_days();
    assert!((29..=30).contains(&days));

    let stored = sv.by_key(&keys[0].key).await.unwrap().unwrap();
    assert!(stored.is_used);
    assert_eq!(stored.used_by.as_deref(), Some(user.id.as_str()));
    assert_eq!(stored.expires_at, Some(expires_at));

    let sub = sv::Subscription::new(&db).for_user(&user.id).await.unwrap().unwrap();
    assert_eq!(sub.expires_at, expires_at);
    assert_eq!(sub.source, "license_key");
    assert_eq!(sub.license_key_id.as_deref(), Some(stored.id.as_str()));
  }

  #[tokio::test]
  async fn redemption_is_case_insensitive() {
    let db = setup_test_db().await;
    let user = test_user(&db, "user@example.com").await;
    let sv = License::new(&db);

    let keys = sv.create_batch(None, 7, 1).await.unwrap();
    let lowered = keys[0].key.to_lowercase();

    assert!(sv.redeem(&user.id, &lowered).await.is_ok());
  }

  #[tokio::test]
  async fn unknown_key_mutates_nothing() {
    let db = setup_test_db().await;
    let user = test_user(&db, "user@example.com").await;
    let sv = License::new(&db);

    let result = sv.redeem(&user.id, "AAAA-BBBB-CCCC-DDDD").await;
    assert!(matches!(result, Err(Error::LicenseNotFound)));

    let sub = sv::Subscription::new(&db).for_user(&user.id).await.unwrap();
    assert!(sub.is_none());
  }

  #[tokio::test]
  async fn used_key_keeps_its_first_owner() {
    let db = setup_test_db().await;
    let first = test_user(&db, "first@example.com").await;
    let second = test_user(&db, "second@example.com").await;
    let sv = License::new(&db);

    let keys = sv.create_batch(None, 30, 1).await.unwrap();
    let expires_at = sv.redeem(&first.id, &keys[0].key).await.unwrap();

    let result = sv.redeem(&second.id, &keys[0].key).await;
    assert!(matches!(result, Err(Error::LicenseUsed)));

    let stored = sv.by_key(&keys[0].key).await.unwrap().unwrap();
    assert_eq!(stored.used_by.as_deref(), Some(first.id.as_str()));
    assert_eq!(stored.expires_at, Some(expires_at));

    let sub = sv::Subscription::new(&db).for_user(&second.id).await.unwrap();
    assert!(sub.is_none());
  }

  #[tokio::test]
  async fn activity_touch_updates_live_keys_only() {
    let db = setup_test_db().await;
    let user = test_user(&db, "user@example.com").await;
    let sv = License::new(&db);

    let keys = sv.create_batch(None, 30, 1).await.unwrap();
    sv.redeem(&user.id, &keys[0].key).await.unwrap();

    let before = sv.by_key(&keys[0].key).await.unwrap().unwrap();
    sv.touch_activity(&user.id).await.unwrap();
    let after = sv.by_key(&keys[0].key).await.unwrap().unwrap();

    assert!(after.last_activity >= before.last_activity);

    // No key at all: a no-op, not an error.
    let idle = test_user(&db, "idle@example.com").await;
    sv.touch_activity(&idle.id).await.unwrap();
  }

  #[tokio::test]
  async fn delete_removes_unknown_key_errors() {
    let db = setup_test_db().await;
    let sv = License::new(&db);

    let keys = sv.create_batch(None, 7, 1).await.unwrap();
    sv.delete(&keys[0].id).await.unwrap();
    assert_eq!(sv.count().await.unwrap(), 0);

    assert!(matches!(sv.delete("missing").await, Err(Error::LicenseNotFound)));
  }
}
