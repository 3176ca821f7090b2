use uuid::Uuid;

use crate::entity::{Role, profile, user_role};
use crate::prelude::*;

pub struct Profile<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> Profile<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  pub async fn register(
    &self,
    username: &str,
    email: &str,
    password: &str,
  ) -> Result<profile::Model> {
    let email = email.trim().to_lowercase();

    if self.by_email(&email).await?.is_some() {
      return Err(Error::EmailTaken);
    }

    let id = Uuid::new_v4().to_string();
    let now = Utc::now().naive_utc();

    let model = profile::ActiveModel {
      id: Set(id.clone()),
      username: Set(username.trim().to_string()),
      email: Set(email),
      password_hash: Set(utils::hash_password(&id, password)),
      avatar_url: Set(None),
      created_at: Set(now),
      updated_at: Set(now),
    };

    Ok(model.insert(self.db).await?)
  }

  pub async fn verify_login(&self, email: &str, password: &str) -> Result<profile::Model> {
    let profile = self
      .by_email(&email.trim().to_lowercase())
      .await?
      .ok_or(Error::InvalidCredentials)?;

    if utils::hash_password(&profile.id, password) != profile.password_hash {
      return Err(Error::InvalidCredentials);
    }

    Ok(profile)
  }

  pub async fn by_id(&self, id: &str) -> Result<Option<profile::Model>> {
    let profile = profile::Entity::find_by_id(id).one(self.db).await?;
    Ok(profile)
  }

  pub async fn by_email(&self, email: &str) -> Result<Option<profile::Model>> {
    let profile = profile::Entity::find()
      .filter(profile::Column::Email.eq(email))
      .one(self.db)
      .await?;
    Ok(profile)
  }

  pub async fn all(&self) -> Result<Vec<profile::Model>> {
    let profiles = profile::Entity::find()
      .order_by_asc(profile::Column::CreatedAt)
      .all(self.db)
      .await?;
    Ok(profiles)
  }

  /// Settings-form update; untouched fields stay as they are.
  pub async fn update_settings(
    &self,
    id: &str,
    username: Option<&str>,
    avatar_url: Option<&str>,
  ) -> Result<profile::Model> {
    let profile = self.by_id(id).await?.ok_or(Error::UserNotFound)?;

    let mut model: profile::ActiveModel = profile.into();
    if let Some(username) = username {
      model.username = Set(username.trim().to_string());
    }
    if let Some(avatar_url) = avatar_url {
      model.avatar_url = Set(Some(avatar_url.to_string()));
    }
    model.updated_at = Set(Utc::now().naive_utc());

    Ok(model.update(self.db).await?)
  }

  /// Account deletion. Role and subscription rows go with it (FK cascade).
  pub async fn delete(&self, id: &str) -> Result<()> {
    let deleted = profile::Entity::delete_by_id(id).exec(self.db).await?;
    if deleted.rows_affected == 0 {
      return Err(Error::UserNotFound);
    }
    Ok(())
  }

  /// A missing role row means a regular user.
  pub async fn role_of(&self, user_id: &str) -> Result<Role> {
    let role = user_role::Entity::find_by_id(user_id)
      .one(self.db)
      .await?
      .map(|row| row.role)
      .unwrap_or_default();
    Ok(role)
  }

  pub async fn set_role(&self, user_id: &str, role: Role) -> Result<()> {
    if self.by_id(user_id).await?.is_none() {
      return Err(Error::UserNotFound);
    }

    match user_role::Entity::find_by_id(user_id).one(self.db).await? {
      Some(existing) => {
        user_role::ActiveModel { role: Set(role), ..existing.into() }
          .update(self.db)
          .await?;
      }
      None => {
        user_role::ActiveModel {
          user_id: Set(user_id.to_string()),
          role: Set(role),
        }
        .insert(self.db)
        .await?;
      }
    }

    Ok(())
  }

  /// Grant the admin role to every profile whose email is in `emails`.
  /// Called at startup and after registration.
  pub async fn bootstrap_admins<I>(&self, emails: I) -> Result<usize>
  where
    I: IntoIterator<Item = String>,
  {
    let mut granted = 0;
    for email in emails {
      if let Some(profile) = self.by_email(&email.trim().to_lowercase()).await? {
        if self.role_of(&profile.id).await? != Role::Admin {
          self.set_role(&profile.id, Role::Admin).await?;
          info!("Granted admin role to {}", profile.email);
          granted += 1;
        }
      }
    }
    Ok(granted)
  }

  pub async fn count(&self) -> Result<u64> {
    Ok(profile::Entity::find().count(self.db).await?)
  }

  pub async fn admin_count(&self) -> Result<u64> {
    let count = user_role::Entity::find()
      .filter(user_role::Column::Role.eq(Role::Admin))
      .count(self.db)
      .await?;
    Ok(count)
  }
}

#[cfg(test)]
mod tests {
  use sea_orm::{Database, DbBackend, Schema};

  use super::*;

  async fn setup_test_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    let schema = Schema::new(DbBackend::Sqlite);

    let stmt = schema.create_table_from_entity(profile::Entity);
    db.execute(db.get_database_backend().build(&stmt)).await.unwrap();

    let stmt = schema.create_table_from_entity(user_role::Entity);
    db.execute(db.get_database_backend().build(&stmt)).await.unwrap();

    db
  }

  #[tokio::test]
  async fn registration_normalizes_email_and_rejects_duplicates() {
    let db = setup_test_db().await;
    let sv = Profile::new(&db);

    let user = sv.register("Tester", "  User@Example.COM ", "secret123").await.unwrap();
    assert_eq!(user.email, "user@example.com");

    let dup = sv.register("Other", "user@example.com", "different").await;
    assert!(matches!(dup, Err(Error::EmailTaken)));
  }

  #[tokio::test]
  async fn login_verifies_digest() {
    let db = setup_test_db().await;
    let sv = Profile::new(&db);

    sv.register("Tester", "user@example.com", "secret123").await.unwrap();

    assert!(sv.verify_login("user@example.com", "secret123").await.is_ok());
    assert!(matches!(
      sv.verify_login("user@example.com", "wrong").await,
      Err(Error::InvalidCredentials)
    ));
    assert!(matches!(
      sv.verify_login("ghost@example.com", "secret123").await,
      Err(Error::InvalidCredentials)
    ));
  }

  #[tokio::test]
  async fn role_defaults_to_user_without_a_row() {
    let db = setup_test_db().await;
    let sv = Profile::new(&db);

    let user = sv.register("Tester", "user@example.com", "secret123").await.unwrap();
    assert_eq!(sv.role_of(&user.id).await.unwrap(), Role::User);

    sv.set_role(&user.id, Role::Admin).await.unwrap();
    assert_eq!(sv.role_of(&user.id).await.unwrap(), Role::Admin);
    assert_eq!(sv.admin_count().await.unwrap(), 1);

    // Upsert path: demote back.
    sv.set_role(&user.id, Role::User).await.unwrap();
    assert_eq!(sv.role_of(&user.id).await.unwrap(), Role::User);
  }

  #[tokio::test]
  async fn admin_bootstrap_matches_by_email() {
    let db = setup_test_db().await;
    let sv = Profile::new(&db);

    let admin = sv.register("Admin", "admin@example.com", "secret123").await.unwrap();
    sv.register("User", "user@example.com", "secret123").await.unwrap();

    let granted = sv
      .bootstrap_admins(["Admin@Example.com".to_string(), "ghost@example.com".to_string()])
      .await
      .unwrap();

    assert_eq!(granted, 1);
    assert_eq!(sv.role_of(&admin.id).await.unwrap(), Role::Admin);

    // Second run is a no-op.
    let granted =
      sv.bootstrap_admins(["admin@example.com".to_string()]).await.unwrap();
    assert_eq!(granted, 0);
  }

  #[tokio::test]
  async fn settings_update_is_partial() {
    let db = setup_test_db().await;
    let sv = Profile::new(&db);

    let user = sv.register("Tester", "user@example.com", "secret123").await.unwrap();

    let updated =
      sv.update_settings(&user.id, None, Some("https://cdn.example.com/a.png")).await.unwrap();
    assert_eq!(updated.username, "Tester");
    assert_eq!(updated.avatar_url.as_deref(), Some("https://cdn.example.com/a.png"));

    let updated = sv.update_settings(&user.id, Some("Renamed"), None).await.unwrap();
    assert_eq!(updated.username, "Renamed");
    assert_eq!(updated.avatar_url.as_deref(), Some("https://cdn.example.com/a.png"));
  }
}
