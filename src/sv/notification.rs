//! Broadcast notifications. Not per-user: every session sees the active set.

use uuid::Uuid;

use crate::entity::notification;
use crate::prelude::*;

pub struct Notification<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> Notification<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  pub async fn create(
    &self,
    created_by: Option<&str>,
    title: &str,
    message: &str,
    ttl: TimeDelta,
  ) -> Result<notification::Model> {
    let now = Utc::now().naive_utc();

    let model = notification::ActiveModel {
      id: Set(Uuid::new_v4().to_string()),
      title: Set(title.trim().to_string()),
      message: Set(message.trim().to_string()),
      created_by: Set(created_by.map(Into::into)),
      created_at: Set(now),
      expires_at: Set(now + ttl),
    };

    Ok(model.insert(self.db).await?)
  }

  /// Unexpired notifications, newest first.
  pub async fn active(&self) -> Result<Vec<notification::Model>> {
    let now = Utc::now().naive_utc();
    let rows = notification::Entity::find()
      .filter(notification::Column::ExpiresAt.gt(now))
      .order_by_desc(notification::Column::CreatedAt)
      .all(self.db)
      .await?;
    Ok(rows)
  }

  /// Everything, including expired rows, for the admin panel.
  pub async fn all(&self) -> Result<Vec<notification::Model>> {
    let rows = notification::Entity::find()
      .order_by_desc(notification::Column::CreatedAt)
      .all(self.db)
      .await?;
    Ok(rows)
  }

  pub async fn delete(&self, id: &str) -> Result<()> {
    notification::Entity::delete_by_id(id).exec(self.db).await?;
    Ok(())
  }

  /// Drop expired rows; returns how many were removed.
  pub async fn sweep_expired(&self) -> Result<u64> {
    let now = Utc::now().naive_utc();
    let deleted = notification::Entity::delete_many()
      .filter(notification::Column::ExpiresAt.lte(now))
      .exec(self.db)
      .await?;
    Ok(deleted.rows_affected)
  }

  pub async fn count(&self) -> Result<u64> {
    Ok(notification::Entity::find().count(self.db).await?)
  }
}

#[cfg(test)]
mod tests {
  use sea_orm::{Database, DbBackend, Schema};

  use super::*;

  async fn setup_test_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    let schema = Schema::new(DbBackend::Sqlite);

    let stmt = schema.create_table_from_entity(notification::Entity);
    db.execute(db.get_database_backend().build(&stmt)).await.unwrap();

    db
  }

  #[tokio::test]
  async fn active_filters_expired_rows() {
    let db = setup_test_db().await;
    let sv = Notification::new(&db);

    sv.create(None, "Fresh", "still visible", TimeDelta::hours(24)).await.unwrap();
    sv.create(None, "Stale", "already gone", TimeDelta::hours(-1)).await.unwrap();

    let active = sv.active().await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].title, "Fresh");

    assert_eq!(sv.all().await.unwrap().len(), 2);
  }

  #[tokio::test]
  async fn sweep_removes_only_expired_rows() {
    let db = setup_test_db().await;
    let sv = Notification::new(&db);

    sv.create(None, "Fresh", "keep", TimeDelta::hours(24)).await.unwrap();
    sv.create(None, "Stale", "drop", TimeDelta::hours(-1)).await.unwrap();
    sv.create(None, "Staler", "drop", TimeDelta::hours(-48)).await.unwrap();

    assert_eq!(sv.sweep_expired().await.unwrap(), 2);
    assert_eq!(sv.count().await.unwrap(), 1);
  }
}
