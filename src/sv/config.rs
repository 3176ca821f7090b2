//! Key/value system configuration. Only `maintenance_mode` is interpreted.

use crate::entity::{Role, system_config};
use crate::prelude::*;

pub const MAINTENANCE_MODE: &str = "maintenance_mode";

/// Whether the maintenance flag locks this caller out. Admins always pass.
pub fn maintenance_blocks(maintenance: bool, role: Role) -> bool {
  maintenance && role != Role::Admin
}

pub struct Config<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> Config<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  pub async fn get(&self, key: &str) -> Result<Option<String>> {
    let row = system_config::Entity::find_by_id(key).one(self.db).await?;
    Ok(row.map(|r| r.value))
  }

  pub async fn set(&self, key: &str, value: &str) -> Result<()> {
    let now = Utc::now().naive_utc();

    match system_config::Entity::find_by_id(key).one(self.db).await? {
      Some(existing) => {
        system_config::ActiveModel {
          value: Set(value.to_string()),
          updated_at: Set(now),
          ..existing.into()
        }
        .update(self.db)
        .await?;
      }
      None => {
        system_config::ActiveModel {
          key: Set(key.to_string()),
          value: Set(value.to_string()),
          updated_at: Set(now),
        }
        .insert(self.db)
        .await?;
      }
    }

    Ok(())
  }

  /// Missing row reads as "false".
  pub async fn maintenance_mode(&self) -> Result<bool> {
    Ok(self.get(MAINTENANCE_MODE).await?.as_deref() == Some("true"))
  }

  pub async fn set_maintenance(&self, enabled: bool) -> Result<()> {
    self.set(MAINTENANCE_MODE, if enabled { "true" } else { "false" }).await
  }
}

#[cfg(test)]
mod tests {
  use sea_orm::{Database, DbBackend, Schema};

  use super::*;

  async fn setup_test_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    let schema = Schema::new(DbBackend::Sqlite);

    let stmt = schema.create_table_from_entity(system_config::Entity);
    db.execute(db.get_database_backend().build(&stmt)).await.unwrap();

    db
  }

  #[test]
  fn gate_spares_admins_only() {
    assert!(maintenance_blocks(true, Role::User));
    assert!(!maintenance_blocks(true, Role::Admin));
    assert!(!maintenance_blocks(false, Role::User));
    assert!(!maintenance_blocks(false, Role::Admin));
  }

  #[tokio::test]
  async fn maintenance_defaults_to_off_and_toggles() {
    let db = setup_test_db().await;
    let sv = Config::new(&db);

    assert!(!sv.maintenance_mode().await.unwrap());

    sv.set_maintenance(true).await.unwrap();
    assert!(sv.maintenance_mode().await.unwrap());
    assert_eq!(sv.get(MAINTENANCE_MODE).await.unwrap().as_deref(), Some("true"));

    sv.set_maintenance(false).await.unwrap();
    assert!(!sv.maintenance_mode().await.unwrap());
  }

  #[tokio::test]
  async fn unrelated_values_round_trip() {
    let db = setup_test_db().await;
    let sv = Config::new(&db);

    assert_eq!(sv.get("motd").await.unwrap(), None);
    sv.set("motd", "welcome").await.unwrap();
    sv.set("motd", "updated").await.unwrap();
    assert_eq!(sv.get("motd").await.unwrap().as_deref(), Some("updated"));
  }
}
