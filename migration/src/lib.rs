//! Database migrations using SeaORM

pub use sea_orm_migration::prelude::*;

mod m20260114_000001_create_profiles;
mod m20260114_000002_create_user_roles;
mod m20260114_000003_create_license_keys;
mod m20260114_000004_create_user_subscriptions;
mod m20260114_000005_create_notifications;
mod m20260114_000006_create_system_config;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
  fn migrations() -> Vec<Box<dyn MigrationTrait>> {
    vec![
      Box::new(m20260114_000001_create_profiles::Migration),
      Box::new(m20260114_000002_create_user_roles::Migration),
      Box::new(m20260114_000003_create_license_keys::Migration),
      Box::new(m20260114_000004_create_user_subscriptions::Migration),
      Box::new(m20260114_000005_create_notifications::Migration),
      Box::new(m20260114_000006_create_system_config::Migration),
    ]
  }
}
