use sea_orm_migration::prelude::*;

use super::m20260114_000001_create_profiles::Profiles;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(UserSubscriptions::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(UserSubscriptions::UserId)
              .string()
              .not_null()
              .primary_key(),
          )
          .col(ColumnDef::new(UserSubscriptions::ExpiresAt).date_time().not_null())
          .col(
            ColumnDef::new(UserSubscriptions::Source)
              .string()
              .not_null()
              .default("license_key"),
          )
          .col(ColumnDef::new(UserSubscriptions::LicenseKeyId).string().null())
          .col(ColumnDef::new(UserSubscriptions::UpdatedAt).date_time().not_null())
          .foreign_key(
            ForeignKey::create()
              .name("fk_user_subscriptions_profile")
              .from(UserSubscriptions::Table, UserSubscriptions::UserId)
              .to(Profiles::Table, Profiles::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .drop_table(Table::drop().table(UserSubscriptions::Table).to_owned())
      .await
  }
}

#[derive(DeriveIden)]
pub enum UserSubscriptions {
  Table,
  UserId,
  ExpiresAt,
  Source,
  LicenseKeyId,
  UpdatedAt,
}
