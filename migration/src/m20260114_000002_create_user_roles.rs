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
          .table(UserRoles::Table)
          .if_not_exists()
          .col(ColumnDef::new(UserRoles::UserId).string().not_null().primary_key())
          .col(ColumnDef::new(UserRoles::Role).string().not_null().default("user"))
          .foreign_key(
            ForeignKey::create()
              .name("fk_user_roles_profile")
              .from(UserRoles::Table, UserRoles::UserId)
              .to(Profiles::Table, Profiles::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager.drop_table(Table::drop().table(UserRoles::Table).to_owned()).await
  }
}

#[derive(DeriveIden)]
pub enum UserRoles {
  Table,
  UserId,
  Role,
}
