use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(Profiles::Table)
          .if_not_exists()
          .col(ColumnDef::new(Profiles::Id).string().not_null().primary_key())
          .col(ColumnDef::new(Profiles::Username).string().not_null())
          .col(ColumnDef::new(Profiles::Email).string().not_null())
          .col(ColumnDef::new(Profiles::PasswordHash).string().not_null())
          .col(ColumnDef::new(Profiles::AvatarUrl).string().null())
          .col(ColumnDef::new(Profiles::CreatedAt).date_time().not_null())
          .col(ColumnDef::new(Profiles::UpdatedAt).date_time().not_null())
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_profiles_email")
          .table(Profiles::Table)
          .col(Profiles::Email)
          .unique()
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager.drop_table(Table::drop().table(Profiles::Table).to_owned()).await
  }
}

#[derive(DeriveIden)]
pub enum Profiles {
  Table,
  Id,
  Username,
  Email,
  PasswordHash,
  AvatarUrl,
  CreatedAt,
  UpdatedAt,
}
