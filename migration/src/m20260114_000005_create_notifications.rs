use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(Notifications::Table)
          .if_not_exists()
          .col(ColumnDef::new(Notifications::Id).string().not_null().primary_key())
          .col(ColumnDef::new(Notifications::Title).string().not_null())
          .col(ColumnDef::new(Notifications::Message).text().not_null())
          .col(ColumnDef::new(Notifications::CreatedBy).string().null())
          .col(ColumnDef::new(Notifications::CreatedAt).date_time().not_null())
          .col(ColumnDef::new(Notifications::ExpiresAt).date_time().not_null())
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_notifications_expires_at")
          .table(Notifications::Table)
          .col(Notifications::ExpiresAt)
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager.drop_table(Table::drop().table(Notifications::Table).to_owned()).await
  }
}

#[derive(DeriveIden)]
pub enum Notifications {
  Table,
  Id,
  Title,
  Message,
  CreatedBy,
  CreatedAt,
  ExpiresAt,
}
