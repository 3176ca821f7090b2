use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(SystemConfig::Table)
          .if_not_exists()
          .col(ColumnDef::new(SystemConfig::Key).string().not_null().primary_key())
          .col(ColumnDef::new(SystemConfig::Value).string().not_null())
          .col(ColumnDef::new(SystemConfig::UpdatedAt).date_time().not_null())
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager.drop_table(Table::drop().table(SystemConfig::Table).to_owned()).await
  }
}

#[derive(DeriveIden)]
pub enum SystemConfig {
  Table,
  Key,
  Value,
  UpdatedAt,
}
