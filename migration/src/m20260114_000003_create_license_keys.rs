use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(LicenseKeys::Table)
          .if_not_exists()
          .col(ColumnDef::new(LicenseKeys::Id).string().not_null().primary_key())
          .col(ColumnDef::new(LicenseKeys::Key).string().not_null())
          .col(ColumnDef::new(LicenseKeys::DurationDays).big_integer().not_null())
          .col(
            ColumnDef::new(LicenseKeys::IsUsed)
              .boolean()
              .not_null()
              .default(false),
          )
          .col(ColumnDef::new(LicenseKeys::CreatedBy).string().null())
          .col(ColumnDef::new(LicenseKeys::UsedBy).string().null())
          .col(ColumnDef::new(LicenseKeys::CreatedAt).date_time().not_null())
          .col(ColumnDef::new(LicenseKeys::UsedAt).date_time().null())
          .col(ColumnDef::new(LicenseKeys::ExpiresAt).date_time().null())
          .col(ColumnDef::new(LicenseKeys::LastActivity).date_time().null())
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_license_keys_key")
          .table(LicenseKeys::Table)
          .col(LicenseKeys::Key)
          .unique()
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_license_keys_used_by")
          .table(LicenseKeys::Table)
          .col(LicenseKeys::UsedBy)
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager.drop_table(Table::drop().table(LicenseKeys::Table).to_owned()).await
  }
}

#[derive(DeriveIden)]
pub enum LicenseKeys {
  Table,
  Id,
  Key,
  DurationDays,
  IsUsed,
  CreatedBy,
  UsedBy,
  CreatedAt,
  UsedAt,
  ExpiresAt,
  LastActivity,
}
