//! License key entity - one-time-use codes granting a time-boxed subscription

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "license_keys")]
pub struct Model {
  #[sea_orm(primary_key, auto_increment = false)]
  pub id: String,
  /// Human-readable code, `XXXX-XXXX-XXXX-XXXX` over `[A-Z0-9]`
  pub key: String,
  pub duration_days: i64,
  pub is_used: bool,
  pub created_by: Option<String>,
  pub used_by: Option<String>,
  pub created_at: DateTime,
  pub used_at: Option<DateTime>,
  /// Fixed exactly once, at redemption time
  pub expires_at: Option<DateTime>,
  pub last_activity: Option<DateTime>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(
    belongs_to = "super::profile::Entity",
    from = "Column::UsedBy",
    to = "super::profile::Column::Id"
  )]
  RedeemedBy,
}

impl Related<super::profile::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::RedeemedBy.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
