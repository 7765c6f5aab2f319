pub use std::sync::Arc;

pub use chrono::{NaiveDateTime as DateTime, TimeDelta, Utc};
pub use sea_orm::{
  ActiveModelTrait, ColumnTrait, ConnectionTrait, Database,
  DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
  QuerySelect, Set, TransactionTrait,
};
pub use migration::MigratorTrait;
pub use tracing::{debug, error, info, trace, warn};

pub use crate::error::{Error, Result};
