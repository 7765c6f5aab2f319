use migration::Migrator;

use crate::{prelude::*, sv::Mailer};

/// Process-wide shared state: the connection pool lives here, created once
/// in `main` and closed on shutdown.
pub struct AppState {
  pub db: DatabaseConnection,
  pub mailer: Mailer,
  pub base_url: String,
}

impl AppState {
  pub async fn new(
    db_url: &str,
    base_url: String,
    mailer: Mailer,
  ) -> anyhow::Result<Self> {
    let db = Database::connect(db_url).await?;
    Migrator::up(&db, None).await?;

    Ok(Self { db, mailer, base_url })
  }

  pub async fn shutdown(&self) {
    if let Err(err) = self.db.clone().close().await {
      warn!("closing database pool: {err}");
    }
  }
}
