mod entity;
mod error;
mod handlers;
mod prelude;
mod state;
mod sv;
mod utils;
mod validate;

use std::{env, net::SocketAddr, sync::Arc, time::Duration};

use axum::{
  Router,
  routing::{get, post},
};
use tower::ServiceBuilder;
use tower_governor::{GovernorLayer, governor::GovernorConfigBuilder};
use tower_http::{
  cors::{Any, CorsLayer},
  trace::TraceLayer,
};
use tracing_subscriber::{
  EnvFilter, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::{prelude::*, state::AppState, sv::Mailer};

/// How often the outbox sweep retries verification emails that never
/// went out.
const REDELIVERY_INTERVAL: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() {
  dotenvy::dotenv().ok();

  tracing_subscriber::registry()
    .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
      "giveaway=debug,tower_http=debug,axum=trace,sea_orm=warn".into()
    }))
    .with(tracing_subscriber::fmt::layer())
    .init();

  let db_url = env::var("DATABASE_URL")
    .unwrap_or_else(|_| "sqlite:giveaway.db?mode=rwc".into());
  let base_url = env::var("PUBLIC_BASE_URL")
    .unwrap_or_else(|_| "http://localhost:3000".into());

  let mailer = match env::var("EMAIL_SERVICE_URL") {
    Ok(service_url) => {
      let api_key = env::var("EMAIL_SERVICE_API_KEY").unwrap_or_default();
      Mailer::new(base_url.clone(), service_url, api_key)
        .expect("Failed to build mail client")
    }
    Err(_) => {
      warn!("EMAIL_SERVICE_URL not set, outbound email disabled");
      Mailer::disabled(base_url.clone())
    }
  };

  info!("Starting giveaway server v{}", env!("CARGO_PKG_VERSION"));

  let app_state = Arc::new(
    AppState::new(&db_url, base_url, mailer)
      .await
      .expect("Failed to initialize app state"),
  );

  // Outbox sweep for verification emails whose dispatch failed
  let outbox_app = app_state.clone();
  tokio::spawn(async move {
    let mut interval = tokio::time::interval(REDELIVERY_INTERVAL);
    loop {
      interval.tick().await;
      let registration =
        sv::Registration::new(&outbox_app.db, &outbox_app.mailer);
      if let Err(err) = registration.redeliver_pending().await {
        error!("verification email redelivery failed: {err}");
      }
    }
  });

  let governor_conf = Arc::new(
    GovernorConfigBuilder::default()
      .per_second(2)
      .burst_size(100)
      .finish()
      .expect("Failed to build rate limiter config"),
  );

  let governor_limiter = governor_conf.limiter().clone();

  tokio::spawn(async move {
    loop {
      tokio::time::sleep(Duration::from_secs(60)).await;
      governor_limiter.retain_recent();
    }
  });

  let app = Router::new()
    .route("/api/giveaway/register", post(handlers::register))
    .route("/api/giveaway/verify", get(handlers::verify))
    .route("/api/giveaway/stats", get(handlers::stats))
    .route("/api/giveaway/admin/stats", get(handlers::admin_stats))
    .route("/api/giveaway/admin/winner", get(handlers::winner))
    .route("/health", get(handlers::health))
    .layer(
      ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(GovernorLayer::new(governor_conf))
        .layer(
          CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
        ),
    )
    .with_state(app_state.clone());

  let port: u16 =
    env::var("PORT").ok().and_then(|p| p.parse().ok()).unwrap_or(3000);
  let addr = SocketAddr::from(([0, 0, 0, 0], port));

  info!("HTTP server listening on {}", addr);

  let listener =
    tokio::net::TcpListener::bind(addr).await.expect("Failed to bind");

  axum::serve(
    listener,
    app.into_make_service_with_connect_info::<SocketAddr>(),
  )
  .with_graceful_shutdown(shutdown_signal())
  .await
  .expect("Server error");

  app_state.shutdown().await;
}

async fn shutdown_signal() {
  tokio::signal::ctrl_c().await.expect("Failed to listen for ctrl-c");
  info!("shutdown signal received");
}
