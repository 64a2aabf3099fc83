//! Server side of the cart: user documents, the merge-add operation and the
//! HTTP surface in front of them.

pub mod cart;
pub mod error;
pub mod repository;
pub mod routes;
pub mod user;

use anyhow::{Context, Result};
use axum::{
    Router,
    routing::get,
};
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::core::config::{AppConfig, SeedUser};
use crate::core::currency::RateProvider;
use crate::providers::http_rates::HttpRateProvider;
use crate::store::KeyValueStore;
use repository::{FjallUserRepository, RepositoryError, UserRepository};
use user::UserRecord;

const USERS_PARTITION: &str = "users";

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    /// Bearer token to user id.
    pub tokens: Arc<HashMap<String, String>>,
    pub rates: Arc<dyn RateProvider>,
}

impl AppState {
    pub fn new(
        users: Arc<dyn UserRepository>,
        seeds: &[SeedUser],
        rates: Arc<dyn RateProvider>,
    ) -> Self {
        let tokens = seeds
            .iter()
            .map(|u| (u.token.clone(), u.id.clone()))
            .collect();
        Self {
            users,
            tokens: Arc::new(tokens),
            rates,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(routes::health))
        .route(
            "/api/auth/cart",
            get(routes::get_cart).post(routes::add_to_cart),
        )
        .route("/api/currency/rates", get(routes::rates))
        .route("/api/currency/convert", get(routes::convert))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Creates the configured users that do not exist yet.
pub async fn seed_users(repo: &dyn UserRepository, seeds: &[SeedUser]) -> Result<()> {
    for seed in seeds {
        match repo
            .insert(UserRecord::new(&seed.id, &seed.username, &seed.email))
            .await
        {
            Ok(()) => info!(user = %seed.id, "Created seed user"),
            Err(RepositoryError::AlreadyExists(_)) => debug!(user = %seed.id, "Seed user exists"),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to create user {}", seed.id));
            }
        }
    }
    Ok(())
}

/// Whether `url` would reach a server listening on `bind`.
fn points_at_bind(url: &str, bind: &str) -> bool {
    let Ok(url) = reqwest::Url::parse(url) else {
        return false;
    };
    let Some((bind_host, bind_port)) = bind.rsplit_once(':') else {
        return false;
    };
    if url.port_or_known_default() != bind_port.parse().ok() {
        return false;
    }

    let is_local = |host: &str| matches!(host, "localhost" | "127.0.0.1" | "::1" | "0.0.0.0" | "::");
    let bind_host = bind_host.trim_matches(['[', ']']);
    let url_host = url.host_str().unwrap_or_default().trim_matches(['[', ']']);
    url_host == bind_host || (is_local(url_host) && is_local(bind_host))
}

pub async fn serve(config: &AppConfig, bind: Option<&str>) -> Result<()> {
    let addr = bind.unwrap_or(config.server.bind.as_str());
    let upstream = &config.server.upstream_rates;
    anyhow::ensure!(
        !points_at_bind(&upstream.url, addr),
        "Upstream rates URL {} points back at this server on {}; set server.upstream_rates to an external rate service",
        upstream.url,
        addr
    );

    let store = KeyValueStore::from_config(config)?;
    let users: Arc<dyn UserRepository> = Arc::new(FjallUserRepository::new(
        store.keyspace().clone(),
        store.partition(USERS_PARTITION)?,
    ));
    seed_users(users.as_ref(), &config.server.users).await?;

    let rates: Arc<dyn RateProvider> = Arc::new(HttpRateProvider::from_config(upstream));

    let state = AppState::new(users, &config.server.users, rates);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Server is running on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await
        .context("Server error")
}
