//! Application wiring: store selection, HTTP router and server lifecycle

use axum::{Router, http::StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::core::auth::{
    AuthApiState, AuthService, JwtError, JwtService, PasswordError, PasswordHasher,
    auth_api_router,
};
use crate::core::config::{Config, ConfigError};
use crate::core::db::{
    AccountRepository, CredentialStore, DbError, InMemoryAccountStore,
    create_pool_with_migrations,
};

/// Errors that abort startup
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Token signing setup failed: {0}")]
    Jwt(#[from] JwtError),

    #[error("Password hasher setup failed: {0}")]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Database(#[from] DbError),

    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Select the credential store: PostgreSQL when `DATABASE_URL` is set,
/// in-memory otherwise
pub async fn build_store(config: &Config) -> Result<Arc<dyn CredentialStore>, StartupError> {
    match config.db_config() {
        Some(db_config) => {
            let pool = create_pool_with_migrations(&db_config).await?;
            tracing::info!(
                "Connected to PostgreSQL (max {} connections)",
                db_config.max_connections
            );
            Ok(Arc::new(AccountRepository::new(pool)))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, accounts are kept in memory only");
            Ok(Arc::new(InMemoryAccountStore::new()))
        }
    }
}

/// Build the full HTTP application
pub fn router(auth_service: AuthService, request_timeout: Duration) -> Router {
    auth_api_router(AuthApiState { auth_service })
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(TraceLayer::new_for_http())
}

/// Construct every component from configuration and serve until shutdown
pub async fn serve(config: Config) -> Result<(), StartupError> {
    let addr = config.bind_addr()?;

    let jwt_service = JwtService::new(config.jwt_config())?;
    let hasher = PasswordHasher::new(config.bcrypt_cost)?;
    tracing::info!(
        "Token expiry: {}, bcrypt cost: {}",
        jwt_service
            .expiration_minutes()
            .map(|m| format!("{m} minutes"))
            .unwrap_or_else(|| "none".to_string()),
        hasher.cost()
    );

    let store = build_store(&config).await?;
    let auth_service = AuthService::new(store, hasher, jwt_service);

    let app = router(
        auth_service,
        Duration::from_secs(config.request_timeout_secs),
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!("Failed to listen for SIGTERM: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::auth::JwtConfig;
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode},
    };
    use serde_json::{Value, json};
    use tower::ServiceExt;

    fn test_config(vars: &[(&str, &str)]) -> Config {
        let vars: std::collections::HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned()).unwrap()
    }

    #[tokio::test]
    async fn test_build_store_without_database_is_in_memory() {
        let config = test_config(&[("JWT_SECRET", "secret")]);

        let store = build_store(&config).await.unwrap();

        assert!(store.find_by_username("alice").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_router_serves_auth_routes_through_layers() {
        let auth_service = AuthService::new(
            Arc::new(InMemoryAccountStore::new()),
            PasswordHasher::new(4).unwrap(),
            JwtService::new(JwtConfig::new("secret")).unwrap(),
        );
        let app = router(auth_service, Duration::from_secs(5));

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/register")
                    .header("Content-Type", "application/json")
                    .body(Body::from(
                        json!({"username": "alice", "email": "a@x.com", "password": "secret"})
                            .to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn test_serve_rejects_invalid_bcrypt_cost() {
        let config = test_config(&[("JWT_SECRET", "secret"), ("BCRYPT_COST", "99")]);

        let result = serve(config).await;

        assert!(matches!(result, Err(StartupError::Password(_))));
    }

    #[tokio::test]
    async fn test_serve_rejects_invalid_host() {
        let config = test_config(&[("JWT_SECRET", "secret"), ("HOST", "localhost")]);

        let result = serve(config).await;

        assert!(matches!(result, Err(StartupError::Config(_))));
    }
}
