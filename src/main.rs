use std::collections::HashMap;
use std::sync::Arc;

use import_tracker::api::auth::{UserRecord, UserRole, UserStore, hash_password};
use import_tracker::api::routes::{AppState, app_router};
use import_tracker::persistence::{PgOrderStore, create_pool_and_migrate};
use import_tracker::store::SharedOrderStore;
use tokio::sync::RwLock;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    dotenvy::dotenv().ok();

    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let jwt_secret = std::env::var("JWT_SECRET")
        .expect("JWT_SECRET must be set")
        .into_bytes();
    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

    let pool = create_pool_and_migrate(&database_url)
        .await
        .expect("database connection and migrations");
    let store: SharedOrderStore = Arc::new(PgOrderStore::new(pool));

    let user_store: UserStore = Arc::new(RwLock::new(HashMap::new()));
    seed_admin(&user_store).await;

    let state = AppState {
        store,
        user_store,
        jwt_secret,
    };
    let app = app_router(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await.unwrap();
    tracing::info!(%bind_addr, "listening");
    axum::serve(listener, app).await.unwrap();
}

/// Seed the admin account from ADMIN_EMAIL/ADMIN_PASSWORD, when both are
/// present.
async fn seed_admin(user_store: &UserStore) {
    let (Ok(email), Ok(password)) = (
        std::env::var("ADMIN_EMAIL"),
        std::env::var("ADMIN_PASSWORD"),
    ) else {
        tracing::warn!("ADMIN_EMAIL/ADMIN_PASSWORD not set, no admin account seeded");
        return;
    };
    let email = email.to_lowercase();
    let password_hash = hash_password(&password).expect("hash admin password");
    user_store.write().await.insert(
        email.clone(),
        UserRecord {
            user_id: Uuid::new_v4(),
            email: email.clone(),
            password_hash,
            role: UserRole::Admin,
        },
    );
    tracing::info!(%email, "admin account seeded");
}
