use axum::{
    extract::{Extension, State},
    http::HeaderValue,
    middleware as axum_middleware,
    routing::{delete, get, patch, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use std::net::SocketAddr;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::EnvFilter;

mod auth;
mod config;
mod database;
mod error;
mod handlers;
mod middleware;
mod services;
mod state;

use middleware::CurrentUser;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = config::AppConfig::from_env()?;
    tracing::info!("Starting Infinicard API in {:?} mode", config.environment);

    let pool = database::create_pool(&config.database)?;

    // The store may be down at boot; start anyway and let /health report it
    if let Err(e) = database::run_migrations(&pool).await {
        tracing::warn!("Skipping migrations, database unavailable: {}", e);
    }

    let state = AppState::new(config, pool);
    let bind_addr = format!(
        "{}:{}",
        state.config.server.host, state.config.server.port
    );
    let app = app(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Infinicard API listening on http://{}", bind_addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

fn app(state: AppState) -> Router {
    let api = Router::new()
        .merge(auth_public_routes())
        .merge(auth_protected_routes(state.clone()))
        .merge(cards_routes(state.clone()))
        .merge(contacts_routes(state.clone()))
        .merge(tags_routes(state.clone()))
        .merge(discover_routes(state.clone()))
        .merge(notifications_routes(state.clone()))
        .merge(attendance_routes(state.clone()))
        // Coarse per-IP throttle over the whole API surface
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::rate_limit,
        ));

    Router::new()
        .route(
            "/",
            get(root).route_layer(axum_middleware::from_fn_with_state(
                state.clone(),
                middleware::optional_auth,
            )),
        )
        .route("/health", get(health))
        .nest("/api", api)
        // Global middleware
        .layer(cors_layer(&state.config.security.cors_origin))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origin: &str) -> CorsLayer {
    if origin == "*" {
        return CorsLayer::permissive();
    }
    match origin.parse::<HeaderValue>() {
        Ok(value) => CorsLayer::new()
            .allow_origin(value)
            .allow_methods(Any)
            .allow_headers(Any),
        Err(_) => {
            tracing::warn!("Invalid CORS origin {:?}, falling back to permissive", origin);
            CorsLayer::permissive()
        }
    }
}

fn auth_public_routes() -> Router<AppState> {
    use handlers::auth;

    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/request-otp", post(auth::request_otp))
        .route("/auth/verify-otp", post(auth::verify_otp))
        .route("/auth/reset-password-otp", post(auth::reset_password_otp))
}

fn auth_protected_routes(state: AppState) -> Router<AppState> {
    use handlers::auth;

    Router::new()
        .route(
            "/auth/profile",
            get(auth::get_profile).put(auth::update_profile),
        )
        .route("/auth/change-password", post(auth::change_password))
        .route_layer(axum_middleware::from_fn_with_state(
            state,
            middleware::require_auth,
        ))
}

fn cards_routes(state: AppState) -> Router<AppState> {
    use handlers::cards;

    Router::new()
        .route("/cards", get(cards::list_cards).post(cards::create_card))
        .route("/cards/search", get(cards::search_cards))
        .route(
            "/cards/:id",
            get(cards::get_card)
                .put(cards::update_card)
                .delete(cards::delete_card),
        )
        .route("/cards/:id/favorite", patch(cards::toggle_favorite))
        .route_layer(axum_middleware::from_fn_with_state(
            state,
            middleware::require_auth,
        ))
}

fn contacts_routes(state: AppState) -> Router<AppState> {
    use handlers::contacts;

    Router::new()
        .route(
            "/contacts",
            get(contacts::list_contacts).post(contacts::create_contact),
        )
        .route("/contacts/search", get(contacts::search_contacts))
        .route(
            "/contacts/:id",
            get(contacts::get_contact)
                .put(contacts::update_contact)
                .delete(contacts::delete_contact),
        )
        .route("/contacts/:id/favorite", patch(contacts::toggle_favorite))
        .route_layer(axum_middleware::from_fn_with_state(
            state,
            middleware::require_auth,
        ))
}

fn tags_routes(state: AppState) -> Router<AppState> {
    use handlers::tags;

    Router::new()
        .route("/tags", get(tags::list_tags).post(tags::create_tag))
        .route("/tags/:id", put(tags::update_tag).delete(tags::delete_tag))
        .route(
            "/tags/cards/:card_id/tags/:tag_id",
            post(tags::add_tag_to_card).delete(tags::remove_tag_from_card),
        )
        .route(
            "/tags/contacts/:contact_id/tags/:tag_id",
            post(tags::add_tag_to_contact).delete(tags::remove_tag_from_contact),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state,
            middleware::require_auth,
        ))
}

fn discover_routes(state: AppState) -> Router<AppState> {
    use handlers::discover;

    Router::new()
        .route("/discover/professionals", get(discover::list_professionals))
        .route(
            "/discover/connections/request",
            post(discover::send_connection_request),
        )
        .route("/discover/connections", get(discover::list_connections))
        .route(
            "/discover/connections/:id/accept",
            patch(discover::accept_connection),
        )
        .route(
            "/discover/connections/:id/reject",
            patch(discover::reject_connection),
        )
        .route("/discover/locations", get(discover::list_locations))
        .route("/discover/fields", get(discover::list_fields))
        .route_layer(axum_middleware::from_fn_with_state(
            state,
            middleware::require_auth,
        ))
}

fn notifications_routes(state: AppState) -> Router<AppState> {
    use handlers::notifications;

    Router::new()
        .route("/notifications", get(notifications::list_notifications))
        .route(
            "/notifications/:id/read",
            patch(notifications::mark_as_read),
        )
        .route(
            "/notifications/:id",
            delete(notifications::delete_notification),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state,
            middleware::require_auth,
        ))
}

fn attendance_routes(state: AppState) -> Router<AppState> {
    use handlers::attendance;

    Router::new()
        .route("/attendance", get(attendance::list_check_ins))
        .route("/attendance/check-in", post(attendance::check_in))
        .route("/attendance/batch", post(attendance::batch_check_in))
        .route_layer(axum_middleware::from_fn_with_state(
            state,
            middleware::require_auth,
        ))
}

async fn root(user: Option<Extension<CurrentUser>>) -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    let mut body = json!({
        "success": true,
        "message": "Infinicard API",
        "version": version,
        "endpoints": {
            "health": "/health",
            "auth": "/api/auth",
            "cards": "/api/cards",
            "contacts": "/api/contacts",
            "tags": "/api/tags",
            "discover": "/api/discover",
            "notifications": "/api/notifications",
            "attendance": "/api/attendance",
        },
    });

    if let Some(Extension(user)) = user {
        body["user"] = json!({ "id": user.id, "username": user.username });
    }

    Json(body)
}

/// Liveness endpoint with degraded-but-200 semantics: the process being up
/// is reported as 200 even while the backing store is unreachable, so
/// orchestrators do not restart a healthy process over a database outage.
async fn health(State(state): State<AppState>) -> Json<Value> {
    let now = chrono::Utc::now();

    match database::health_check(&state.pool).await {
        Ok(()) => Json(json!({
            "success": true,
            "message": "API is healthy",
            "timestamp": now,
            "database": "connected",
        })),
        Err(e) => {
            tracing::warn!("Health check: database unavailable: {}", e);
            Json(json!({
                "success": false,
                "message": "API running (degraded) - database unavailable",
                "timestamp": now,
                "database": "disconnected",
            }))
        }
    }
}
