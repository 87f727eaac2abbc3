//! Bibliotheca Backend - GraphQL service for a shared book catalogue
//!
//! This is the main entry point for the Bibliotheca backend API.
//! All operations are exposed via GraphQL at /graphql.

mod config;
mod db;
mod graphql;
mod services;

use std::net::SocketAddr;

use async_graphql::http::GraphiQLSource;
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::Router;
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::response::IntoResponse;
use axum::routing::get;
use bson::oid::ObjectId;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::db::{Database, UserRecord};
use crate::graphql::{BibliothecaSchema, CurrentUser};
use crate::services::{AuthConfig, AuthService};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub auth: AuthService,
    pub schema: BibliothecaSchema,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bibliotheca=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Bibliotheca Backend");
    tracing::info!("Connecting to {}", config.mongodb_uri);

    // The client only fails here on a malformed URI; an unreachable server is
    // reported but not fatal, requests fail individually until it comes back.
    let db = Database::connect(&config.mongodb_uri, &config.database_name).await?;
    match db.ping().await {
        Ok(()) => {
            tracing::info!("Connected to MongoDB");
            if let Err(e) = db.ensure_indexes().await {
                tracing::warn!(error = %e, "Failed to create unique indexes");
            }
        }
        Err(e) => tracing::warn!(error = %e, "Error connecting to MongoDB"),
    }

    let auth = AuthService::new(db.clone(), AuthConfig::new(config.jwt_secret.clone()));

    let schema = graphql::build_schema(db.clone(), auth.clone());
    tracing::info!("GraphQL schema built");

    let state = AppState { db, auth, schema };

    let app = Router::new()
        .route("/graphql", get(graphiql).post(graphql_handler))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Listening on {}", addr);
    tracing::info!("GraphQL playground: http://localhost:{}/graphql", config.port);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Extract bearer token from Authorization header
fn extract_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .filter(|h| h.starts_with("Bearer "))
        .map(|h| h[7..].to_string())
}

/// Verify a bearer token and fetch the user it identifies. The signature
/// asserts identity; the lookup returns the user's current data.
async fn authenticate(state: &AppState, token: &str) -> anyhow::Result<UserRecord> {
    let claims = state.auth.decode_token(token)?;
    let id = ObjectId::parse_str(&claims.sub)?;
    state
        .db
        .users()
        .get_by_id(id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("token user no longer exists"))
}

/// GraphQL query/mutation handler with auth context
async fn graphql_handler(
    axum::extract::State(state): axum::extract::State<AppState>,
    headers: HeaderMap,
    req: GraphQLRequest,
) -> GraphQLResponse {
    let mut request = req.into_inner();

    // Absent or rejected tokens leave the request unauthenticated; resolvers
    // that need a user see no CurrentUser in the context.
    if let Some(token) = extract_token(&headers) {
        match authenticate(&state, &token).await {
            Ok(user) => request = request.data(CurrentUser(user)),
            Err(e) => tracing::debug!(error = %e, "Rejected bearer token"),
        }
    }

    state.schema.execute(request).await.into()
}

/// GraphiQL interactive playground (only for browsers)
async fn graphiql(headers: HeaderMap) -> impl IntoResponse {
    let accepts_html = headers
        .get(axum::http::header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.contains("text/html"))
        .unwrap_or(false);

    if accepts_html {
        axum::response::Html(GraphiQLSource::build().endpoint("/graphql").finish())
            .into_response()
    } else {
        (
            axum::http::StatusCode::METHOD_NOT_ALLOWED,
            axum::Json(serde_json::json!({
                "error": "GET requests are not supported for GraphQL queries. Use POST with Content-Type: application/json"
            })),
        )
            .into_response()
    }
}
