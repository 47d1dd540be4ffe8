use crate::permissions::extract;
use crate::user::{USER_ID_HEADER, USER_ROLE_HEADER};
use crate::{AppConfig, routes};
use axum::{Extension, Router};
use chrono::Utc;
use http::{HeaderName, Method, header};
use protect_axum::GrantsLayer;
use sea_orm::DatabaseConnection;
use std::error::Error;
use std::time::Duration;
use tokio::{task, time};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use windward_core::engine;

pub(crate) struct AppOptions {
    pub origins: Vec<String>,
    pub request_deadline: Duration,
    pub expiry_scan_interval: Duration,
}

pub(crate) async fn create_app(
    app_config: AppConfig,
    conn: DatabaseConnection,
    options: AppOptions,
) -> anyhow::Result<Router> {
    let cors = CorsLayer::new()
        .allow_origin(
            options
                .origins
                .iter()
                .map(|origin| origin.parse())
                .collect::<Result<Vec<_>, _>>()?,
        )
        .allow_headers([
            header::ACCEPT,
            header::CONTENT_TYPE,
            HeaderName::from_static(USER_ID_HEADER),
            HeaderName::from_static(USER_ROLE_HEADER),
        ])
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .max_age(Duration::from_secs(3600));

    // Advisory sweep; every handler also rechecks expiry against the clock.
    let sweep_conn = conn.clone();
    task::spawn(async move {
        let mut interval = time::interval(options.expiry_scan_interval);
        loop {
            interval.tick().await;
            if let Err(error) = engine::expire_stale(&sweep_conn, Utc::now()).await {
                tracing::error!(error = &error as &dyn Error, "expiry sweep failed");
            }
        }
    });

    let app = Router::new()
        .merge(routes::swagger::create_router())
        .nest("/status", routes::status::create_router())
        .nest("/assessments", routes::assessments::create_router())
        .nest("/admin", routes::admin::create_router())
        .nest("/students", routes::students::create_router())
        .layer(cors)
        .layer(
            // Router layers run bottom to top; ServiceBuilder layers run
            // top to bottom.
            ServiceBuilder::new()
                .layer(TimeoutLayer::new(options.request_deadline))
                .layer(Extension(app_config))
                .layer(Extension(conn))
                .layer(GrantsLayer::with_extractor(extract)),
        )
        .with_state(());
    Ok(app)
}
