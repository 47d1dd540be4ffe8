use crate::opt::{Commands, Db, Run};
use anyhow::Result;
use axum::serve;
use clap::Parser;
use sea_orm::{ConnectOptions, Database};
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;
use url::Url;
use windward_core::recommend::RecommendationSettings;
use windward_core::{EngineSettings, Scorers};

mod app;
mod net;
mod opt;
mod permissions;
mod routes;
mod scorers;
mod trace;
mod user;

const DEFAULT_HOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);
const DEFAULT_PORT: u16 = 3040;

pub(crate) struct InnerAppConfig {
    engine: EngineSettings,
    scorers: Scorers,
}

#[derive(Clone)]
pub(crate) struct AppConfig(Arc<InnerAppConfig>);

impl AppConfig {
    fn new(engine: EngineSettings, scorers: Scorers) -> Self {
        Self(Arc::new(InnerAppConfig { engine, scorers }))
    }

    pub fn engine(&self) -> &EngineSettings {
        &self.0.engine
    }

    pub fn scorers(&self) -> &Scorers {
        &self.0.scorers
    }
}

async fn run(opt: Run) -> Result<()> {
    trace::setup(
        trace::TracingConfig::builder()
            .package(env!("CARGO_PKG_NAME"))
            .version(env!("CARGO_PKG_VERSION"))
            .build(),
    );

    let pool_options = build_connect_options(&opt.db, opt.db_dsn.clone());
    let pool = Database::connect(pool_options).await?;

    let engine = EngineSettings {
        session_ttl_minutes: opt.session_ttl_minutes,
        quadrature_size: opt.quadrature_size,
        default_top_k: opt.top_k_selection,
        default_irt_model: opt.irt_model,
        recommendation: RecommendationSettings {
            courses_per_skill: opt.recommendation_courses_per_skill,
            lessons_per_course: opt.lessons_per_course,
        },
    };
    let app_config = AppConfig::new(engine, scorers::placeholder_scorers());

    let options = app::AppOptions {
        origins: opt.origins.clone(),
        request_deadline: Duration::from_millis(opt.default_request_deadline_ms),
        expiry_scan_interval: Duration::from_secs(opt.expiry_scan_interval_s),
    };
    let app = app::create_app(app_config, pool, options).await?;

    let listener = net::create_listener((opt.host, opt.port), (DEFAULT_HOST, DEFAULT_PORT)).await?;
    tracing::info!(local_addr = %listener.local_addr()?, "starting app");
    serve::serve(listener, app.into_make_service()).await?;
    Ok(())
}

fn build_connect_options(db_options: &Db, db_url: Url) -> ConnectOptions {
    let mut pool_options = ConnectOptions::new(db_url);
    if let Some(min_connections) = db_options.db_min_connections {
        pool_options.min_connections(min_connections);
    }
    if let Some(max_connections) = db_options.db_max_connections {
        pool_options.max_connections(max_connections);
    }
    pool_options
}

fn main() -> Result<()> {
    let main = async {
        let opt = opt::Cli::parse();

        match opt.command {
            Commands::Run(o) => run(o).await?,
        }
        Ok(())
    };

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(main)
}
