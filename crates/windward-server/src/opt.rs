use clap::{Args, Parser, Subcommand};
use std::net::IpAddr;
use url::Url;
use windward_irt::IrtModel;

#[derive(Debug, Parser)]
#[command(name = "windward", about = "Adaptive assessment core service")]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Commands {
    Run(Run),
}

#[derive(Debug, Clone, Args)]
#[group(multiple = true, required = false)]
pub(crate) struct Db {
    #[arg(long, help = "Min connections")]
    pub(crate) db_min_connections: Option<u32>,

    #[arg(long, help = "Max connections")]
    pub(crate) db_max_connections: Option<u32>,
}

#[derive(Debug, Clone, Parser)]
pub(crate) struct Run {
    #[arg(long)]
    pub(crate) host: Option<IpAddr>,

    #[arg(short, long)]
    pub(crate) port: Option<u16>,

    #[arg(long, env = "WINDWARD_DB_DSN", help = "Database connection string")]
    pub(crate) db_dsn: Url,

    #[command(flatten)]
    pub(crate) db: Db,

    #[arg(long, default_value_t = 120, help = "Session lifetime when the template config has no limit")]
    pub(crate) session_ttl_minutes: i64,

    #[arg(long, default_value_t = 60, help = "Interval of the stale-session sweep")]
    pub(crate) expiry_scan_interval_s: u64,

    #[arg(long, default_value_t = 5000, help = "Wall-clock deadline applied to every request")]
    pub(crate) default_request_deadline_ms: u64,

    #[arg(long, default_value_t = 41, help = "Quadrature points for ability estimation")]
    pub(crate) quadrature_size: usize,

    #[arg(long, default_value_t = 1, help = "Randomesque top-K pool for item selection")]
    pub(crate) top_k_selection: usize,

    #[arg(long, default_value = "2PL", help = "IRT model applied when the template config has none")]
    pub(crate) irt_model: IrtModel,

    #[arg(long, default_value_t = 2, help = "Courses recommended per weak skill")]
    pub(crate) recommendation_courses_per_skill: usize,

    #[arg(long, default_value_t = 2, help = "Lessons appended per recommended course")]
    pub(crate) lessons_per_course: usize,

    #[arg(long, help = "Allowed CORS origins")]
    pub(crate) origins: Vec<String>,
}
