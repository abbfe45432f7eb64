use crate::state::*;

use std::env;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub jwt_secret: String,
    pub gh_client_id: String,
    pub gh_client_secret: String,
    pub gh_user_agent: String,
    /// Server-wide GitHub token used when a user has no stored token of their
    /// own. Lets the service read public repos past the anonymous rate limit.
    pub gh_fallback_token: Option<String>,
}

#[derive(Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct DbOptions {
    timeout: u64,
}

impl Config {
    pub fn parse_from_env() -> Self {
        // Load environment variables from a .env file. This is used for dev workflows.
        dotenv::dotenv().ok();

        let mut env_vars: std::collections::HashMap<String, String> = env::vars().collect();

        // Note: it's okay to panic in places like this, because without these
        // env vars, we can't launch the server at all, and it only happens at startup.

        let database_url = env_vars
            .remove("DATABASE_URL")
            .expect("no DATABASE_URL environment variable present");
        let port = env_vars
            .remove("PORT")
            .expect("no PORT environment variable present")
            .parse::<u16>()
            .expect("invalid port");
        let jwt_secret = env_vars
            .remove("JWT_SECRET")
            .expect("no JWT_SECRET environment variable present");
        let gh_client_id = env_vars
            .remove("GH_CLIENT_ID")
            .expect("no GH_CLIENT_ID environment variable present");
        let gh_client_secret = env_vars
            .remove("GH_CLIENT_SECRET")
            .expect("no GH_CLIENT_SECRET environment variable present");
        let gh_user_agent = env_vars
            .remove("GH_USER_AGENT")
            .unwrap_or_else(|| "github-crm".to_string());
        let gh_fallback_token = env_vars
            .remove("GH_FALLBACK_TOKEN")
            .filter(|t| !t.is_empty());

        Config {
            database_url,
            port,
            jwt_secret,
            gh_client_id,
            gh_client_secret,
            gh_user_agent,
            gh_fallback_token,
        }
    }

    pub async fn into_state(self) -> AppStateRaw {
        let mut pool_options = PoolOptions::new();

        // Pool options ride along on the database URL query string, e.g.
        // `postgres://u:p@host/db?timeout=5`.
        if let Some(opstr) = url::Url::parse(&self.database_url)
            .expect("invalid DATABASE_URL")
            .query()
        {
            if let Ok(ops) = serde_qs::from_str::<DbOptions>(opstr)
                .map_err(|e| error!("serde_qs::from_str::<DbOptions> failed: {}", e))
            {
                pool_options =
                    pool_options.acquire_timeout(std::time::Duration::from_secs(ops.timeout));
            }
        }

        let db_conn = pool_options
            .connect(&self.database_url)
            .await
            .expect("sql open");

        info!("connected to database, serving on port {}", self.port);

        Arc::new(State {
            config: self,
            db_conn,
        })
    }
}

#[derive(clap::Parser, Debug)]
#[clap(version)]
pub struct Opts {
    // The number of occurrences of the `v/verbose` flag
    /// Verbose mode (-v, -vv, -vvv, etc.)
    #[clap(short, long, parse(from_occurrences))]
    pub verbose: u8,
}

impl Opts {
    pub fn parse_from_args() -> (JoinHandle, Self) {
        use clap::Parser;
        let opt: Self = Opts::parse();

        let level = match opt.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _more => LevelFilter::Trace,
        };

        let formater = BaseFormater::new()
            .local(true)
            .color(true)
            .level(4)
            .formater(format);
        let filter = BaseFilter::new()
            .starts_with(true)
            .notfound(true)
            .max_level(level)
            .chain(
                "sqlx",
                if opt.verbose > 1 {
                    LevelFilter::Debug
                } else {
                    LevelFilter::Warn
                },
            );

        let handle = NonblockLogger::new()
            .filter(filter)
            .unwrap()
            .formater(formater)
            .log_to_stdout()
            .map_err(|e| eprintln!("failed to init nonblock_logger: {:?}", e))
            .unwrap();

        info!("opt: {:?}", opt);

        (handle, opt)
    }
}

use nonblock_logger::{
    log::{LevelFilter, Record},
    BaseFilter, BaseFormater, FixedLevel, JoinHandle, NonblockLogger,
};

pub fn format(base: &BaseFormater, record: &Record) -> String {
    let level = FixedLevel::with_color(record.level(), base.color_get())
        .length(base.level_get())
        .into_colored()
        .into_coloredfg();

    format!(
        "[{} {}#{}:{} {}] {}\n",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S.%3f"),
        level,
        record.module_path().unwrap_or("*"),
        record.line().unwrap_or(0),
        nonblock_logger::current_thread_name(),
        record.args()
    )
}
