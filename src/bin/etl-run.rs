use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use customer_order_etl::config::EtlConfig;
use customer_order_etl::ingestion::{CompositeObserver, JsonFileObserver, PipelineObserver, TracingObserver};
use customer_order_etl::loader::SqliteConnector;
use customer_order_etl::pipeline::Pipeline;

#[derive(Parser)]
#[command(name = "etl-run")]
#[command(about = "Clean customer (CSV) and order (XML) files and append them to the database")]
struct Cli {
    /// Path to the customers CSV file
    #[arg(long)]
    customers: PathBuf,
    /// Path to the orders XML file
    #[arg(long)]
    orders: PathBuf,
    /// Optional TOML config file (ETL_* environment variables override it)
    #[arg(long)]
    config: Option<PathBuf>,
    /// SQLite database file; overrides config and environment
    #[arg(long)]
    database: Option<PathBuf>,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn load_config(cli: &Cli) -> Result<EtlConfig, customer_order_etl::ConfigError> {
    let base = match &cli.config {
        Some(path) => EtlConfig::from_path(path)?,
        None => EtlConfig::default(),
    };
    let mut config = base.with_env_overrides()?;
    if let Some(db) = &cli.database {
        config.database_path = db.clone();
    }
    Ok(config)
}

fn main() -> ExitCode {
    dotenv::dotenv().ok();
    init_logging();
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(c) => c,
        Err(e) => {
            error!("configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };
    let options = match config.pipeline_options() {
        Ok(o) => o,
        Err(e) => {
            error!("configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut observers: Vec<Arc<dyn PipelineObserver>> = vec![Arc::new(TracingObserver)];
    if let Some(path) = &config.log_file {
        observers.push(Arc::new(JsonFileObserver::new(path)));
    }
    let observer: Arc<dyn PipelineObserver> = Arc::new(CompositeObserver::new(observers));

    let connector = SqliteConnector::new(&config.database_path);
    let mut pipeline = Pipeline::with_options(connector, observer, options);

    info!(
        customers = %cli.customers.display(),
        orders = %cli.orders.display(),
        database = %config.database_path.display(),
        "starting ETL pipeline"
    );
    match pipeline.run(&cli.customers, &cli.orders) {
        Ok(summary) => {
            info!(
                customers_loaded = summary.customers_loaded,
                orders_loaded = summary.orders_loaded,
                "ETL pipeline completed"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("pipeline failed: {e}");
            ExitCode::FAILURE
        }
    }
}
