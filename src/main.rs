use std::env;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use order_duplicate_analyzer::config::{self, AnalyzerConfig};
use order_duplicate_analyzer::services::report::Report;
use order_duplicate_analyzer::services::supabase::SupabaseService;
use order_duplicate_analyzer::AnalyzerError;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Logs go to stderr so the report on stdout stays clean
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,order_duplicate_analyzer=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = env::args().collect();
    if args.iter().skip(1).any(|a| a == "-h" || a == "--help") {
        println!("Usage: {} [ORDER_ID ...]", args[0]);
        println!("Example: {} 32 33 34", args[0]);
        println!();
        println!("Environment: SUPABASE_URL, SUPABASE_ANON_KEY (required),");
        println!("             ORDERS_TABLE, ORDER_IDS (optional; read from .env if present)");
        return ExitCode::SUCCESS;
    }

    match run(args.into_iter().skip(1)).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is_config() => {
            tracing::error!("Configuration error: {}", e);
            println!("Configuration error: {}", e);
            ExitCode::FAILURE
        }
        Err(e) => {
            tracing::error!("Query failed: {}", e);
            println!("Error querying orders: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: impl Iterator<Item = String>) -> Result<(), AnalyzerError> {
    let cli_ids = config::parse_cli_ids(args)?;

    let mut config = AnalyzerConfig::from_env()?;
    if let Some(ids) = cli_ids {
        config = config.with_order_ids(ids);
    }

    tracing::info!("Analyzing orders {:?} from table '{}'", config.order_ids, config.table);

    let supabase = SupabaseService::new(&config)?;
    let orders = supabase.fetch_orders_by_ids(&config.order_ids).await?;

    // Rendered only after a successful fetch, never partially
    print!("{}", Report::new(&config.order_ids, &orders));

    Ok(())
}
