use clap::Parser;
use pagelens::cli::{self, Commands};
use pagelens::errors::ScrapeError;
use pagelens::runtime::Runtime;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();

    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));

    if cli.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_ansi(!cli.no_color)
            .with_writer(std::io::stderr)
            .init();
    }
    if cli.no_color {
        console::set_colors_enabled(false);
    }

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(exit_code(&e));
    }
}

async fn run(cli: cli::Cli) -> Result<(), ScrapeError> {
    let command = match cli.command {
        Commands::Validate(args) => return cli::validate::handle_validate(args).await,
        other => other,
    };

    let settings = cli::settings_for(cli.config.as_deref()).await?;
    match command {
        Commands::Scrape(args) => cli::scrape::handle_scrape(args, Runtime::from_settings(settings)?).await,
        Commands::Agent(args) => cli::agent::handle_agent(args, Runtime::from_settings(settings)?).await,
        Commands::History(args) => {
            let db = pagelens::db::Database::new(&settings.storage.database.to_string_lossy())?;
            cli::history::handle_history(args, &db)
        }
        Commands::Serve(args) => cli::serve::handle_serve(args, settings).await,
        Commands::Validate(_) => Ok(()),
    }
}

fn exit_code(error: &ScrapeError) -> i32 {
    match error {
        ScrapeError::Config(_) => 2,
        ScrapeError::Database(_) => 3,
        ScrapeError::ModelAuth(_) => 4,
        ScrapeError::Validation(_) => 5,
        ScrapeError::Blocked(_) | ScrapeError::CircuitOpen(_) => 6,
        _ => 1,
    }
}
