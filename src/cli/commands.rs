use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "pagelens", version, about = "Screenshot-driven structured extraction with an autonomous browsing agent")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// YAML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Capture a page and extract structured data from it
    Scrape(ScrapeArgs),
    /// Let the browsing agent pursue a goal, then extract from what it saw
    Agent(AgentArgs),
    /// List recent scrape attempts
    History(HistoryArgs),
    /// Start the HTTP API server
    Serve(ServeArgs),
    /// Validate a configuration file
    Validate(ValidateArgs),
}

#[derive(Args, Clone)]
pub struct ScrapeArgs {
    /// Page URLs, scraped concurrently
    #[arg(required = true)]
    pub urls: Vec<String>,

    /// Extraction schema name
    #[arg(short, long, default_value = "generic_list")]
    pub schema: String,

    /// Prompt preset: generic, ecommerce, news
    #[arg(long)]
    pub prompt: Option<String>,

    /// Free-text extraction goal
    #[arg(short, long)]
    pub goal: Option<String>,

    /// Output style: list, summary, report
    #[arg(long, default_value = "list")]
    pub output: String,

    /// Load state to wait for: load, domcontentloaded, networkidle, commit
    #[arg(long, default_value = "networkidle")]
    pub wait_until: String,

    /// Navigation timeout in milliseconds
    #[arg(long, default_value = "30000")]
    pub timeout: u64,

    /// Capture the full scrollable page
    #[arg(long)]
    pub full_page: bool,

    /// JPEG quality (30-100)
    #[arg(long, default_value = "70")]
    pub quality: u32,

    /// Disable scrolling before capture
    #[arg(long)]
    pub no_scroll: bool,

    /// Open list entries one by one and collect their detail text
    #[arg(long)]
    pub enrich_list: bool,

    /// Abort image, media and font requests
    #[arg(long)]
    pub block_resources: bool,

    /// Script evaluated on the page before capture
    #[arg(long)]
    pub execute_js: Option<String>,

    /// Model override for this request
    #[arg(long)]
    pub model: Option<String>,

    /// API key override for this request
    #[arg(long)]
    pub api_key: Option<String>,

    /// Print the full result as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Clone)]
pub struct AgentArgs {
    /// Start URL
    pub url: String,

    /// What the agent should find
    #[arg(short, long)]
    pub goal: String,

    /// Extraction schema name
    #[arg(short, long, default_value = "guided_extract")]
    pub schema: String,

    /// Step budget (1-30)
    #[arg(long, default_value = "8")]
    pub max_steps: u32,

    /// Model override for this run
    #[arg(long)]
    pub model: Option<String>,

    /// API key override for this run
    #[arg(long)]
    pub api_key: Option<String>,

    /// Print the full response as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Clone)]
pub struct HistoryArgs {
    /// Number of records to show
    #[arg(short, long, default_value = "20")]
    pub limit: usize,

    /// Only successful attempts
    #[arg(long, conflicts_with = "failed")]
    pub succeeded: bool,

    /// Only failed attempts
    #[arg(long)]
    pub failed: bool,

    /// Filter by domain substring
    #[arg(short, long)]
    pub domain: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Clone)]
pub struct ServeArgs {
    /// Listen port
    #[arg(long, default_value = "8000")]
    pub port: u16,

    /// Listen address
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// SQLite database path (overrides config)
    #[arg(long)]
    pub db: Option<String>,
}

#[derive(Args, Clone)]
pub struct ValidateArgs {
    /// Config file to validate
    pub config: String,
}
