use console::style;

use crate::cli::commands::HistoryArgs;
use crate::db::{Database, HistoryFilter};
use crate::errors::ScrapeError;
use crate::utils::formatting::{format_cost, format_duration_secs};

pub fn filter_from_args(args: &HistoryArgs) -> HistoryFilter {
    let success = match (args.succeeded, args.failed) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    };
    HistoryFilter { limit: args.limit, success, domain: args.domain.clone() }
}

pub fn handle_history(args: HistoryArgs, db: &Database) -> Result<(), ScrapeError> {
    let items = db.list_recent(&filter_from_args(&args))?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }
    if items.is_empty() {
        println!("No attempts recorded.");
        return Ok(());
    }
    for item in &items {
        let status = if item["success"].as_bool().unwrap_or(false) {
            style("ok").green()
        } else {
            style("fail").red()
        };
        let duration = item["payload"]["metadata"]["duration_seconds"].as_f64().unwrap_or(0.0);
        println!(
            "#{:<5} {:<4} {:<30} {:>8} {:>9} {:<10} {}",
            item["id"],
            status,
            item["domain"].as_str().unwrap_or("-"),
            format_duration_secs(duration),
            format_cost(item["cost_usd"].as_f64().unwrap_or(0.0)),
            item["error_type"].as_str().unwrap_or("-"),
            style(item["created_at"].as_str().unwrap_or("")).dim(),
        );
    }
    Ok(())
}
