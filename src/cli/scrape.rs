use console::style;
use serde_json::Map;
use tracing::info;

use crate::api::models::ScrapeBody;
use crate::browser::ScrollStrategy;
use crate::cli::commands::ScrapeArgs;
use crate::errors::ScrapeError;
use crate::models::AttemptResult;
use crate::runtime::Runtime;
use crate::utils::formatting::{format_cost, format_duration_secs};

pub fn body_from_args(url: &str, args: &ScrapeArgs) -> ScrapeBody {
    ScrapeBody {
        schema: args.schema.clone(),
        prompt: args.prompt.clone(),
        user_prompt: args.goal.clone(),
        wait_until: args.wait_until.clone(),
        timeout: args.timeout,
        full_page: args.full_page,
        screenshot_quality: args.quality,
        auto_scroll: !args.no_scroll,
        scroll_strategy: if args.enrich_list { ScrollStrategy::ListEnrichment } else { ScrollStrategy::Smart },
        block_resources: args.block_resources,
        execute_js: args.execute_js.clone(),
        output_format: args.output.clone(),
        openai_api_key: args.api_key.clone(),
        openai_model: args.model.clone(),
        extra_metadata: Map::new(),
        ..ScrapeBody::new(url)
    }
}

pub async fn handle_scrape(args: ScrapeArgs, runtime: Runtime) -> Result<(), ScrapeError> {
    let requests = args.urls.iter()
        .map(|url| body_from_args(url, &args).into_request())
        .collect::<Result<Vec<_>, _>>()?;
    info!(count = requests.len(), schema = %args.schema, "Starting scrape");

    let concurrency = runtime.settings.scraping.max_concurrent_tasks;
    let results = runtime.orchestrator.scrape_many(&requests, concurrency).await;
    if args.json {
        let out = if results.len() == 1 { serde_json::to_value(&results[0])? } else { serde_json::to_value(&results)? };
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        for result in &results {
            print_summary(result)?;
        }
    }

    // The exit status reflects the first failure.
    match results.iter().find(|r| !r.success) {
        None => Ok(()),
        Some(failed) => {
            let message = failed.error.clone().unwrap_or_else(|| "scrape failed".into());
            Err(super::failure(failed.error_kind(), message))
        }
    }
}

fn print_summary(result: &AttemptResult) -> Result<(), ScrapeError> {
    let meta = &result.metadata;
    let status = if result.success { style("OK").green().bold() } else { style("FAILED").red().bold() };
    println!("{} {}", status, style(&meta.url).cyan());
    println!(
        "  model {}  tokens {}  cost {}  took {}",
        meta.model_used.as_deref().unwrap_or("-"),
        meta.tokens_used,
        format_cost(meta.cost_usd),
        format_duration_secs(meta.duration_seconds),
    );
    if let Some(quality) = &meta.quality {
        println!("  quality {:.0}/100", quality.score);
    }
    if let Some(id) = result.record_id {
        println!("  record #{}", id);
    }
    if let Some(error) = &result.error {
        let kind = meta.error_type.map(|k| k.to_string()).unwrap_or_else(|| "unknown".into());
        println!("  {} [{}] {}", style("error").red(), kind, error);
    }
    for err in &result.validation_errors {
        println!("    - {}", err);
    }
    if let Some(data) = &result.data {
        println!("{}", serde_json::to_string_pretty(data)?);
    }
    Ok(())
}
