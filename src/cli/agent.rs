use console::style;
use tracing::info;

use crate::api::models::AgentBody;
use crate::cli::commands::AgentArgs;
use crate::errors::ScrapeError;
use crate::models::AgentExecutionResponse;
use crate::runtime::Runtime;
use crate::utils::formatting::{format_cost, format_duration_secs};

pub async fn handle_agent(args: AgentArgs, runtime: Runtime) -> Result<(), ScrapeError> {
    let body = AgentBody {
        url: args.url,
        goal: args.goal,
        schema: args.schema,
        max_steps: args.max_steps,
        openai_api_key: args.api_key,
        openai_model: args.model,
    };
    let request = body.into_request()?;
    info!(url = %request.url, max_steps = request.max_steps, "Starting agent run");

    let response = runtime.agent.run(&request).await?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        print_run(&response)?;
    }

    if response.success {
        Ok(())
    } else {
        let message = response.metadata.error.clone().unwrap_or_else(|| "agent run produced no data".into());
        Err(super::failure(response.metadata.error_type, message))
    }
}

fn print_run(response: &AgentExecutionResponse) -> Result<(), ScrapeError> {
    let meta = &response.metadata;
    for step in &response.steps {
        let mark = if step.success { style("✓").green() } else { style("✗").red() };
        let target = step.action.target.as_deref().or(step.action.value.as_deref()).unwrap_or("");
        println!(
            "{} {:>2} {:?} {} -> {}",
            mark,
            step.step_index,
            step.action.action,
            target,
            style(&step.current_url).dim()
        );
        if let Some(error) = &step.error {
            println!("      {}", style(error).yellow());
        }
    }
    println!(
        "{} execution {}  stop: {}  tokens {}  cost {}  took {}",
        if response.success { style("OK").green().bold() } else { style("FAILED").red().bold() },
        response.execution_id,
        meta.stop.reason.as_deref().unwrap_or("-"),
        meta.tokens_used,
        format_cost(meta.cost_usd),
        format_duration_secs(meta.duration_seconds),
    );
    for err in &meta.validation_errors {
        println!("    - {}", err);
    }
    if let Some(data) = &response.data {
        println!("{}", serde_json::to_string_pretty(data)?);
    }
    Ok(())
}
