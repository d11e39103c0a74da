use std::path::PathBuf;

use console::style;

use crate::cli::commands::ValidateArgs;
use crate::config;
use crate::config::credentials::mask_key;
use crate::errors::ScrapeError;
use crate::schema::catalog::schema_names;

pub async fn handle_validate(args: ValidateArgs) -> Result<(), ScrapeError> {
    let settings = config::parse_config(&PathBuf::from(&args.config)).await?;
    println!("{} {}", style("Configuration is valid:").green(), args.config);
    println!("  provider {}  model {}", settings.llm.provider, settings.llm.model);
    match settings.llm.api_key.as_deref() {
        Some(key) => println!("  api key  {}", mask_key(key)),
        None => println!("  api key  {}", style("not set").yellow()),
    }
    println!("  database {}", settings.storage.database.display());
    println!("  schemas  {}", schema_names().join(", "));
    Ok(())
}
