//! List tables command

use anyhow::{Context, Result};
use cmtpack_core::{Config, Inputs, TableKind};

/// Run the tables command
pub fn run(config_path: &str) -> Result<()> {
    let config = Config::load(config_path).context("Failed to load configuration")?;
    let inputs = Inputs::load(&config).context("Failed to load schema and tables")?;

    if inputs.tables.is_empty() {
        println!("No tables in {}", config.tables_dir().display());
        return Ok(());
    }

    for table in &inputs.tables {
        let kind = TableKind::classify(&inputs.schema, &table.name);
        println!(
            "{} [{}] {} rows: {}",
            table.name,
            kind,
            table.len(),
            table.columns.join(", ")
        );
    }
    Ok(())
}
