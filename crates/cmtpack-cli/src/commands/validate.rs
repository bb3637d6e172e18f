//! Validate project command

use anyhow::{Context, Result};
use cmtpack_core::{Config, Converter, Inputs};

/// Run the validate command
///
/// Generates the document in memory; nothing is written.
pub fn run(config_path: &str) -> Result<()> {
    tracing::info!("Validating project: {}", config_path);

    let config = Config::load(config_path).context("Failed to load configuration")?;
    tracing::info!("✓ Project: {}", config.project.name);

    let inputs = Inputs::load(&config).context("Failed to load schema and tables")?;
    tracing::info!(
        "✓ Schema: {} entities, {} many-to-many relationships",
        inputs.schema.entities().count(),
        inputs.schema.relationships().count()
    );
    tracing::info!("✓ Tables: {}", inputs.tables.len());

    let generated = Converter::new(config)
        .generate(&inputs)
        .context("Document generation failed")?;

    if generated.diagnostics.is_empty() {
        println!("Project is valid");
    } else {
        print!("{}", generated.diagnostics);
        println!(
            "Project is valid with {} warnings",
            generated.diagnostics.len()
        );
    }
    Ok(())
}
