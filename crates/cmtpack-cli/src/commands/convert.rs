//! Convert command

use anyhow::{Context, Result};
use cmtpack_core::{Config, Converter};

/// Run the convert command
pub fn run(config_path: &str, package: bool) -> Result<()> {
    let config = Config::load(config_path).context("Failed to load configuration")?;

    let report = Converter::new(config)
        .convert(package)
        .context("Conversion failed")?;

    println!(
        "Wrote {} ({} entities, {} records)",
        report.data_path.display(),
        report.entities,
        report.records
    );
    if let Some(summary) = &report.package {
        println!(
            "Wrote {} ({} bytes, sha256 {})",
            summary.path.display(),
            summary.size,
            summary.sha256
        );
    }

    if report.diagnostics.is_empty() {
        println!("No warnings");
    } else {
        print!("{}", report.diagnostics);
        println!("{} warnings", report.diagnostics.len());
    }
    Ok(())
}
