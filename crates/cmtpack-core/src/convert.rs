//! End-to-end conversion pipeline
//!
//! ```text
//! cmtpack.yaml -> schema + tables -> column selection -> document -> data.xml -> data.zip
//! ```

use chrono::{DateTime, Utc};
use std::fs;
use std::path::PathBuf;

use crate::config::Config;
use crate::diagnostics::Diagnostics;
use crate::document::{DocumentBuilder, Generated};
use crate::error::Result;
use crate::filter::filter_tables;
use crate::ids::{IdGenerator, UuidGenerator};
use crate::package::{PackageSummary, create_package};
use crate::schema::SchemaIndex;
use crate::table::TableSet;

/// Schema and raw tables of a project
#[derive(Debug, Clone)]
pub struct Inputs {
    /// Parsed schema
    pub schema: SchemaIndex,
    /// Tables as loaded, before column selection
    pub tables: TableSet,
}

impl Inputs {
    /// Load the schema and table directory named by the configuration
    pub fn load(config: &Config) -> Result<Self> {
        let schema = SchemaIndex::load(config.schema_path())?;
        let tables = TableSet::load_dir(config.tables_dir())?;
        tracing::info!(
            "Loaded {} tables from {}",
            tables.len(),
            config.tables_dir().display()
        );
        Ok(Self { schema, tables })
    }
}

/// Result of a conversion run
#[derive(Debug)]
pub struct ConversionReport {
    /// Written data document
    pub data_path: PathBuf,

    /// Written package, unless packaging was skipped
    pub package: Option<PackageSummary>,

    /// Number of `<entity>` elements
    pub entities: usize,

    /// Number of `<record>` elements across all entities
    pub records: usize,

    /// Warnings from column selection and generation
    pub diagnostics: Diagnostics,
}

/// Runs the conversion for one project
pub struct Converter {
    config: Config,
    ids: Box<dyn IdGenerator>,
    timestamp: Option<DateTime<Utc>>,
}

impl Converter {
    /// Converter with random participant ids and the current time
    pub fn new(config: Config) -> Self {
        Self {
            config,
            ids: Box::new(UuidGenerator),
            timestamp: None,
        }
    }

    /// Use a custom id generator for participants without ids
    pub fn with_ids(mut self, ids: impl IdGenerator + 'static) -> Self {
        self.ids = Box::new(ids);
        self
    }

    /// Use a fixed document timestamp
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Project configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Select columns and build the document in memory.
    ///
    /// The returned diagnostics include column selection warnings.
    pub fn generate(self, inputs: &Inputs) -> Result<Generated> {
        let mut diagnostics = Diagnostics::new();
        let filtered = filter_tables(
            &inputs.tables,
            &self.config.project.columns,
            &inputs.schema,
            &mut diagnostics,
        );

        let mut builder = DocumentBuilder::new(&inputs.schema).with_ids(self.ids);
        if let Some(timestamp) = self.timestamp {
            builder = builder.with_timestamp(timestamp);
        }
        let generated = builder.generate(&inputs.tables, &filtered)?;

        diagnostics.extend(generated.diagnostics);
        Ok(Generated {
            document: generated.document,
            diagnostics,
        })
    }

    /// Load inputs, write the data document and, if `package` is set, the
    /// import package.
    pub fn convert(self, package: bool) -> Result<ConversionReport> {
        let config = self.config.clone();
        tracing::info!("Converting project '{}'", config.project.name);

        let inputs = Inputs::load(&config)?;
        let generated = self.generate(&inputs)?;

        let entities = generated.document.children.len();
        let records = generated
            .document
            .children
            .iter()
            .filter_map(|entity| entity.child("records"))
            .map(|records| records.children.len())
            .sum();

        let data_path = config.data_path();
        fs::create_dir_all(config.output_dir())?;
        fs::write(&data_path, generated.document.to_xml_string()?)?;
        tracing::info!("Wrote {}", data_path.display());

        let package = if package {
            Some(create_package(
                &config.archive_path(),
                &config.project.data_file,
                &data_path,
                &config.schema_path(),
            )?)
        } else {
            None
        };

        Ok(ConversionReport {
            data_path,
            package,
            entities,
            records,
            diagnostics: generated.diagnostics,
        })
    }
}
