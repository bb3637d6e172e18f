//! cmtpack Core Library
//!
//! This crate converts tabular exports into CMT data packages:
//! - Configuration parsing and validation
//! - Table loading and column selection
//! - Schema-driven XML generation (records, lookups, party lists,
//!   many-to-many links)
//! - ZIP packaging with the content-types manifest
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   Tables    │────▶│   Column    │────▶│  Document   │────▶│   Package   │
//! │  XLSX/CSV   │     │  Selection  │     │  Assembler  │     │    (ZIP)    │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//!                                                ▲
//!                            schema + party-list index
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use cmtpack_core::{Config, Converter};
//!
//! let config = Config::load("./my-migration")?;
//! let report = Converter::new(config).convert(true)?;
//! println!("{} records, {} warnings", report.records, report.diagnostics.len());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod convert;
pub mod diagnostics;
pub mod document;
pub mod emit;
pub mod error;
pub mod filter;
pub mod ids;
pub mod naming;
pub mod package;
pub mod partylist;
pub mod schema;
pub mod table;
pub mod value;
pub mod xml;

pub use config::{Config, ProjectConfig};
pub use convert::{ConversionReport, Converter, Inputs};
pub use diagnostics::{Diagnostics, Warning};
pub use document::{DocumentBuilder, Generated, TableKind};
pub use error::{Error, Result};
pub use ids::{IdGenerator, SequentialIds, UuidGenerator};
pub use schema::SchemaIndex;
pub use table::{Row, Table, TableSet};
pub use value::{RawValue, normalize_datetime};
pub use xml::Element;
