//! Conversion warnings
//!
//! Input anomalies that do not stop a conversion are recorded here and
//! logged at `warn` level. Callers get the collected list back with the
//! result so they can report (or assert on) what was skipped.

use std::fmt;

use thiserror::Error;

/// A recoverable problem found while converting
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// A party-list table lacks columns needed to index participants
    #[error("party-list table '{table}' missing columns: {}", .missing.join(", "))]
    PartyListMissingColumns {
        /// Table name
        table: String,
        /// Missing column names, sorted
        missing: Vec<String>,
    },

    /// The source entity of a many-to-many table was not emitted
    #[error("entity '{source_entity}' not found for many-to-many relationship '{relationship}'")]
    RelationshipSourceMissing {
        /// Relationship name
        relationship: String,
        /// Expected source entity
        source_entity: String,
    },

    /// A relationship table lacks its source or target key column
    #[error("relationship table '{table}' missing columns: {}", .missing.join(", "))]
    RelationshipMissingColumns {
        /// Table name
        table: String,
        /// Missing key columns
        missing: Vec<String>,
    },

    /// An `m2m_` table names a relationship the schema does not declare
    #[error("no many-to-many metadata for table '{table}'")]
    UnknownRelationship {
        /// Table name
        table: String,
    },

    /// A table matches neither an entity nor a relationship
    #[error("unrecognized table: {table}")]
    UnrecognizedTable {
        /// Table name
        table: String,
    },

    /// Column selection left a table without columns
    #[error("no columns selected for table '{table}'")]
    NoColumnsSelected {
        /// Table name
        table: String,
    },
}

/// Collected warnings of one conversion run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Create an empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Record and log a warning
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!("{}", warning);
        self.warnings.push(warning);
    }

    /// Recorded warnings in order
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Number of warnings
    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    /// Whether nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Append another collection
    pub fn extend(&mut self, other: Diagnostics) {
        self.warnings.extend(other.warnings);
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for warning in &self.warnings {
            writeln!(f, "warning: {warning}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warning_messages() {
        let w = Warning::PartyListMissingColumns {
            table: "partylist_appointment".to_string(),
            missing: vec!["activityid".to_string(), "partyid".to_string()],
        };
        assert_eq!(
            w.to_string(),
            "party-list table 'partylist_appointment' missing columns: activityid, partyid"
        );

        let w = Warning::UnrecognizedTable {
            table: "notes".to_string(),
        };
        assert_eq!(w.to_string(), "unrecognized table: notes");
    }

    #[test]
    fn test_collects_in_order() {
        let mut diagnostics = Diagnostics::new();
        assert!(diagnostics.is_empty());
        diagnostics.warn(Warning::UnrecognizedTable {
            table: "a".to_string(),
        });
        diagnostics.warn(Warning::UnknownRelationship {
            table: "m2m_b".to_string(),
        });
        assert_eq!(diagnostics.len(), 2);
        assert!(matches!(
            diagnostics.warnings()[1],
            Warning::UnknownRelationship { .. }
        ));
        assert_eq!(
            diagnostics.to_string(),
            "warning: unrecognized table: a\nwarning: no many-to-many metadata for table 'm2m_b'\n"
        );
    }
}
