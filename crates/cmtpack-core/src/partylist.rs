//! Party-list index
//!
//! Activities (appointments, phone calls, ...) list their participants in
//! separate `partylist_<entity>` tables, one row per participant:
//!
//! | activityid | entityField       | partyid | partyid_entityreference | activitypointerrecordid |
//! |------------|-------------------|---------|-------------------------|-------------------------|
//! | A1         | requiredattendees | C1      | contact                 | P1                      |
//!
//! The index groups those rows as entity -> activity id -> field name ->
//! participant rows, preserving table order at every level. It is built from
//! the unfiltered tables once per run and only read afterwards.

use indexmap::IndexMap;

use crate::diagnostics::{Diagnostics, Warning};
use crate::naming;
use crate::schema::SchemaIndex;
use crate::table::{Row, TableSet};

/// Participant lookup target, e.g. `contact` or `account|contact`
pub const PARTY_ENTITY_REFERENCE_COLUMN: &str = "partyid_entityreference";
/// Activity field the participant belongs to, e.g. `requiredattendees`
pub const FIELD_COLUMN: &str = "entityField";
/// Identifier of the participant record itself
pub const ACTIVITY_POINTER_COLUMN: &str = "activitypointerrecordid";
/// Fallback identifier of the participant record
pub const ACTIVITY_PARTY_ID_COLUMN: &str = "activitypartyid";
/// Owning activity record id
pub const ACTIVITY_ID_COLUMN: &str = "activityid";
/// Referenced participant id
pub const PARTY_ID_COLUMN: &str = "partyid";

const REQUIRED_COLUMNS: [&str; 5] = [
    PARTY_ENTITY_REFERENCE_COLUMN,
    FIELD_COLUMN,
    ACTIVITY_POINTER_COLUMN,
    ACTIVITY_ID_COLUMN,
    PARTY_ID_COLUMN,
];

type FieldRows<'a> = IndexMap<String, Vec<&'a Row>>;

/// Participant rows keyed by entity, activity id and field name
#[derive(Debug, Default)]
pub struct PartyListIndex<'a> {
    entities: IndexMap<String, IndexMap<String, FieldRows<'a>>>,
}

impl<'a> PartyListIndex<'a> {
    /// Index every `partylist_` table whose entity is declared in the schema.
    ///
    /// Tables missing any required column are skipped entirely with a
    /// warning. Rows without an activity id or field name are ignored.
    pub fn build(
        tables: &'a TableSet,
        schema: &SchemaIndex,
        diagnostics: &mut Diagnostics,
    ) -> Self {
        let mut index = Self::default();

        for table in tables {
            let Some(entity) = naming::partylist_entity(&table.name) else {
                continue;
            };
            if !schema.is_entity(entity) {
                tracing::debug!(
                    "Ignoring party-list table '{}': entity '{}' not in schema",
                    table.name,
                    entity
                );
                continue;
            }

            let mut missing: Vec<String> = REQUIRED_COLUMNS
                .iter()
                .filter(|c| !table.has_column(c))
                .map(|c| c.to_string())
                .collect();
            if !missing.is_empty() {
                missing.sort();
                diagnostics.warn(Warning::PartyListMissingColumns {
                    table: table.name.clone(),
                    missing,
                });
                continue;
            }

            let by_activity = index.entities.entry(entity.to_string()).or_default();
            let mut indexed = 0usize;
            for row in &table.rows {
                let (Some(activity_id), Some(field)) = (
                    present(row, ACTIVITY_ID_COLUMN),
                    present(row, FIELD_COLUMN),
                ) else {
                    continue;
                };
                by_activity
                    .entry(activity_id)
                    .or_default()
                    .entry(field)
                    .or_default()
                    .push(row);
                indexed += 1;
            }
            tracing::debug!(
                "Indexed {} participants from '{}' for entity '{}'",
                indexed,
                table.name,
                entity
            );
        }

        index
    }

    /// Whether any party-list table was indexed for the entity
    pub fn has_entity(&self, entity: &str) -> bool {
        self.entities.contains_key(entity)
    }

    /// Field name -> participant rows for one activity record, in insertion order
    pub fn fields_for(
        &self,
        entity: &str,
        record_id: &str,
    ) -> impl Iterator<Item = (&str, &[&'a Row])> {
        self.entities
            .get(entity)
            .and_then(|activities| activities.get(record_id))
            .into_iter()
            .flat_map(|fields| fields.iter().map(|(k, v)| (k.as_str(), v.as_slice())))
    }

    /// Participant rows for one (entity, record, field) triple
    pub fn participants(&self, entity: &str, record_id: &str, field: &str) -> &[&'a Row] {
        self.entities
            .get(entity)
            .and_then(|activities| activities.get(record_id))
            .and_then(|fields| fields.get(field))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// Canonical string of a non-null cell
fn present(row: &Row, column: &str) -> Option<String> {
    row.get(column)
        .filter(|v| !v.is_null())
        .map(|v| v.to_canonical())
}
