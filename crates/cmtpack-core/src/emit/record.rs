//! Entity table -> `<entity>` subtree

use indexmap::IndexMap;

use super::{
    ACTIVITY_POINTER_ENTITY, DEFAULT_OWNER_ENTITY, ENTITY, FIELD, Lookup, M2M_RELATIONSHIPS,
    PARTY_RECORD, RECORD, RECORDS, field_element,
};
use crate::error::{Error, Result};
use crate::ids::IdGenerator;
use crate::naming;
use crate::partylist::{
    ACTIVITY_PARTY_ID_COLUMN, ACTIVITY_POINTER_COLUMN, PARTY_ENTITY_REFERENCE_COLUMN,
    PARTY_ID_COLUMN, PartyListIndex,
};
use crate::schema::{EntityMeta, FieldMeta, FieldType, SchemaIndex};
use crate::table::{Row, Table};
use crate::value::{RawValue, normalize_datetime};
use crate::xml::Element;

/// Emits `<entity>` subtrees for entity tables
pub struct RecordEmitter<'a> {
    schema: &'a SchemaIndex,
    party_lists: &'a PartyListIndex<'a>,
    ids: &'a mut dyn IdGenerator,
}

impl<'a> RecordEmitter<'a> {
    /// Create an emitter over a schema and a prebuilt party-list index
    pub fn new(
        schema: &'a SchemaIndex,
        party_lists: &'a PartyListIndex<'a>,
        ids: &'a mut dyn IdGenerator,
    ) -> Self {
        Self {
            schema,
            party_lists,
            ids,
        }
    }

    /// Build the `<entity>` element for one entity table.
    ///
    /// Fails when a row has no primary-key value.
    pub fn emit_entity(&mut self, entity: &EntityMeta, table: &Table) -> Result<Element> {
        let mut entity_el = Element::new(ENTITY)
            .with_attr("name", &entity.name)
            .with_attr("displayname", &entity.display_name);

        let records = entity_el.push(Element::new(RECORDS));
        let with_party_lists = self.party_lists.has_entity(&entity.name);

        for (index, row) in table.rows.iter().enumerate() {
            let record_id = record_id(entity, row, index)?;
            let record = records.push(Element::new(RECORD).with_attr("id", &record_id));

            self.emit_fields(record, &entity.name, row);
            if with_party_lists {
                self.emit_party_lists(record, &entity.name, &record_id);
            }
        }

        tracing::debug!(
            "Emitted {} records for entity '{}'",
            table.len(),
            entity.name
        );

        entity_el.push(Element::new(M2M_RELATIONSHIPS));
        Ok(entity_el)
    }

    fn emit_fields(&self, record: &mut Element, entity: &str, row: &Row) {
        let overrides = lookup_overrides(row);

        for (column, value) in row {
            if naming::is_entity_reference_column(column) || value.is_null() {
                continue;
            }
            let lookup = resolve_lookup(
                self.schema.field(entity, column),
                overrides.get(column.as_str()).map(String::as_str),
            );
            record.push(field_element(column, &field_text(value), lookup));
        }
    }

    fn emit_party_lists(&mut self, record: &mut Element, entity: &str, record_id: &str) {
        let party_lists = self.party_lists;

        for (field_name, participants) in party_lists.fields_for(entity, record_id) {
            let container = record.push(
                Element::new(FIELD)
                    .with_attr("name", field_name)
                    .with_attr("value", "")
                    .with_attr("lookupentity", "")
                    .with_attr("lookupentityname", ""),
            );

            for participant in participants {
                let party_record_id = self.participant_id(participant);
                let party_record =
                    container.push(Element::new(PARTY_RECORD).with_attr("id", &party_record_id));

                let party_target = participant
                    .get(PARTY_ENTITY_REFERENCE_COLUMN)
                    .filter(|v| !v.is_null())
                    .map(RawValue::to_canonical);
                let party_lookup = party_target
                    .as_deref()
                    .map(naming::first_lookup_token)
                    .filter(|t| !t.is_empty())
                    .map(Lookup::to_entity);
                let party_id = participant
                    .get(PARTY_ID_COLUMN)
                    .map(RawValue::to_canonical)
                    .unwrap_or_default();

                party_record.push(field_element(PARTY_ID_COLUMN, &party_id, party_lookup));
                party_record.push(field_element(
                    "activityid",
                    record_id,
                    Some(Lookup::to_entity(ACTIVITY_POINTER_ENTITY)),
                ));
                party_record.push(field_element(
                    ACTIVITY_PARTY_ID_COLUMN,
                    &party_record_id,
                    None,
                ));
            }
        }
    }

    /// Provided participant record id, or a fresh one
    fn participant_id(&mut self, participant: &Row) -> String {
        [ACTIVITY_POINTER_COLUMN, ACTIVITY_PARTY_ID_COLUMN]
            .iter()
            .filter_map(|column| participant.get(*column))
            .map(RawValue::to_canonical)
            .find(|id| !id.is_empty())
            .unwrap_or_else(|| self.ids.next_id())
    }
}

fn record_id(entity: &EntityMeta, row: &Row, index: usize) -> Result<String> {
    row.get(entity.primary_key.as_str())
        .map(RawValue::to_canonical)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| Error::MissingPrimaryKey {
            entity: entity.name.clone(),
            primary_key: entity.primary_key.clone(),
            row: index,
        })
}

/// Base field -> lookup entity taken from `<field>_entityreference` columns.
///
/// Any non-null cell counts, blank text included.
fn lookup_overrides(row: &Row) -> IndexMap<&str, String> {
    let mut overrides = IndexMap::new();
    for (column, value) in row {
        let Some(base) = naming::entity_reference_base(column) else {
            continue;
        };
        if value.is_null() {
            continue;
        }
        let hint = value.to_canonical();
        overrides.insert(base, naming::first_lookup_token(&hint).to_string());
    }
    overrides
}

/// Lookup target of a reference-typed field.
///
/// Preference: row override, first declared lookup type, `systemuser` for
/// owner fields. A present override wins even when blank, which leaves the
/// field without lookup attributes. Untyped and non-reference fields get no
/// lookup.
fn resolve_lookup<'x>(
    meta: Option<&'x FieldMeta>,
    row_override: Option<&'x str>,
) -> Option<Lookup<'x>> {
    let meta = meta?;
    let field_type = meta.field_type.as_ref()?;
    if !field_type.is_reference() {
        return None;
    }

    let entity = match row_override {
        Some(entity) => entity,
        None => match meta.lookup_type.as_deref().filter(|hint| !hint.is_empty()) {
            Some(hint) => naming::first_lookup_token(hint),
            None if *field_type == FieldType::Owner => DEFAULT_OWNER_ENTITY,
            None => return None,
        },
    };
    (!entity.is_empty()).then(|| Lookup::to_entity(entity))
}

fn field_text(value: &RawValue) -> String {
    match value {
        RawValue::Text(_) => normalize_datetime(&value.to_canonical()),
        other => other.to_canonical(),
    }
}
