//! Document assembly
//!
//! Drives one generation run: builds the party-list index from the raw
//! tables, orders the filtered tables so every entity subtree exists before
//! relationship tables look it up, and dispatches each table to the matching
//! emitter.

use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::fmt;

use crate::diagnostics::{Diagnostics, Warning};
use crate::emit::{RecordEmitter, emit_relationships};
use crate::error::Result;
use crate::ids::{IdGenerator, UuidGenerator};
use crate::naming;
use crate::partylist::PartyListIndex;
use crate::schema::SchemaIndex;
use crate::table::{Table, TableSet};
use crate::xml::Element;

/// Root element name
pub const ROOT: &str = "entities";

/// Fixed namespace declarations on the root element
pub const NAMESPACES: [(&str, &str); 2] = [
    ("xmlns:xsd", "http://www.w3.org/2001/XMLSchema"),
    ("xmlns:xsi", "http://www.w3.org/2001/XMLSchema-instance"),
];

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

/// How a table is treated during generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableKind {
    /// Records of a schema entity
    Entity,
    /// Link rows of the named many-to-many relationship
    Relationship(String),
    /// Participants consumed through the party-list index
    PartyList,
    /// `m2m_` table without relationship metadata
    UnknownRelationship,
    /// Anything else; skipped with a warning
    Unrecognized,
}

impl TableKind {
    /// Classify a table name against the schema
    pub fn classify(schema: &SchemaIndex, name: &str) -> Self {
        if naming::is_partylist_table(name) {
            return Self::PartyList;
        }
        if schema.is_entity(name) {
            return Self::Entity;
        }
        if schema.is_relationship(name) {
            return Self::Relationship(name.to_string());
        }
        match naming::m2m_relationship(name) {
            Some(rel) if schema.is_relationship(rel) => Self::Relationship(rel.to_string()),
            Some(_) => Self::UnknownRelationship,
            None => Self::Unrecognized,
        }
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Entity => write!(f, "entity"),
            Self::Relationship(name) => write!(f, "relationship {name}"),
            Self::PartyList => write!(f, "party list"),
            Self::UnknownRelationship => write!(f, "unknown relationship"),
            Self::Unrecognized => write!(f, "unrecognized"),
        }
    }
}

/// Output of a generation run
#[derive(Debug)]
pub struct Generated {
    /// The `<entities>` document root
    pub document: Element,

    /// Warnings recorded while generating
    pub diagnostics: Diagnostics,
}

/// Assembles the CMT data document from tables and a schema
pub struct DocumentBuilder<'a> {
    schema: &'a SchemaIndex,
    ids: Box<dyn IdGenerator>,
    timestamp: Option<DateTime<Utc>>,
}

impl<'a> DocumentBuilder<'a> {
    /// Builder with random participant ids and the current time
    pub fn new(schema: &'a SchemaIndex) -> Self {
        Self {
            schema,
            ids: Box::new(UuidGenerator),
            timestamp: None,
        }
    }

    /// Use a custom id generator for participants without ids
    pub fn with_ids(mut self, ids: impl IdGenerator + 'static) -> Self {
        self.ids = Box::new(ids);
        self
    }

    /// Use a fixed generation timestamp
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Generate the document.
    ///
    /// `raw` feeds the party-list index, `filtered` supplies the entity and
    /// relationship tables. Fails only on rows without a primary key.
    pub fn generate(mut self, raw: &TableSet, filtered: &TableSet) -> Result<Generated> {
        let timestamp = self.timestamp.unwrap_or_else(Utc::now);
        let mut diagnostics = Diagnostics::new();

        let mut root = Element::new(ROOT);
        for (key, value) in NAMESPACES {
            root.set_attr(key, value);
        }
        root.set_attr("timestamp", timestamp.format(TIMESTAMP_FORMAT).to_string());

        let ordered = self.ordered(filtered);
        let party_lists = PartyListIndex::build(raw, self.schema, &mut diagnostics);
        let mut records = RecordEmitter::new(self.schema, &party_lists, &mut *self.ids);

        for table in ordered {
            match TableKind::classify(self.schema, &table.name) {
                TableKind::Entity => {
                    if let Some(entity) = self.schema.entity(&table.name) {
                        let element = records.emit_entity(entity, table)?;
                        root.push(element);
                    }
                }
                TableKind::Relationship(name) => {
                    if let Some(relationship) = self.schema.relationship(&name) {
                        emit_relationships(&mut root, &name, relationship, table, &mut diagnostics);
                    }
                }
                TableKind::PartyList => {}
                TableKind::UnknownRelationship => diagnostics.warn(Warning::UnknownRelationship {
                    table: table.name.clone(),
                }),
                TableKind::Unrecognized => diagnostics.warn(Warning::UnrecognizedTable {
                    table: table.name.clone(),
                }),
            }
        }

        tracing::info!(
            "Generated document with {} entities ({} warnings)",
            root.children.len(),
            diagnostics.len()
        );

        Ok(Generated {
            document: root,
            diagnostics,
        })
    }

    /// Non party-list tables, entities before relationships, each group by
    /// case-insensitive name
    fn ordered<'t>(&self, tables: &'t TableSet) -> Vec<&'t Table> {
        let mut ordered: Vec<&Table> = tables
            .iter()
            .filter(|t| !naming::is_partylist_table(&t.name))
            .collect();
        ordered.sort_by(|a, b| self.compare(&a.name, &b.name));
        ordered
    }

    fn compare(&self, a: &str, b: &str) -> Ordering {
        let is_relationship = |name: &str| {
            naming::m2m_relationship(name).is_some() || self.schema.is_relationship(name)
        };
        is_relationship(a)
            .cmp(&is_relationship(b))
            .then_with(|| a.to_lowercase().cmp(&b.to_lowercase()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::filter_tables;
    use crate::ids::SequentialIds;
    use crate::schema::{FieldMeta, FieldType, M2mRelationship};
    use crate::table::{parse_csv_table, row};
    use crate::value::RawValue;
    use chrono::TimeZone;
    use rstest::rstest;
    use std::collections::HashMap;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 45).unwrap()
    }

    fn entity_names(document: &Element) -> Vec<&str> {
        document
            .children_named("entity")
            .filter_map(|e| e.attr("name"))
            .collect()
    }

    fn ordering_schema() -> SchemaIndex {
        let mut schema = SchemaIndex::new();
        schema
            .add_entity("zebra", "Zebra", "zebraid")
            .add_entity("banana", "Banana", "bananaid")
            .add_relationship(
                "apple_rel",
                M2mRelationship {
                    source_entity: "zebra".to_string(),
                    source_key: "zebraid".to_string(),
                    target_entity: "banana".to_string(),
                    target_key: "bananaid".to_string(),
                },
            );
        schema
    }

    #[test]
    fn test_entities_before_relationships() {
        let schema = ordering_schema();
        let tables: TableSet = [
            Table::from_rows("zebra", vec![row([("zebraid", "Z1")])]),
            Table::from_rows("apple_rel", vec![row([("zebraid", "Z1"), ("bananaid", "B1")])]),
            Table::from_rows("banana", vec![row([("bananaid", "B1")])]),
        ]
        .into_iter()
        .collect();

        let generated = DocumentBuilder::new(&schema)
            .with_timestamp(fixed_time())
            .generate(&tables, &tables)
            .unwrap();

        assert!(generated.diagnostics.is_empty());
        let document = &generated.document;
        assert_eq!(entity_names(document), vec!["banana", "zebra"]);

        let zebra = &document.children[1];
        let links: Vec<_> = zebra
            .child("m2mrelationships")
            .unwrap()
            .children_named("m2mrelationship")
            .collect();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].attr("m2mrelationshipname"), Some("apple_rel"));
        assert!(
            document.children[0]
                .child("m2mrelationships")
                .unwrap()
                .children
                .is_empty()
        );
    }

    #[test]
    fn test_root_attributes() {
        let schema = SchemaIndex::new();
        let generated = DocumentBuilder::new(&schema)
            .with_timestamp(fixed_time())
            .generate(&TableSet::new(), &TableSet::new())
            .unwrap();

        let root = &generated.document;
        assert_eq!(root.name, "entities");
        assert_eq!(root.attr("xmlns:xsd"), Some("http://www.w3.org/2001/XMLSchema"));
        assert_eq!(
            root.attr("xmlns:xsi"),
            Some("http://www.w3.org/2001/XMLSchema-instance")
        );
        assert_eq!(root.attr("timestamp"), Some("2024-03-01T12:30:45.000000Z"));
        assert!(root.children.is_empty());
    }

    #[test]
    fn test_round_trip_with_lookup_override() {
        let mut schema = SchemaIndex::new();
        schema
            .add_entity("contact", "Contact", "contactid")
            .add_field(
                "contact",
                "parentcustomerid",
                FieldMeta::typed(FieldType::EntityReference).with_lookup("account"),
            );

        let rows = (1..=4)
            .map(|i| {
                row([
                    ("contactid", format!("C{i}")),
                    ("firstname", format!("First {i}")),
                    ("lastname", format!("Last {i}")),
                    ("parentcustomerid", format!("P{i}")),
                    ("parentcustomerid_entityreference", "contact|account".to_string()),
                ])
            })
            .collect();
        let tables: TableSet = [Table::from_rows("contact", rows)].into_iter().collect();

        let generated = DocumentBuilder::new(&schema)
            .with_timestamp(fixed_time())
            .generate(&tables, &tables)
            .unwrap();

        let contact = &generated.document.children[0];
        assert_eq!(contact.attr("displayname"), Some("Contact"));
        let records: Vec<_> = contact
            .child("records")
            .unwrap()
            .children_named("record")
            .collect();
        assert_eq!(records.len(), 4);

        for (i, record) in records.iter().enumerate() {
            assert_eq!(record.attr("id"), Some(format!("C{}", i + 1).as_str()));
            assert_eq!(record.children.len(), 4);
            let parent = record
                .children
                .iter()
                .find(|f| f.attr("name") == Some("parentcustomerid"))
                .unwrap();
            assert_eq!(parent.attr("lookupentity"), Some("contact"));
            assert_eq!(parent.attr("lookupentityname"), Some("default"));
        }
    }

    #[test]
    fn test_filtered_blank_override_suppresses_lookup() {
        let mut schema = SchemaIndex::new();
        schema.add_entity("contact", "Contact", "contactid").add_field(
            "contact",
            "parentcustomerid",
            FieldMeta::typed(FieldType::EntityReference).with_lookup("account"),
        );
        let raw: TableSet = [parse_csv_table(
            "contact",
            "contactid,parentcustomerid,parentcustomerid_entityreference\nC1,A1,\nC2,A2,contact\n",
        )
        .unwrap()]
        .into_iter()
        .collect();
        let mut diagnostics = Diagnostics::new();
        let filtered = filter_tables(&raw, &HashMap::new(), &schema, &mut diagnostics);
        assert_eq!(
            filtered.get("contact").unwrap().rows[0]["parentcustomerid_entityreference"],
            RawValue::from("")
        );

        let generated = DocumentBuilder::new(&schema)
            .with_timestamp(fixed_time())
            .generate(&raw, &filtered)
            .unwrap();

        let records: Vec<_> = generated.document.children[0]
            .child("records")
            .unwrap()
            .children_named("record")
            .collect();
        let lookups: Vec<_> = records
            .iter()
            .map(|r| {
                r.children_named("field")
                    .find(|f| f.attr("name") == Some("parentcustomerid"))
                    .and_then(|f| f.attr("lookupentity"))
            })
            .collect();
        assert_eq!(lookups, vec![None, Some("contact")]);
    }

    #[test]
    fn test_party_lists_come_from_raw_tables() {
        let mut schema = SchemaIndex::new();
        schema.add_entity("appointment", "Appointment", "activityid");

        let appointments = Table::from_rows(
            "appointment",
            vec![row([("activityid", "A1"), ("subject", "Kickoff")])],
        );
        let participants = Table::from_rows(
            "partylist_appointment",
            vec![row([
                ("partyid_entityreference", RawValue::from("contact")),
                ("entityField", RawValue::from("requiredattendees")),
                ("activitypointerrecordid", RawValue::Null),
                ("activityid", RawValue::from("A1")),
                ("partyid", RawValue::from("C1")),
            ])],
        );
        let raw: TableSet = [appointments.clone(), participants].into_iter().collect();
        let filtered: TableSet = [appointments].into_iter().collect();

        let generated = DocumentBuilder::new(&schema)
            .with_ids(SequentialIds::new("party"))
            .with_timestamp(fixed_time())
            .generate(&raw, &filtered)
            .unwrap();

        let record = &generated.document.children[0].child("records").unwrap().children[0];
        let attendees = record
            .children
            .iter()
            .find(|f| f.attr("name") == Some("requiredattendees"))
            .unwrap();
        assert_eq!(attendees.children.len(), 1);
        assert_eq!(attendees.children[0].attr("id"), Some("party-1"));
    }

    #[test]
    fn test_unrecognized_and_unknown_tables_warn() {
        let schema = ordering_schema();
        let tables: TableSet = [
            Table::from_rows("notes", vec![row([("text", "x")])]),
            Table::from_rows("m2m_missing", vec![row([("a", "b")])]),
            Table::from_rows("partylist_unknown", vec![row([("a", "b")])]),
        ]
        .into_iter()
        .collect();

        let generated = DocumentBuilder::new(&schema)
            .with_timestamp(fixed_time())
            .generate(&tables, &tables)
            .unwrap();

        assert!(generated.document.children.is_empty());
        assert_eq!(
            generated.diagnostics.warnings(),
            &[
                Warning::UnrecognizedTable {
                    table: "notes".to_string()
                },
                Warning::UnknownRelationship {
                    table: "m2m_missing".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_prefixed_relationship_table() {
        let schema = ordering_schema();
        let tables: TableSet = [
            Table::from_rows("m2m_apple_rel", vec![row([("zebraid", "Z1"), ("bananaid", "B1")])]),
            Table::from_rows("Zebra", vec![]),
            Table::from_rows("zebra", vec![row([("zebraid", "Z1")])]),
        ]
        .into_iter()
        .collect();

        let generated = DocumentBuilder::new(&schema)
            .with_timestamp(fixed_time())
            .generate(&tables, &tables)
            .unwrap();

        let zebra = generated
            .document
            .children
            .iter()
            .find(|e| e.attr("name") == Some("zebra"))
            .unwrap();
        let link = &zebra.child("m2mrelationships").unwrap().children[0];
        assert_eq!(link.attr("m2mrelationshipname"), Some("apple_rel"));
        assert_eq!(
            generated.diagnostics.warnings(),
            &[Warning::UnrecognizedTable {
                table: "Zebra".to_string()
            }]
        );
    }

    #[test]
    fn test_missing_primary_key_fails() {
        let mut schema = SchemaIndex::new();
        schema.add_entity("contact", "Contact", "contactid");
        let tables: TableSet = [Table::from_rows(
            "contact",
            vec![row([("contactid", RawValue::Null), ("firstname", RawValue::from("Ada"))])],
        )]
        .into_iter()
        .collect();

        let result = DocumentBuilder::new(&schema).generate(&tables, &tables);
        assert!(matches!(
            result,
            Err(crate::error::Error::MissingPrimaryKey { row: 0, .. })
        ));
    }

    #[rstest]
    #[case("contact", TableKind::Entity)]
    #[case("apple_rel", TableKind::Relationship("apple_rel".to_string()))]
    #[case("m2m_apple_rel", TableKind::Relationship("apple_rel".to_string()))]
    #[case("m2m_other", TableKind::UnknownRelationship)]
    #[case("partylist_contact", TableKind::PartyList)]
    #[case("notes", TableKind::Unrecognized)]
    fn test_classify(#[case] name: &str, #[case] expected: TableKind) {
        let mut schema = ordering_schema();
        schema.add_entity("contact", "Contact", "contactid");
        assert_eq!(TableKind::classify(&schema, name), expected);
    }
}
