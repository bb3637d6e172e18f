//! Schema index: entity, field and many-to-many metadata
//!
//! The index is read from the CMT `data_schema.xml` shipped with each
//! project:
//!
//! ```xml
//! <entities>
//!   <entity name="contact" displayname="Contact" primaryidfield="contactid">
//!     <fields>
//!       <field name="parentcustomerid" type="entityreference" lookupType="account|contact" />
//!     </fields>
//!     <relationships>
//!       <relationship relatedEntityName="ntg_contact_ntg_sportcategory" manyToMany="true"
//!                     m2mTargetEntity="ntg_sportcategory"
//!                     m2mTargetEntityPrimaryKey="ntg_sportcategoryid" />
//!     </relationships>
//!   </entity>
//! </entities>
//! ```

use indexmap::IndexMap;
use std::collections::HashMap;
use std::path::Path;

use crate::error::{Error, Result};

/// Entity-level metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityMeta {
    /// Logical entity name
    pub name: String,

    /// Human readable name, copied to the `displayname` attribute
    pub display_name: String,

    /// Primary-key column
    pub primary_key: String,
}

/// Semantic type tag of a field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    /// Lookup to a record of another entity
    EntityReference,
    /// Owner lookup (user or team)
    Owner,
    /// Any other tag, kept verbatim
    Other(String),
}

impl FieldType {
    /// Parse a schema `type` attribute
    pub fn parse(tag: &str) -> Self {
        match tag {
            "entityreference" => Self::EntityReference,
            "owner" => Self::Owner,
            other => Self::Other(other.to_string()),
        }
    }

    /// Whether values of this type are lookups that need a target entity
    pub fn is_reference(&self) -> bool {
        matches!(self, Self::EntityReference | Self::Owner)
    }
}

/// Field-level metadata
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMeta {
    /// Semantic type; `None` for untyped fields
    pub field_type: Option<FieldType>,

    /// Declared lookup target(s), possibly `|`-separated
    pub lookup_type: Option<String>,

    /// Human readable name
    pub display_name: Option<String>,
}

impl FieldMeta {
    /// Metadata for a typed field
    pub fn typed(field_type: FieldType) -> Self {
        Self {
            field_type: Some(field_type),
            ..Default::default()
        }
    }

    /// Set the declared lookup target
    pub fn with_lookup(mut self, lookup_type: impl Into<String>) -> Self {
        self.lookup_type = Some(lookup_type.into());
        self
    }
}

/// Many-to-many relationship descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct M2mRelationship {
    /// Entity that owns the link rows
    pub source_entity: String,

    /// Column holding the source record id
    pub source_key: String,

    /// Linked entity
    pub target_entity: String,

    /// Column holding the target record id
    pub target_key: String,
}

/// Read-only lookup structure over the project schema
#[derive(Debug, Clone, Default)]
pub struct SchemaIndex {
    entities: IndexMap<String, EntityMeta>,
    fields: HashMap<String, HashMap<String, FieldMeta>>,
    relationships: IndexMap<String, M2mRelationship>,
}

impl SchemaIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity
    pub fn add_entity(
        &mut self,
        name: impl Into<String>,
        display_name: impl Into<String>,
        primary_key: impl Into<String>,
    ) -> &mut Self {
        let name = name.into();
        self.entities.insert(
            name.clone(),
            EntityMeta {
                name,
                display_name: display_name.into(),
                primary_key: primary_key.into(),
            },
        );
        self
    }

    /// Register field metadata
    pub fn add_field(
        &mut self,
        entity: impl Into<String>,
        field: impl Into<String>,
        meta: FieldMeta,
    ) -> &mut Self {
        self.fields
            .entry(entity.into())
            .or_default()
            .insert(field.into(), meta);
        self
    }

    /// Register a many-to-many relationship
    pub fn add_relationship(
        &mut self,
        name: impl Into<String>,
        relationship: M2mRelationship,
    ) -> &mut Self {
        self.relationships.insert(name.into(), relationship);
        self
    }

    /// Entity metadata by name
    pub fn entity(&self, name: &str) -> Option<&EntityMeta> {
        self.entities.get(name)
    }

    /// Whether the entity is declared
    pub fn is_entity(&self, name: &str) -> bool {
        self.entities.contains_key(name)
    }

    /// Field metadata; `None` means a plain untyped field
    pub fn field(&self, entity: &str, field: &str) -> Option<&FieldMeta> {
        self.fields.get(entity).and_then(|f| f.get(field))
    }

    /// Many-to-many relationship by name
    pub fn relationship(&self, name: &str) -> Option<&M2mRelationship> {
        self.relationships.get(name)
    }

    /// Whether the relationship is declared
    pub fn is_relationship(&self, name: &str) -> bool {
        self.relationships.contains_key(name)
    }

    /// All declared entities
    pub fn entities(&self) -> impl Iterator<Item = &EntityMeta> {
        self.entities.values()
    }

    /// All declared relationships with their names
    pub fn relationships(&self) -> impl Iterator<Item = (&str, &M2mRelationship)> {
        self.relationships.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Load and parse a schema file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::ConfigNotFound {
                path: path.display().to_string(),
            });
        }
        let contents = std::fs::read_to_string(path)?;
        let index = Self::parse(&contents)?;
        tracing::info!(
            "Loaded schema {} ({} entities, {} many-to-many relationships)",
            path.display(),
            index.entities.len(),
            index.relationships.len()
        );
        Ok(index)
    }

    /// Parse schema XML
    pub fn parse(xml: &str) -> Result<Self> {
        let doc = roxmltree::Document::parse(xml)?;
        let mut index = Self::new();

        for entity in doc
            .root_element()
            .children()
            .filter(|n| n.has_tag_name("entity"))
        {
            let name = required_attr(entity, "name", "entity")?;
            let primary_key = required_attr(entity, "primaryidfield", name)?;
            index.add_entity(
                name,
                entity.attribute("displayname").unwrap_or_default(),
                primary_key,
            );

            for field in child_elements(entity, "fields", "field") {
                let field_name = required_attr(field, "name", name)?;
                let meta = FieldMeta {
                    field_type: field.attribute("type").map(FieldType::parse),
                    lookup_type: field
                        .attribute("lookupType")
                        .filter(|s| !s.is_empty())
                        .map(str::to_string),
                    display_name: field.attribute("displayname").map(str::to_string),
                };
                index.add_field(name, field_name, meta);
            }

            for rel in child_elements(entity, "relationships", "relationship") {
                if rel.attribute("manyToMany") != Some("true") {
                    continue;
                }
                let rel_name = required_attr(rel, "relatedEntityName", name)?;
                let relationship = M2mRelationship {
                    source_entity: name.to_string(),
                    source_key: primary_key.to_string(),
                    target_entity: required_attr(rel, "m2mTargetEntity", rel_name)?.to_string(),
                    target_key: required_attr(rel, "m2mTargetEntityPrimaryKey", rel_name)?
                        .to_string(),
                };
                index.add_relationship(rel_name, relationship);
            }
        }

        Ok(index)
    }
}

fn required_attr<'a>(node: roxmltree::Node<'a, '_>, attr: &str, owner: &str) -> Result<&'a str> {
    node.attribute(attr).ok_or_else(|| Error::InvalidSchema {
        message: format!(
            "<{}> in '{}' is missing attribute '{}'",
            node.tag_name().name(),
            owner,
            attr
        ),
    })
}

/// Elements at `parent/<container>/<tag>`
fn child_elements<'a, 'input>(
    parent: roxmltree::Node<'a, 'input>,
    container: &'static str,
    tag: &'static str,
) -> impl Iterator<Item = roxmltree::Node<'a, 'input>> {
    parent
        .children()
        .filter(move |n| n.has_tag_name(container))
        .flat_map(move |c| c.children().filter(move |n| n.has_tag_name(tag)))
}
