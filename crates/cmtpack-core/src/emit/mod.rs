//! XML emitters for entity and relationship tables
//!
//! Output shape for one entity:
//!
//! ```text
//! entity name= displayname=
//! ├── records
//! │   └── record id=
//! │       ├── field name= value= [lookupentity= lookupentityname=]
//! │       └── field name= value="" lookupentity="" lookupentityname=""   (party list)
//! │           └── activitypointerrecords id=
//! │               ├── field name="partyid" ...
//! │               ├── field name="activityid" ...
//! │               └── field name="activitypartyid" ...
//! └── m2mrelationships
//!     └── m2mrelationship sourceid= targetentityname= targetentitynameidfield= m2mrelationshipname=
//!         └── targetids
//!             └── targetid (text)
//! ```

mod record;
mod relationship;

pub use record::RecordEmitter;
pub use relationship::emit_relationships;

use crate::xml::Element;

pub(crate) const ENTITY: &str = "entity";
pub(crate) const RECORDS: &str = "records";
pub(crate) const RECORD: &str = "record";
pub(crate) const FIELD: &str = "field";
pub(crate) const PARTY_RECORD: &str = "activitypointerrecords";
pub(crate) const M2M_RELATIONSHIPS: &str = "m2mrelationships";
pub(crate) const M2M_RELATIONSHIP: &str = "m2mrelationship";
pub(crate) const TARGET_IDS: &str = "targetids";
pub(crate) const TARGET_ID: &str = "targetid";

/// Lookup qualifier attached to every resolved lookup
pub const DEFAULT_LOOKUP_NAME: &str = "default";

/// Lookup target of owner fields without a declared lookup type
pub const DEFAULT_OWNER_ENTITY: &str = "systemuser";

/// Lookup target of the `activityid` field of party-list participants
pub const ACTIVITY_POINTER_ENTITY: &str = "activitypointer";

/// Resolved lookup attributes of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lookup<'a> {
    /// Target entity (`lookupentity`)
    pub entity: &'a str,
    /// Qualifier (`lookupentityname`)
    pub name: &'a str,
}

impl<'a> Lookup<'a> {
    /// Lookup to `entity` with the default qualifier
    pub fn to_entity(entity: &'a str) -> Self {
        Self {
            entity,
            name: DEFAULT_LOOKUP_NAME,
        }
    }
}

/// `<field name= value= />` with lookup attributes when resolved
pub(crate) fn field_element(name: &str, value: &str, lookup: Option<Lookup<'_>>) -> Element {
    let mut field = Element::new(FIELD)
        .with_attr("name", name)
        .with_attr("value", value);
    if let Some(lookup) = lookup {
        field.set_attr("lookupentity", lookup.entity);
        field.set_attr("lookupentityname", lookup.name);
    }
    field
}
