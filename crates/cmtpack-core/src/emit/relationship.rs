//! Many-to-many table -> `<m2mrelationship>` links on the source entity

use super::{ENTITY, M2M_RELATIONSHIP, M2M_RELATIONSHIPS, TARGET_ID, TARGET_IDS};
use crate::diagnostics::{Diagnostics, Warning};
use crate::schema::M2mRelationship;
use crate::table::{Row, Table};
use crate::xml::Element;

/// Attach one link per row of `table` to the already emitted source entity.
///
/// Returns the number of links added. A missing source entity or key column
/// skips the whole table with a warning; rows lacking either id are skipped
/// silently.
pub fn emit_relationships(
    root: &mut Element,
    name: &str,
    relationship: &M2mRelationship,
    table: &Table,
    diagnostics: &mut Diagnostics,
) -> usize {
    let mut missing: Vec<String> = [&relationship.source_key, &relationship.target_key]
        .into_iter()
        .filter(|key| !table.has_column(key))
        .cloned()
        .collect();
    if !missing.is_empty() {
        missing.dedup();
        diagnostics.warn(Warning::RelationshipMissingColumns {
            table: table.name.clone(),
            missing,
        });
        return 0;
    }

    let Some(entity) = root.find_child_mut(ENTITY, "name", &relationship.source_entity) else {
        diagnostics.warn(Warning::RelationshipSourceMissing {
            relationship: name.to_string(),
            source_entity: relationship.source_entity.clone(),
        });
        return 0;
    };
    let links = entity.child_or_insert(M2M_RELATIONSHIPS);

    let mut added = 0;
    for row in &table.rows {
        let (Some(source_id), Some(target_id)) = (
            key_value(row, &relationship.source_key),
            key_value(row, &relationship.target_key),
        ) else {
            continue;
        };

        let link = links.push(
            Element::new(M2M_RELATIONSHIP)
                .with_attr("sourceid", source_id)
                .with_attr("targetentityname", &relationship.target_entity)
                .with_attr("targetentitynameidfield", &relationship.target_key)
                .with_attr("m2mrelationshipname", name),
        );
        link.push(Element::new(TARGET_IDS))
            .push(Element::new(TARGET_ID).with_text(target_id));
        added += 1;
    }

    tracing::debug!(
        "Attached {} '{}' links to entity '{}'",
        added,
        name,
        relationship.source_entity
    );
    added
}

/// Canonical id, `None` when null or blank
fn key_value(row: &Row, column: &str) -> Option<String> {
    row.get(column)
        .filter(|v| !v.is_null())
        .map(|v| v.to_canonical())
        .filter(|id| !id.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::row;
    use crate::value::RawValue;

    fn relationship() -> M2mRelationship {
        M2mRelationship {
            source_entity: "contact".to_string(),
            source_key: "contactid".to_string(),
            target_entity: "ntg_sportcategory".to_string(),
            target_key: "ntg_sportcategoryid".to_string(),
        }
    }

    fn root_with_contact() -> Element {
        let mut root = Element::new("entities");
        let contact = root.push(Element::new("entity").with_attr("name", "contact"));
        contact.push(Element::new("records"));
        contact.push(Element::new("m2mrelationships"));
        root
    }

    fn link_table(rows: Vec<Row>) -> Table {
        Table::from_rows("ntg_contact_ntg_sportcategory", rows)
    }

    #[test]
    fn test_links_attach_to_source_entity() {
        let mut root = root_with_contact();
        let table = link_table(vec![
            row([("contactid", "C1"), ("ntg_sportcategoryid", "S1")]),
            row([("contactid", "C1"), ("ntg_sportcategoryid", "S2")]),
            row([("contactid", "C2"), ("ntg_sportcategoryid", "S1")]),
        ]);
        let mut diagnostics = Diagnostics::new();

        let added = emit_relationships(
            &mut root,
            "ntg_contact_ntg_sportcategory",
            &relationship(),
            &table,
            &mut diagnostics,
        );

        assert_eq!(added, 3);
        assert!(diagnostics.is_empty());
        let links: Vec<_> = root.children[0]
            .child("m2mrelationships")
            .unwrap()
            .children_named("m2mrelationship")
            .collect();
        assert_eq!(links.len(), 3);

        let first = links[0];
        assert_eq!(first.attr("sourceid"), Some("C1"));
        assert_eq!(first.attr("targetentityname"), Some("ntg_sportcategory"));
        assert_eq!(first.attr("targetentitynameidfield"), Some("ntg_sportcategoryid"));
        assert_eq!(
            first.attr("m2mrelationshipname"),
            Some("ntg_contact_ntg_sportcategory")
        );
        let target_ids: Vec<_> = first.child("targetids").unwrap().children.iter().collect();
        assert_eq!(target_ids.len(), 1);
        assert_eq!(target_ids[0].text.as_deref(), Some("S1"));

        assert_eq!(links[1].attr("sourceid"), Some("C1"));
        assert_eq!(
            links[1].child("targetids").unwrap().children[0].text.as_deref(),
            Some("S2")
        );
    }

    #[test]
    fn test_rows_missing_ids_skipped() {
        let mut root = root_with_contact();
        let table = link_table(vec![
            row([("contactid", RawValue::Null), ("ntg_sportcategoryid", RawValue::from("S1"))]),
            row([("contactid", RawValue::from("C1")), ("ntg_sportcategoryid", RawValue::from(""))]),
            row([("contactid", RawValue::Int(5)), ("ntg_sportcategoryid", RawValue::Float(9.0))]),
        ]);
        let mut diagnostics = Diagnostics::new();

        let added = emit_relationships(&mut root, "rel", &relationship(), &table, &mut diagnostics);
        assert_eq!(added, 1);
        let link = &root.children[0].child("m2mrelationships").unwrap().children[0];
        assert_eq!(link.attr("sourceid"), Some("5"));
        assert_eq!(
            link.child("targetids").unwrap().children[0].text.as_deref(),
            Some("9")
        );
    }

    #[test]
    fn test_missing_source_entity_warns() {
        let mut root = Element::new("entities");
        let table = link_table(vec![row([("contactid", "C1"), ("ntg_sportcategoryid", "S1")])]);
        let mut diagnostics = Diagnostics::new();

        let added = emit_relationships(&mut root, "rel", &relationship(), &table, &mut diagnostics);

        assert_eq!(added, 0);
        assert!(root.children.is_empty());
        assert_eq!(
            diagnostics.warnings(),
            &[Warning::RelationshipSourceMissing {
                relationship: "rel".to_string(),
                source_entity: "contact".to_string(),
            }]
        );
    }

    #[test]
    fn test_missing_key_column_warns() {
        let mut root = root_with_contact();
        let table = link_table(vec![row([("contactid", "C1")])]);
        let mut diagnostics = Diagnostics::new();

        let added = emit_relationships(&mut root, "rel", &relationship(), &table, &mut diagnostics);
        assert_eq!(added, 0);
        assert_eq!(
            diagnostics.warnings(),
            &[Warning::RelationshipMissingColumns {
                table: table.name.clone(),
                missing: vec!["ntg_sportcategoryid".to_string()],
            }]
        );
    }

    #[test]
    fn test_container_created_when_absent() {
        let mut root = Element::new("entities");
        root.push(Element::new("entity").with_attr("name", "contact"));
        let table = link_table(vec![row([("contactid", "C1"), ("ntg_sportcategoryid", "S1")])]);
        let mut diagnostics = Diagnostics::new();

        emit_relationships(&mut root, "rel", &relationship(), &table, &mut diagnostics);
        assert_eq!(
            root.children[0]
                .child("m2mrelationships")
                .unwrap()
                .children
                .len(),
            1
        );
    }
}
