//! Table and column naming conventions of the source workbook
//!
//! Exports encode structure in names and cell text:
//!
//! - `partylist_<entity>` tables hold activity participants for `<entity>`
//! - `m2m_<relationship>` tables hold many-to-many link rows
//! - `<field>_entityreference` columns carry a per-row lookup target for `<field>`
//! - lookup hints may list several entities separated by `|`; only the first
//!   token is used

/// Prefix of party-list tables
pub const PARTYLIST_PREFIX: &str = "partylist_";

/// Prefix of many-to-many relationship tables
pub const M2M_PREFIX: &str = "m2m_";

/// Suffix of per-row lookup override columns (matched case-insensitively)
pub const ENTITY_REFERENCE_SUFFIX: &str = "_entityreference";

/// Separator between alternatives in lookup hints
pub const LOOKUP_DELIMITER: char = '|';

/// Entity name of a party-list table (`partylist_appointment` -> `appointment`)
pub fn partylist_entity(table_name: &str) -> Option<&str> {
    table_name.strip_prefix(PARTYLIST_PREFIX)
}

/// Whether a table holds party-list rows
pub fn is_partylist_table(table_name: &str) -> bool {
    partylist_entity(table_name).is_some()
}

/// Relationship name of an `m2m_`-prefixed table
pub fn m2m_relationship(table_name: &str) -> Option<&str> {
    table_name.strip_prefix(M2M_PREFIX)
}

/// Whether a column is a lookup override helper column
pub fn is_entity_reference_column(column: &str) -> bool {
    entity_reference_base(column).is_some()
}

/// Base field of a lookup override column, e.g. `parentcustomerid_entityreference`
/// -> `parentcustomerid`.
///
/// The suffix matches case-insensitively and any separators left in front of
/// it are stripped as well (`owner__EntityReference` -> `owner`).
pub fn entity_reference_base(column: &str) -> Option<&str> {
    let split = column.len().checked_sub(ENTITY_REFERENCE_SUFFIX.len())?;
    let suffix = column.get(split..)?;
    if !suffix.eq_ignore_ascii_case(ENTITY_REFERENCE_SUFFIX) {
        return None;
    }
    Some(column[..split].trim_end_matches('_'))
}

/// Iterate the `|`-separated tokens of a lookup hint
pub fn lookup_tokens(hint: &str) -> impl Iterator<Item = &str> {
    hint.split(LOOKUP_DELIMITER)
}

/// First token of a lookup hint (`account|contact` -> `account`)
pub fn first_lookup_token(hint: &str) -> &str {
    lookup_tokens(hint).next().unwrap_or(hint)
}
