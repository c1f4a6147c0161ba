//! Database schema definitions for the document store

/// SQL to create the records collection: one `{_id, payload}` document per record
pub const CREATE_RECORDS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS records (
    _id TEXT PRIMARY KEY,
    payload TEXT NOT NULL
)
"#;

/// SQL to create the membership collections.
///
/// Every named collection (`<kind>List`, `<id>Linked<kind>`) holds `{_id}`
/// documents; the composite key makes a duplicate `_id` within one
/// collection a constraint violation.
pub const CREATE_COLLECTIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS collections (
    collection TEXT NOT NULL,
    _id TEXT NOT NULL,
    PRIMARY KEY (collection, _id)
) WITHOUT ROWID
"#;

/// All schema creation statements
pub fn all_schema_statements() -> Vec<&'static str> {
    vec![CREATE_RECORDS_TABLE, CREATE_COLLECTIONS_TABLE]
}
