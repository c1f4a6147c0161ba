//! Record payloads at the request boundary
//!
//! The storage core treats payloads as opaque strings. This module is the
//! only place that looks inside them, and only to:
//! - locate the primary `uuid`-typed identifier (`<kind>Identifier`)
//! - strip caller-declared `linking<Kind>Identifier` entries before storage
//! - re-attach live link listings when a record is materialized
//! - build the minimal stub relationship minted by the linker

use crate::kind::RecordKind;
use crate::storage::StorageBackend;
use crate::{Error, Result};
use serde_json::{json, Map, Value};

/// Identifier type that names a record's storage key
pub const UUID_IDENTIFIER_TYPE: &str = "uuid";

/// Note carried by every auto-generated stub relationship
pub const STUB_RELATIONSHIP_NOTE: &str = "Automatically created to facilitate linking";

/// A record accepted from a caller, ready to be stored
#[derive(Debug, Clone, PartialEq)]
pub struct IncomingRecord {
    pub kind: RecordKind,
    pub id: String,
    /// Serialized payload with linking identifiers removed
    pub payload: String,
    /// Declared links, as (target kind, target id)
    pub links: Vec<(RecordKind, String)>,
}

impl IncomingRecord {
    /// Parse a caller-supplied record of `kind`.
    ///
    /// `raw` is either a JSON object or a string holding one.
    pub fn parse(kind: RecordKind, raw: &Value) -> Result<Self> {
        let mut fields = into_object(raw)?;
        let id = primary_identifier(kind, &fields)?;
        let links = take_linking_identifiers(kind, &mut fields)?;
        let payload = serde_json::to_string(&Value::Object(fields))?;

        Ok(Self {
            kind,
            id,
            payload,
            links,
        })
    }
}

fn into_object(raw: &Value) -> Result<Map<String, Value>> {
    let value = match raw {
        Value::String(s) => serde_json::from_str::<Value>(s)
            .map_err(|e| Error::InvalidRecord(e.to_string()))?,
        other => other.clone(),
    };
    match value {
        Value::Object(map) => Ok(map),
        other => Err(Error::InvalidRecord(format!(
            "expected a JSON object, got {}",
            json_type_name(&other)
        ))),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Identifier entries may be a list or a single object
fn entries(value: &Value) -> Vec<&Map<String, Value>> {
    match value {
        Value::Array(items) => items.iter().filter_map(Value::as_object).collect(),
        Value::Object(map) => vec![map],
        _ => Vec::new(),
    }
}

/// Find the `uuid`-typed `<kind>Identifier` value. The last matching entry wins.
pub fn primary_identifier(kind: RecordKind, fields: &Map<String, Value>) -> Result<String> {
    let field = format!("{}Identifier", kind.as_str());
    let type_key = format!("{}Type", field);
    let value_key = format!("{}Value", field);

    let mut found = None;
    if let Some(value) = fields.get(&field) {
        for entry in entries(value) {
            if entry.get(&type_key).and_then(Value::as_str) == Some(UUID_IDENTIFIER_TYPE) {
                if let Some(id) = entry.get(&value_key).and_then(Value::as_str) {
                    found = Some(id.to_string());
                }
            }
        }
    }
    found.ok_or(Error::MissingUuidIdentifier)
}

fn linking_field(target: RecordKind) -> String {
    format!("linking{}Identifier", target.title())
}

/// Remove every `linking<Target>Identifier` field the kind may carry and
/// return the declared targets. Non-uuid linking entries are rejected.
pub fn take_linking_identifiers(
    kind: RecordKind,
    fields: &mut Map<String, Value>,
) -> Result<Vec<(RecordKind, String)>> {
    let mut links = Vec::new();
    for target in kind.linkable_kinds() {
        let field = linking_field(*target);
        let Some(value) = fields.remove(&field) else {
            continue;
        };
        let type_key = format!("{}Type", field);
        let value_key = format!("{}Value", field);
        for entry in entries(&value) {
            if entry.get(&type_key).and_then(Value::as_str) != Some(UUID_IDENTIFIER_TYPE) {
                return Err(Error::MissingUuidIdentifier);
            }
            let id = entry
                .get(&value_key)
                .and_then(Value::as_str)
                .ok_or(Error::MissingUuidIdentifier)?;
            links.push((*target, id.to_string()));
        }
    }
    Ok(links)
}

/// Re-attach live link listings to a stored payload.
///
/// Targets with no links leave the payload untouched, so a record without
/// links materializes exactly as it was stored.
pub fn attach_links(payload: &str, links: &[(RecordKind, Vec<String>)]) -> Result<Value> {
    let mut value: Value = serde_json::from_str(payload)?;
    let Some(fields) = value.as_object_mut() else {
        return Err(Error::InvalidRecord("stored payload is not a JSON object".into()));
    };

    for (target, ids) in links {
        if ids.is_empty() {
            continue;
        }
        let field = linking_field(*target);
        let type_key = format!("{}Type", field);
        let value_key = format!("{}Value", field);

        let slot = fields
            .entry(field)
            .or_insert_with(|| Value::Array(Vec::new()));
        if !slot.is_array() {
            *slot = Value::Array(vec![slot.take()]);
        }
        if let Value::Array(items) = slot {
            for id in ids {
                let mut entry = Map::new();
                entry.insert(type_key.clone(), Value::from(UUID_IDENTIFIER_TYPE));
                entry.insert(value_key.clone(), Value::from(id.as_str()));
                items.push(Value::Object(entry));
            }
        }
    }
    Ok(value)
}

/// Load a record of `kind` as clients see it.
///
/// The full form re-attaches every live link listing; the sparse form is
/// the payload exactly as stored.
pub fn materialize<B: StorageBackend + ?Sized>(
    backend: &B,
    kind: RecordKind,
    id: &str,
    with_links: bool,
) -> Result<Value> {
    if !backend.exists(kind, id)? {
        return Err(Error::IdentifierNotFound(id.to_string()));
    }
    let payload = backend.get(id)?;
    let mut links = Vec::new();
    if with_links {
        for &target in kind.linkable_kinds() {
            links.push((target, backend.all_kind_links(target, id)?));
        }
    }
    attach_links(&payload, &links)
}

/// Payload of the minimal relationship minted to mediate a direct link
pub fn stub_relationship(id: &str) -> String {
    json!({
        "relationshipIdentifier": [{
            "relationshipIdentifierType": UUID_IDENTIFIER_TYPE,
            "relationshipIdentifierValue": id,
        }],
        "relationshipType": "link",
        "relationshipSubType": "simple",
        "relationshipNote": STUB_RELATIONSHIP_NOTE,
    })
    .to_string()
}
