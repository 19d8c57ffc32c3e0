//! Records and record identities.
//!
//! A record is identified by its `(type, id)` pair. Everything else on a
//! record (keys, attributes, relationships) is optional payload.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Identity of a record: its model type and id.
///
/// Equality is structural, so two identities naming the same
/// `(type, id)` pair are interchangeable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordIdentity {
    /// Model type, e.g. `"planet"`.
    #[serde(rename = "type")]
    pub record_type: String,
    /// Record id, unique within its type.
    pub id: String,
}

impl RecordIdentity {
    /// Creates a new identity.
    pub fn new(record_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            record_type: record_type.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for RecordIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.record_type, self.id)
    }
}

/// Data held by a relationship.
///
/// A has-one relationship holds a single identity, a has-many relationship
/// holds a list. A has-one relationship that was explicitly cleared is
/// represented by [`Relationship::data`] being `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RelationshipData {
    /// Has-one data.
    One(RecordIdentity),
    /// Has-many data.
    Many(Vec<RecordIdentity>),
}

/// A relationship entry on a record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    /// Related record(s), or `None` for an empty has-one.
    pub data: Option<RelationshipData>,
}

impl Relationship {
    /// Creates a has-one relationship.
    pub fn has_one(related: Option<RecordIdentity>) -> Self {
        Self {
            data: related.map(RelationshipData::One),
        }
    }

    /// Creates a has-many relationship.
    pub fn has_many(related: Vec<RecordIdentity>) -> Self {
        Self {
            data: Some(RelationshipData::Many(related)),
        }
    }
}

/// A record: identity plus optional keys, attributes and relationships.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Model type.
    #[serde(rename = "type")]
    pub record_type: String,
    /// Record id.
    pub id: String,
    /// Secondary keys (e.g. a remote id).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keys: Option<BTreeMap<String, String>>,
    /// Attribute values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<BTreeMap<String, Value>>,
    /// Relationships by name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationships: Option<BTreeMap<String, Relationship>>,
}

impl Record {
    /// Creates a record with no payload.
    pub fn new(identity: RecordIdentity) -> Self {
        Self {
            record_type: identity.record_type,
            id: identity.id,
            keys: None,
            attributes: None,
            relationships: None,
        }
    }

    /// Returns the identity of this record.
    pub fn identity(&self) -> RecordIdentity {
        RecordIdentity::new(self.record_type.clone(), self.id.clone())
    }

    /// Returns true if this record has the given identity.
    pub fn is(&self, identity: &RecordIdentity) -> bool {
        self.record_type == identity.record_type && self.id == identity.id
    }

    /// Sets an attribute, builder style.
    #[must_use]
    pub fn with_attribute(mut self, attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        self.replace_attribute(attribute.into(), value.into());
        self
    }

    /// Sets a key, builder style.
    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.replace_key(key.into(), value.into());
        self
    }

    /// Sets a has-one relationship, builder style.
    #[must_use]
    pub fn with_has_one(
        mut self,
        relationship: impl Into<String>,
        related: Option<RecordIdentity>,
    ) -> Self {
        self.replace_has_one(relationship.into(), related);
        self
    }

    /// Sets a has-many relationship, builder style.
    #[must_use]
    pub fn with_has_many(
        mut self,
        relationship: impl Into<String>,
        related: Vec<RecordIdentity>,
    ) -> Self {
        self.replace_has_many(relationship.into(), related);
        self
    }

    /// Returns an attribute value.
    pub fn attribute(&self, attribute: &str) -> Option<&Value> {
        self.attributes.as_ref()?.get(attribute)
    }

    /// Returns a key value.
    pub fn key(&self, key: &str) -> Option<&str> {
        self.keys.as_ref()?.get(key).map(String::as_str)
    }

    /// Returns the relationship entry with the given name.
    pub fn relationship(&self, relationship: &str) -> Option<&Relationship> {
        self.relationships.as_ref()?.get(relationship)
    }

    /// Returns the data of a relationship, if the relationship is present and
    /// holds data.
    pub fn relationship_data(&self, relationship: &str) -> Option<&RelationshipData> {
        self.relationship(relationship)?.data.as_ref()
    }

    /// Sets an attribute value.
    pub fn replace_attribute(&mut self, attribute: String, value: Value) {
        self.attributes
            .get_or_insert_with(BTreeMap::new)
            .insert(attribute, value);
    }

    /// Sets a key value.
    pub fn replace_key(&mut self, key: String, value: String) {
        self.keys.get_or_insert_with(BTreeMap::new).insert(key, value);
    }

    /// Replaces a has-one relationship.
    pub fn replace_has_one(&mut self, relationship: String, related: Option<RecordIdentity>) {
        self.relationships
            .get_or_insert_with(BTreeMap::new)
            .insert(relationship, Relationship::has_one(related));
    }

    /// Replaces a has-many relationship.
    pub fn replace_has_many(&mut self, relationship: String, related: Vec<RecordIdentity>) {
        self.relationships
            .get_or_insert_with(BTreeMap::new)
            .insert(relationship, Relationship::has_many(related));
    }

    /// Appends an identity to a has-many relationship.
    ///
    /// A missing relationship, or one holding has-one data, becomes a
    /// has-many list containing only `related`.
    pub fn add_to_has_many(&mut self, relationship: &str, related: RecordIdentity) {
        let entry = self
            .relationships
            .get_or_insert_with(BTreeMap::new)
            .entry(relationship.to_string())
            .or_default();

        match &mut entry.data {
            Some(RelationshipData::Many(list)) => list.push(related),
            data => *data = Some(RelationshipData::Many(vec![related])),
        }
    }

    /// Removes every occurrence of an identity from a has-many relationship.
    ///
    /// Does nothing if the relationship is missing or is not has-many.
    pub fn remove_from_has_many(&mut self, relationship: &str, related: &RecordIdentity) {
        let data = self
            .relationships
            .as_mut()
            .and_then(|r| r.get_mut(relationship))
            .and_then(|r| r.data.as_mut());

        if let Some(RelationshipData::Many(list)) = data {
            list.retain(|r| r != related);
        }
    }

    /// Merges another record's payload into this one, field by field.
    ///
    /// Keys, attributes and relationships present on `other` overwrite the
    /// corresponding entries here; entries absent on `other` are kept.
    pub fn merge(&mut self, other: &Record) {
        if let Some(keys) = &other.keys {
            let target = self.keys.get_or_insert_with(BTreeMap::new);
            for (k, v) in keys {
                target.insert(k.clone(), v.clone());
            }
        }
        if let Some(attributes) = &other.attributes {
            let target = self.attributes.get_or_insert_with(BTreeMap::new);
            for (k, v) in attributes {
                target.insert(k.clone(), v.clone());
            }
        }
        if let Some(relationships) = &other.relationships {
            let target = self.relationships.get_or_insert_with(BTreeMap::new);
            for (k, v) in relationships {
                target.insert(k.clone(), v.clone());
            }
        }
    }
}

impl From<RecordIdentity> for Record {
    fn from(identity: RecordIdentity) -> Self {
        Self::new(identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn earth() -> RecordIdentity {
        RecordIdentity::new("planet", "earth")
    }

    fn moon(id: &str) -> RecordIdentity {
        RecordIdentity::new("moon", id)
    }

    #[test]
    fn identity_display() {
        assert_eq!(earth().to_string(), "planet:earth");
    }

    #[test]
    fn record_serializes_type_field() {
        let record = Record::new(earth()).with_attribute("name", "Earth");
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            value,
            json!({"type": "planet", "id": "earth", "attributes": {"name": "Earth"}})
        );
    }

    #[test]
    fn relationship_data_shapes() {
        let record: Record = serde_json::from_value(json!({
            "type": "planet",
            "id": "earth",
            "relationships": {
                "sun": {"data": {"type": "star", "id": "sun"}},
                "moons": {"data": [{"type": "moon", "id": "luna"}]},
                "ring": {"data": null}
            }
        }))
        .unwrap();

        assert_eq!(
            record.relationship_data("sun"),
            Some(&RelationshipData::One(RecordIdentity::new("star", "sun")))
        );
        assert_eq!(
            record.relationship_data("moons"),
            Some(&RelationshipData::Many(vec![moon("luna")]))
        );
        assert!(record.relationship("ring").is_some());
        assert_eq!(record.relationship_data("ring"), None);
    }

    #[test]
    fn add_and_remove_has_many() {
        let mut record = Record::new(earth());
        record.add_to_has_many("moons", moon("a"));
        record.add_to_has_many("moons", moon("b"));
        record.remove_from_has_many("moons", &moon("a"));

        assert_eq!(
            record.relationship_data("moons"),
            Some(&RelationshipData::Many(vec![moon("b")]))
        );
    }

    #[test]
    fn remove_from_missing_relationship_is_noop() {
        let mut record = Record::new(earth());
        record.remove_from_has_many("moons", &moon("a"));
        assert!(record.relationships.is_none());
    }

    #[test]
    fn merge_overwrites_present_fields_only() {
        let mut record = Record::new(earth())
            .with_attribute("name", "Earth")
            .with_attribute("size", 12742);
        let update = Record::new(earth())
            .with_attribute("name", "Terra")
            .with_key("remoteId", "3");

        record.merge(&update);

        assert_eq!(record.attribute("name"), Some(&json!("Terra")));
        assert_eq!(record.attribute("size"), Some(&json!(12742)));
        assert_eq!(record.key("remoteId"), Some("3"));
    }
}
