use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{EntityId, EntityKind, RecordType};
use crate::error::OverviewError;

// Numbers may arrive as strings and any property may be null; accessors coerce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    List(Vec<PropertyValue>),
}

impl PropertyValue {
    pub fn is_null(&self) -> bool {
        matches!(self, PropertyValue::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::Integer(value) => Some(*value as f64),
            PropertyValue::Float(value) => Some(*value),
            PropertyValue::Text(value) => value.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    /// Integer value, truncating any fractional component toward zero.
    pub fn as_truncated_i64(&self) -> Option<i64> {
        match self {
            PropertyValue::Integer(value) => Some(*value),
            other => {
                let value = other.as_f64()?;
                if !value.is_finite() || value >= i64::MAX as f64 || value < i64::MIN as f64 {
                    return None;
                }
                Some(value.trunc() as i64)
            }
        }
    }

    pub fn as_entity_id(&self) -> Option<EntityId> {
        let value = self.as_truncated_i64()?;
        u64::try_from(value).ok().map(EntityId::new)
    }

    pub fn as_list(&self) -> Option<&[PropertyValue]> {
        match self {
            PropertyValue::List(items) => Some(items),
            _ => None,
        }
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Integer(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Float(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Text(value.to_string())
    }
}

impl From<EntityId> for PropertyValue {
    fn from(value: EntityId) -> Self {
        PropertyValue::Integer(value.get() as i64)
    }
}

impl<T: Into<PropertyValue>> From<Vec<T>> for PropertyValue {
    fn from(values: Vec<T>) -> Self {
        PropertyValue::List(values.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Null => write!(f, "None"),
            PropertyValue::Bool(true) => write!(f, "True"),
            PropertyValue::Bool(false) => write!(f, "False"),
            PropertyValue::Integer(value) => write!(f, "{value}"),
            PropertyValue::Float(value) => write_float(f, *value),
            PropertyValue::Text(value) => write!(f, "{value}"),
            PropertyValue::List(items) => {
                write!(f, "[")?;
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

// Same switch points as Python's `repr(float)`: exponent form below 1e-4 and from 1e16.
fn write_float(f: &mut fmt::Formatter<'_>, value: f64) -> fmt::Result {
    let magnitude = value.abs();
    if !value.is_finite() || value == 0.0 || (1e-4..1e16).contains(&magnitude) {
        return if value.is_finite() && value.fract() == 0.0 {
            write!(f, "{value:.1}")
        } else {
            write!(f, "{value}")
        };
    }

    let formatted = format!("{value:e}");
    let (mantissa, exponent) = formatted.split_once('e').unwrap_or((formatted.as_str(), "0"));
    let (sign, digits) = match exponent.strip_prefix('-') {
        Some(digits) => ('-', digits),
        None => ('+', exponent),
    };
    write!(f, "{mantissa}e{sign}{digits:0>2}")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub parents: Vec<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, Vec<PropertyValue>>,
}

impl Entity {
    pub fn new(id: u64) -> Self {
        Self {
            id: EntityId::new(id),
            name: None,
            parents: Vec::new(),
            properties: BTreeMap::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parents.push(parent.into());
        self
    }

    pub fn with_property(mut self, name: &str, value: impl Into<PropertyValue>) -> Self {
        self.properties
            .entry(name.to_string())
            .or_default()
            .push(value.into());
        self
    }

    pub fn has_parent(&self, parent: &str) -> bool {
        self.parents
            .iter()
            .any(|value| value.eq_ignore_ascii_case(parent))
    }

    pub fn values(&self, property: &str) -> &[PropertyValue] {
        self.properties
            .get(property)
            .map(|values| values.as_slice())
            .unwrap_or(&[])
    }

    pub fn scalar(&self, property: &str) -> Result<&PropertyValue, OverviewError> {
        match self.values(property) {
            [] => Err(OverviewError::MissingProperty {
                entity: self.id,
                property: property.to_string(),
            }),
            [value] => Ok(value),
            values => Err(OverviewError::AmbiguousProperty {
                entity: self.id,
                property: property.to_string(),
                count: values.len(),
            }),
        }
    }

    pub fn list(&self, property: &str) -> Result<&[PropertyValue], OverviewError> {
        self.scalar(property)?
            .as_list()
            .ok_or_else(|| self.invalid(property, "is not a list"))
    }

    pub fn number(&self, property: &str) -> Result<f64, OverviewError> {
        self.scalar(property)?
            .as_f64()
            .ok_or_else(|| self.invalid(property, "is not a number"))
    }

    pub fn integer(&self, property: &str) -> Result<i64, OverviewError> {
        self.scalar(property)?
            .as_truncated_i64()
            .ok_or_else(|| self.invalid(property, "is not an integer"))
    }

    pub fn reference(&self, property: &str) -> Result<EntityId, OverviewError> {
        self.scalar(property)?
            .as_entity_id()
            .ok_or_else(|| self.invalid(property, "is not an entity reference"))
    }

    pub fn integers(&self, property: &str) -> Result<Vec<i64>, OverviewError> {
        self.list(property)?
            .iter()
            .map(|value| {
                value
                    .as_truncated_i64()
                    .ok_or_else(|| self.invalid(property, "contains a non-numeric entry"))
            })
            .collect()
    }

    pub fn references(&self, property: &str) -> Result<Vec<EntityId>, OverviewError> {
        self.list(property)?
            .iter()
            .map(|value| {
                value
                    .as_entity_id()
                    .ok_or_else(|| self.invalid(property, "contains a non-reference entry"))
            })
            .collect()
    }

    pub fn text(&self, property: &str) -> Result<String, OverviewError> {
        Ok(self.scalar(property)?.to_string())
    }

    fn invalid(&self, property: &str, message: &str) -> OverviewError {
        OverviewError::InvalidValue {
            entity: self.id,
            property: property.to_string(),
            message: message.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntityContainer {
    #[serde(default)]
    pub entities: Vec<Entity>,
}

pub trait MetadataStore {
    fn find_records(&self, record_type: &RecordType) -> Result<Vec<Entity>, OverviewError>;

    fn find_entities(&self, kind: EntityKind, id: EntityId) -> Result<Vec<Entity>, OverviewError>;

    fn find_unique(&self, kind: EntityKind, id: EntityId) -> Result<Entity, OverviewError> {
        let mut matches = self.find_entities(kind, id)?;
        if matches.len() != 1 {
            return Err(OverviewError::ReferenceResolution {
                kind,
                id,
                matches: matches.len(),
            });
        }
        Ok(matches.remove(0))
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entities: Vec<Entity>,
}

impl MemoryStore {
    pub fn new(entities: Vec<Entity>) -> Self {
        Self { entities }
    }

    pub fn from_snapshot(path: &Path) -> Result<Self, OverviewError> {
        let content = fs::read_to_string(path)
            .map_err(|_| OverviewError::SnapshotRead(path.to_path_buf()))?;
        let store = Self::from_json(&content)?;
        debug!(
            path = %path.display(),
            entities = store.entities.len(),
            "loaded store snapshot"
        );
        Ok(store)
    }

    pub fn from_json(content: &str) -> Result<Self, OverviewError> {
        let container: EntityContainer = serde_json::from_str(content)
            .map_err(|err| OverviewError::SnapshotParse(err.to_string()))?;
        Ok(Self::new(container.entities))
    }

    pub fn insert(&mut self, entity: Entity) {
        self.entities.push(entity);
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl MetadataStore for MemoryStore {
    fn find_records(&self, record_type: &RecordType) -> Result<Vec<Entity>, OverviewError> {
        Ok(self
            .entities
            .iter()
            .filter(|entity| entity.has_parent(record_type.as_str()))
            .cloned()
            .collect())
    }

    fn find_entities(&self, kind: EntityKind, id: EntityId) -> Result<Vec<Entity>, OverviewError> {
        Ok(self
            .entities
            .iter()
            .filter(|entity| entity.id == id && entity.has_parent(kind.query_name()))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn floats_render_like_python() {
        let rendered: Vec<String> = [1.5, 2.0, 1e16, -2.5e17, 1.5e-5, 0.0001, 123456789.0]
            .into_iter()
            .map(|value| PropertyValue::Float(value).to_string())
            .collect();
        assert_eq!(
            rendered,
            vec!["1.5", "2.0", "1e+16", "-2.5e+17", "1.5e-05", "0.0001", "123456789.0"]
        );
    }

    #[test]
    fn scalar_requires_exactly_one_value() {
        let entity = Entity::new(7)
            .with_property("zoom", 1.5)
            .with_property("date", "2024-01-02")
            .with_property("date", "2024-01-03");

        assert_eq!(entity.number("zoom").unwrap(), 1.5);
        assert_matches!(
            entity.scalar("objective"),
            Err(OverviewError::MissingProperty { .. })
        );
        assert_matches!(
            entity.scalar("date"),
            Err(OverviewError::AmbiguousProperty { count: 2, .. })
        );
    }

    #[test]
    fn numbers_as_strings_are_coerced() {
        let entity = Entity::new(1)
            .with_property("Sample", "101.0")
            .with_property("apertures", vec![PropertyValue::from("12.9"), 40.2.into()]);

        assert_eq!(entity.reference("Sample").unwrap(), EntityId::new(101));
        assert_eq!(entity.integers("apertures").unwrap(), vec![12, 40]);
    }

    #[test]
    fn list_property_rejects_scalar() {
        let entity = Entity::new(3).with_property("filters", 5_i64);
        assert_matches!(
            entity.list("filters"),
            Err(OverviewError::InvalidValue { .. })
        );
    }

    #[test]
    fn natural_string_form() {
        assert_eq!(PropertyValue::Float(10.0).to_string(), "10.0");
        assert_eq!(PropertyValue::Float(0.25).to_string(), "0.25");
        assert_eq!(PropertyValue::Integer(4).to_string(), "4");
        assert_eq!(PropertyValue::Null.to_string(), "None");
        assert_eq!(PropertyValue::Bool(true).to_string(), "True");
        assert_eq!(PropertyValue::from(vec![1_i64, 2]).to_string(), "[1, 2]");
    }

    #[test]
    fn memory_store_unique_lookup() {
        let store = MemoryStore::new(vec![
            Entity::new(10).with_parent("Sample").with_name("S-10"),
            Entity::new(11).with_parent("Person"),
            Entity::new(11).with_parent("Person"),
        ]);

        let sample = store
            .find_unique(EntityKind::Sample, EntityId::new(10))
            .unwrap();
        assert_eq!(sample.name.as_deref(), Some("S-10"));

        assert_matches!(
            store.find_unique(EntityKind::Person, EntityId::new(11)),
            Err(OverviewError::ReferenceResolution { matches: 2, .. })
        );
        assert_matches!(
            store.find_unique(EntityKind::Wavelength, EntityId::new(10)),
            Err(OverviewError::ReferenceResolution { matches: 0, .. })
        );
    }

    #[test]
    fn untagged_values_from_json() {
        let store = MemoryStore::from_json(
            r#"{"entities": [{"id": 1, "parents": ["LSM_SCAN"],
                "properties": {"zoom": [2.0], "additional_comments": [null], "filters": [[3, "4"]]}}]}"#,
        )
        .unwrap();
        let records = store.find_records(&RecordType::lsm_scan()).unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].scalar("additional_comments").unwrap().is_null());
        assert_eq!(
            records[0].references("filters").unwrap(),
            vec![EntityId::new(3), EntityId::new(4)]
        );
    }
}
