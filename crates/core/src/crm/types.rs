use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Property values sent in a partial update, keyed by property name.
pub type PropertyUpdate = BTreeMap<String, String>;

/// CRM property bag. Values are strings; a `null` value is treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Properties(BTreeMap<String, Option<String>>);

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a property value; `None` if missing or null.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(|v| v.as_deref())
    }

    /// Get a property value only if it has non-whitespace content.
    pub fn get_non_empty(&self, name: &str) -> Option<&str> {
        self.get(name).filter(|v| !v.trim().is_empty())
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Option<String>) {
        self.0.insert(name.into(), value);
    }
}

/// A CRM object (contact or custom object) as returned by the objects API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrmObject {
    pub id: String,
    pub properties: Properties,
}

impl CrmObject {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            properties: Properties::new(),
        }
    }

    /// Builder-style property setter.
    pub fn with_property(mut self, name: &str, value: &str) -> Self {
        self.properties.insert(name, Some(value.to_string()));
        self
    }

    /// Builder-style setter for an explicit `null` property.
    pub fn with_null_property(mut self, name: &str) -> Self {
        self.properties.insert(name, None);
        self
    }

    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name)
    }

    /// "First Last" display name, `None` when both parts are missing.
    pub fn display_name(&self) -> Option<String> {
        let name = format!(
            "{} {}",
            self.property("firstname").unwrap_or_default(),
            self.property("lastname").unwrap_or_default()
        );
        let name = name.trim();
        (!name.is_empty()).then(|| name.to_string())
    }
}

/// An association edge from a contact to another object.
///
/// The v4 associations API reports the target as `toObjectId` (a number);
/// older payloads nest it as `to.id`. Both are accepted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Association {
    #[serde(
        default,
        deserialize_with = "deserialize_opt_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub to_object_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<AssociationTarget>,
    #[serde(default)]
    pub association_types: Vec<AssociationType>,
}

impl Association {
    /// Association pointing at `object_id`.
    pub fn to(object_id: impl Into<String>) -> Self {
        Self {
            to_object_id: Some(object_id.into()),
            to: None,
            association_types: Vec::new(),
        }
    }

    /// Resolved target object id.
    pub fn target_id(&self) -> Option<&str> {
        self.to_object_id
            .as_deref()
            .or_else(|| self.to.as_ref().and_then(|t| t.id.as_deref()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociationTarget {
    #[serde(default, deserialize_with = "deserialize_opt_id")]
    pub id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssociationType {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub type_id: Option<i64>,
    #[serde(default)]
    pub label: Option<String>,
}

/// One page of the v4 associations listing.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AssociationsPage {
    #[serde(default)]
    pub results: Vec<Association>,
    #[serde(default)]
    pub paging: Option<Paging>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Paging {
    #[serde(default)]
    pub next: Option<NextPage>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct NextPage {
    pub after: String,
}

impl AssociationsPage {
    pub fn next_cursor(&self) -> Option<&str> {
        self.paging
            .as_ref()
            .and_then(|p| p.next.as_ref())
            .map(|n| n.after.as_str())
            .filter(|after| !after.is_empty())
    }
}

/// Interpret a JSON value as an object id.
///
/// Accepts non-blank strings (trimmed) and numbers. Everything else yields `None`.
pub fn id_from_json(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn deserialize_opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(id_from_json))
}
