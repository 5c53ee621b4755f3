//! Contact to subscription field mapping and diffing.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::crm::{CrmObject, PropertyUpdate};

use super::normalize::normalize_associates;

/// Properties requested when fetching a contact.
pub const CONTACT_PROPERTIES: &[&str] = &[
    "hs_object_id",
    "associates",
    "member_card_no",
    "firstname",
    "lastname",
    "email",
    "address",
    "street_address_2",
    "city",
    "phone",
    "state",
    "zip",
];

/// Properties requested when fetching a subscription.
pub const SUBSCRIPTION_PROPERTIES: &[&str] = &[
    "member_id",
    "contracted_associates",
    "member_card_no",
    "hs_object_id",
    "address",
    "street_address_2",
    "city",
    "phone",
    "state",
    "zip",
];

/// Where a mapped value comes from on the contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSource {
    /// The contact's record id.
    RecordId,
    /// A named contact property.
    Property(&'static str),
}

/// How a mapped value is applied to the subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRule {
    /// Write the source value verbatim when it differs.
    Copy,
    /// Normalize the source list, then write when it differs.
    NormalizedList,
    /// Write only when the subscription has no value yet.
    FillIfAbsent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMapping {
    pub source: FieldSource,
    pub target: &'static str,
    pub rule: FieldRule,
}

const fn copy(name: &'static str) -> FieldMapping {
    FieldMapping {
        source: FieldSource::Property(name),
        target: name,
        rule: FieldRule::Copy,
    }
}

/// Fixed, ordered contact to subscription mapping.
pub const FIELD_MAP: &[FieldMapping] = &[
    FieldMapping {
        source: FieldSource::RecordId,
        target: "member_id",
        rule: FieldRule::FillIfAbsent,
    },
    FieldMapping {
        source: FieldSource::Property("associates"),
        target: "contracted_associates",
        rule: FieldRule::NormalizedList,
    },
    copy("member_card_no"),
    copy("address"),
    copy("street_address_2"),
    copy("city"),
    copy("phone"),
    copy("state"),
    copy("zip"),
];

/// A single field written to a subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
    pub field: String,
    pub value: String,
}

impl fmt::Display for FieldChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = \"{}\"", self.field, self.value)
    }
}

impl FieldMapping {
    fn source_value<'a>(&self, contact: &'a CrmObject) -> Option<&'a str> {
        match self.source {
            FieldSource::RecordId => Some(contact.id.as_str()).filter(|id| !id.trim().is_empty()),
            FieldSource::Property(name) => contact.properties.get_non_empty(name),
        }
    }

    /// Value to write for this mapping, or `None` if the subscription is
    /// already in sync (or the contact has nothing to contribute).
    pub fn resolve(&self, contact: &CrmObject, subscription: &CrmObject) -> Option<String> {
        let source = self.source_value(contact)?;
        let current = subscription.property(self.target);

        match self.rule {
            FieldRule::FillIfAbsent => {
                let has_value = current.is_some_and(|v| !v.is_empty());
                (!has_value).then(|| source.to_string())
            }
            FieldRule::NormalizedList => {
                let normalized = normalize_associates(source)?;
                (current != Some(normalized.as_str())).then_some(normalized)
            }
            FieldRule::Copy => (current != Some(source)).then(|| source.to_string()),
        }
    }
}

/// Compute the changes needed to bring `subscription` in line with `contact`.
pub fn diff(contact: &CrmObject, subscription: &CrmObject) -> Vec<FieldChange> {
    FIELD_MAP
        .iter()
        .filter_map(|mapping| {
            mapping
                .resolve(contact, subscription)
                .map(|value| FieldChange {
                    field: mapping.target.to_string(),
                    value,
                })
        })
        .collect()
}

/// Build the partial update payload for a set of changes.
pub fn to_update(changes: &[FieldChange]) -> PropertyUpdate {
    changes
        .iter()
        .map(|c| (c.field.clone(), c.value.clone()))
        .collect()
}
