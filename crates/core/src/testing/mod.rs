//! Testing utilities and mock implementations.
//!
//! Provides an in-memory [`MockCrmClient`] so reconciliation can be exercised
//! end to end without a CRM account.
//!
//! # Example
//!
//! ```rust,ignore
//! use fieldsync_core::testing::{fixtures, MockCrmClient};
//!
//! let crm = MockCrmClient::new();
//! crm.add_contact(fixtures::contact("101")).await;
//! crm.add_object(fixtures::OBJECT_TYPE, fixtures::synced_subscription("9001", "101")).await;
//! ```

mod mock_crm;

pub use mock_crm::{MockCrmClient, RecordedCrmCall};

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::crm::CrmObject;

    /// Subscription object type used throughout the tests.
    pub const OBJECT_TYPE: &str = "2-32975090";

    /// A contact with every mapped property populated.
    pub fn contact(id: &str) -> CrmObject {
        CrmObject::new(id)
            .with_property("hs_object_id", id)
            .with_property("firstname", "Ada")
            .with_property("lastname", "Lovelace")
            .with_property("email", "ada@example.com")
            .with_property("associates", "Jane Doe, John Doe")
            .with_property("member_card_no", "MC-1001")
            .with_property("address", "12 Analytical Way")
            .with_property("street_address_2", "Suite 3")
            .with_property("city", "London")
            .with_property("phone", "+44 20 7946 0000")
            .with_property("state", "LDN")
            .with_property("zip", "N1 9GU")
    }

    /// A subscription already matching [`contact`] for `contact_id`.
    pub fn synced_subscription(id: &str, contact_id: &str) -> CrmObject {
        CrmObject::new(id)
            .with_property("hs_object_id", id)
            .with_property("member_id", contact_id)
            .with_property("contracted_associates", "Jane Doe;John Doe")
            .with_property("member_card_no", "MC-1001")
            .with_property("address", "12 Analytical Way")
            .with_property("street_address_2", "Suite 3")
            .with_property("city", "London")
            .with_property("phone", "+44 20 7946 0000")
            .with_property("state", "LDN")
            .with_property("zip", "N1 9GU")
    }

    /// A freshly created subscription with no synced fields.
    pub fn blank_subscription(id: &str) -> CrmObject {
        CrmObject::new(id).with_property("hs_object_id", id)
    }
}
