//! The governed entity collections.
//!
//! Field order is column order. Records are serialized with these field names
//! in backup artifacts, so renaming a field is a format change.

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;

entity! {
    pub struct ApplicationType<I> => "application_types" {
        pub id: I,
        pub name: String,
        pub description: Option<String>,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
        pub deleted_at: Option<DateTime<Utc>>,
    }
}

entity! {
    pub struct Application<I> => "applications" {
        pub id: I,
        pub application_type_id: I => "application_types",
        pub owner_group_id: Option<I> => "groups",
        pub name: String,
        pub description: Option<String>,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
        pub deleted_at: Option<DateTime<Utc>>,
    }
}

entity! {
    /// Append-only; audit events are never tombstoned.
    pub struct AuditEvent<I> => "audit_events" {
        pub id: I,
        pub actor_user_id: Option<I> => "users",
        pub event_type: String,
        pub subject: String,
        pub payload: JsonValue,
        pub occurred_at: DateTime<Utc>,
    }
}

entity! {
    /// A group. `approver_group_id` points at another group in the same
    /// table, so groups must be inserted parents first.
    pub struct Group<I> => "groups" {
        pub id: I,
        pub approver_group_id: Option<I> => "groups",
        pub name: String,
        pub description: Option<String>,
        pub is_managed: bool,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
        pub deleted_at: Option<DateTime<Utc>>,
    }
}

entity! {
    pub struct GroupApplication<I> => "group_applications" {
        pub id: I,
        pub group_id: I => "groups",
        pub application_id: I => "applications",
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
        pub deleted_at: Option<DateTime<Utc>>,
    }
}

entity! {
    pub struct GroupApplicationRequest<I> => "group_application_requests" {
        pub id: I,
        pub group_id: I => "groups",
        pub application_id: I => "applications",
        pub requester_user_id: I => "users",
        pub status: String,
        pub reason: Option<String>,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
        pub deleted_at: Option<DateTime<Utc>>,
    }
}

entity! {
    pub struct GroupHierarchy<I> => "group_hierarchies" {
        pub id: I,
        pub parent_group_id: I => "groups",
        pub child_group_id: I => "groups",
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
        pub deleted_at: Option<DateTime<Utc>>,
    }
}

entity! {
    pub struct GroupMembership<I> => "group_memberships" {
        pub id: I,
        pub group_id: I => "groups",
        pub user_id: I => "users",
        pub role: String,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
        pub deleted_at: Option<DateTime<Utc>>,
    }
}

entity! {
    pub struct GroupMembershipRequest<I> => "group_membership_requests" {
        pub id: I,
        pub group_id: I => "groups",
        pub user_id: I => "users",
        pub status: String,
        pub reason: Option<String>,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
        pub deleted_at: Option<DateTime<Utc>>,
    }
}

entity! {
    pub struct GroupOrganization<I> => "group_organizations" {
        pub id: I,
        pub group_id: I => "groups",
        pub organization_id: I => "organizations",
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
        pub deleted_at: Option<DateTime<Utc>>,
    }
}

entity! {
    pub struct NotificationPreference<I> => "notification_preferences" {
        pub id: I,
        pub user_id: I => "users",
        pub notification_type_id: I => "notification_types",
        pub notification_target_id: Option<I> => "notification_targets",
        pub enabled: bool,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
        pub deleted_at: Option<DateTime<Utc>>,
    }
}

entity! {
    pub struct NotificationTarget<I> => "notification_targets" {
        pub id: I,
        pub name: String,
        pub kind: String,
        pub config: JsonValue,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
        pub deleted_at: Option<DateTime<Utc>>,
    }
}

entity! {
    pub struct NotificationType<I> => "notification_types" {
        pub id: I,
        pub name: String,
        pub description: Option<String>,
        /// Users are subscribed to this type unless they opt out.
        pub default_enabled: bool,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
        pub deleted_at: Option<DateTime<Utc>>,
    }
}

entity! {
    pub struct Organization<I> => "organizations" {
        pub id: I,
        pub name: String,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
        pub deleted_at: Option<DateTime<Utc>>,
    }
}

entity! {
    pub struct User<I> => "users" {
        pub id: I,
        pub email: String,
        pub display_name: String,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
        pub deleted_at: Option<DateTime<Utc>>,
    }
}

entity! {
    pub struct Extension<I> => "extensions" {
        pub id: I,
        pub name: String,
        pub version: String,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
        pub deleted_at: Option<DateTime<Utc>>,
    }
}

entity! {
    pub struct ExtensionResourceDefinition<I> => "extension_resource_definitions" {
        pub id: I,
        pub extension_id: I => "extensions",
        pub resource_type: String,
        /// JSON schema the resource payloads are validated against upstream.
        pub schema: JsonValue,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
        pub deleted_at: Option<DateTime<Utc>>,
    }
}

entity! {
    pub struct SystemExtensionResource<I> => "system_extension_resources" {
        pub id: I,
        pub extension_resource_definition_id: I => "extension_resource_definitions",
        pub data: JsonValue,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
        pub deleted_at: Option<DateTime<Utc>>,
    }
}

entity! {
    pub struct UserExtensionResource<I> => "user_extension_resources" {
        pub id: I,
        pub user_id: I => "users",
        pub extension_resource_definition_id: I => "extension_resource_definitions",
        pub data: JsonValue,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
        pub deleted_at: Option<DateTime<Utc>>,
    }
}
