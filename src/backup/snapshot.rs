//! The snapshot aggregate.

use serde::{Deserialize, Serialize};

use crate::models::{
    Application, ApplicationType, AuditEvent, Extension, ExtensionResourceDefinition, Group,
    GroupApplication, GroupApplicationRequest, GroupHierarchy, GroupMembership,
    GroupMembershipRequest, GroupOrganization, ModelSet, NotificationPreference,
    NotificationTarget, NotificationType, Organization, SystemExtensionResource, User,
    UserExtensionResource,
};

/// A full point-in-time export of every governed collection, tombstones
/// included. Field order is extraction order and artifact field order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(bound = "", deny_unknown_fields)]
pub struct Snapshot<M: ModelSet> {
    pub application_types: Vec<ApplicationType<M::Id>>,
    pub applications: Vec<Application<M::Id>>,
    pub audit_events: Vec<AuditEvent<M::Id>>,
    pub groups: Vec<Group<M::Id>>,
    pub group_applications: Vec<GroupApplication<M::Id>>,
    pub group_application_requests: Vec<GroupApplicationRequest<M::Id>>,
    pub group_hierarchies: Vec<GroupHierarchy<M::Id>>,
    pub group_memberships: Vec<GroupMembership<M::Id>>,
    pub group_membership_requests: Vec<GroupMembershipRequest<M::Id>>,
    pub group_organizations: Vec<GroupOrganization<M::Id>>,
    pub notification_preferences: Vec<NotificationPreference<M::Id>>,
    pub notification_targets: Vec<NotificationTarget<M::Id>>,
    pub notification_types: Vec<NotificationType<M::Id>>,
    pub organizations: Vec<Organization<M::Id>>,
    pub users: Vec<User<M::Id>>,
    pub extensions: Vec<Extension<M::Id>>,
    pub extension_resource_definitions: Vec<ExtensionResourceDefinition<M::Id>>,
    pub system_extension_resources: Vec<SystemExtensionResource<M::Id>>,
    pub user_extension_resources: Vec<UserExtensionResource<M::Id>>,
}

impl<M: ModelSet> Snapshot<M> {
    /// Row count per collection, in field order.
    #[must_use]
    pub fn counts(&self) -> Vec<(&'static str, usize)> {
        vec![
            ("application_types", self.application_types.len()),
            ("applications", self.applications.len()),
            ("audit_events", self.audit_events.len()),
            ("groups", self.groups.len()),
            ("group_applications", self.group_applications.len()),
            (
                "group_application_requests",
                self.group_application_requests.len(),
            ),
            ("group_hierarchies", self.group_hierarchies.len()),
            ("group_memberships", self.group_memberships.len()),
            (
                "group_membership_requests",
                self.group_membership_requests.len(),
            ),
            ("group_organizations", self.group_organizations.len()),
            (
                "notification_preferences",
                self.notification_preferences.len(),
            ),
            ("notification_targets", self.notification_targets.len()),
            ("notification_types", self.notification_types.len()),
            ("organizations", self.organizations.len()),
            ("users", self.users.len()),
            ("extensions", self.extensions.len()),
            (
                "extension_resource_definitions",
                self.extension_resource_definitions.len(),
            ),
            (
                "system_extension_resources",
                self.system_extension_resources.len(),
            ),
            (
                "user_extension_resources",
                self.user_extension_resources.len(),
            ),
        ]
    }

    #[must_use]
    pub fn total_rows(&self) -> usize {
        self.counts().iter().map(|(_, n)| n).sum()
    }
}
