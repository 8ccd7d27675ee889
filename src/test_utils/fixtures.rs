//! Seed data: a small organization touching all 19 collections, with
//! tombstones, nullable columns, JSON payloads and a three-level approver
//! chain.
//!
//! Ids ascend in every collection and approver groups have lower ids than the
//! groups they approve for, so the snapshot equals what extraction returns.
//! Every live user already has a preference for every live default-enabled
//! notification type, so the consistency repair adds nothing.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::backup::{Snapshot, extract, restoration_groups};
use crate::context::Context;
use crate::models::{
    Application, ApplicationType, AuditEvent, EntityId, Extension, ExtensionResourceDefinition,
    Group, GroupApplication, GroupApplicationRequest, GroupHierarchy, GroupMembership,
    GroupMembershipRequest, GroupOrganization, ModelSet, NotificationPreference,
    NotificationTarget, NotificationType, Organization, SystemExtensionResource, User,
    UserExtensionResource,
};
use crate::storage::{SqliteStore, Store, Transaction, schema};

/// Identifiers that can be minted from a small integer.
pub trait FixtureId: EntityId {
    fn nth(n: u32) -> Self;
}

impl FixtureId for i64 {
    fn nth(n: u32) -> Self {
        Self::from(n)
    }
}

impl FixtureId for Uuid {
    fn nth(n: u32) -> Self {
        Uuid::from_u128(u128::from(n))
    }
}

/// Fixed timestamp `n` seconds after the fixture epoch, with sub-second
/// precision.
#[must_use]
pub fn ts(n: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0)
        .single()
        .unwrap_or_default()
        + Duration::seconds(n)
        + Duration::microseconds(250_125)
}

#[must_use]
pub fn group<I: EntityId>(id: I, approver: Option<I>, name: &str) -> Group<I> {
    Group {
        id,
        approver_group_id: approver,
        name: name.to_string(),
        description: None,
        is_managed: false,
        created_at: ts(0),
        updated_at: ts(0),
        deleted_at: None,
    }
}

#[must_use]
#[allow(clippy::too_many_lines)]
pub fn snapshot<M>() -> Snapshot<M>
where
    M: ModelSet,
    M::Id: FixtureId,
{
    let id = <M::Id as FixtureId>::nth;
    let gone = Some(ts(3600));

    Snapshot {
        application_types: vec![
            ApplicationType {
                id: id(1),
                name: "saas".into(),
                description: Some("Hosted third-party service".into()),
                created_at: ts(1),
                updated_at: ts(1),
                deleted_at: None,
            },
            ApplicationType {
                id: id(2),
                name: "on-prem".into(),
                description: None,
                created_at: ts(2),
                updated_at: ts(5),
                deleted_at: gone,
            },
        ],
        applications: vec![
            Application {
                id: id(701),
                application_type_id: id(1),
                owner_group_id: Some(id(101)),
                name: "wiki".into(),
                description: Some("Team wiki".into()),
                created_at: ts(10),
                updated_at: ts(10),
                deleted_at: None,
            },
            Application {
                id: id(702),
                application_type_id: id(2),
                owner_group_id: None,
                name: "ledger".into(),
                description: None,
                created_at: ts(11),
                updated_at: ts(12),
                deleted_at: gone,
            },
        ],
        audit_events: vec![
            AuditEvent {
                id: id(801),
                actor_user_id: Some(id(201)),
                event_type: "group.member.added".into(),
                subject: "groups/102".into(),
                payload: json!({"role": "owner", "via": ["api", "ui"]}),
                occurred_at: ts(20),
            },
            AuditEvent {
                id: id(802),
                actor_user_id: None,
                event_type: "system.sync".into(),
                subject: "directory".into(),
                payload: json!(null),
                occurred_at: ts(21),
            },
        ],
        groups: vec![
            Group {
                is_managed: true,
                description: Some("Root of the approver chain".into()),
                ..group(id(101), None, "platform")
            },
            group(id(102), Some(id(101)), "engineering"),
            Group {
                updated_at: ts(30),
                deleted_at: gone,
                ..group(id(103), Some(id(102)), "legacy-eng")
            },
            group(id(104), None, "operations"),
        ],
        group_applications: vec![
            GroupApplication {
                id: id(1101),
                group_id: id(102),
                application_id: id(701),
                created_at: ts(40),
                updated_at: ts(40),
                deleted_at: None,
            },
            GroupApplication {
                id: id(1102),
                group_id: id(103),
                application_id: id(702),
                created_at: ts(41),
                updated_at: ts(42),
                deleted_at: gone,
            },
        ],
        group_application_requests: vec![GroupApplicationRequest {
            id: id(1001),
            group_id: id(102),
            application_id: id(701),
            requester_user_id: id(202),
            status: "pending".into(),
            reason: Some("Need edit access".into()),
            created_at: ts(50),
            updated_at: ts(50),
            deleted_at: None,
        }],
        group_hierarchies: vec![GroupHierarchy {
            id: id(1201),
            parent_group_id: id(101),
            child_group_id: id(102),
            created_at: ts(60),
            updated_at: ts(60),
            deleted_at: None,
        }],
        group_memberships: vec![
            GroupMembership {
                id: id(1401),
                group_id: id(102),
                user_id: id(201),
                role: "owner".into(),
                created_at: ts(70),
                updated_at: ts(70),
                deleted_at: None,
            },
            GroupMembership {
                id: id(1402),
                group_id: id(103),
                user_id: id(203),
                role: "member".into(),
                created_at: ts(71),
                updated_at: ts(72),
                deleted_at: gone,
            },
        ],
        group_membership_requests: vec![GroupMembershipRequest {
            id: id(1301),
            group_id: id(104),
            user_id: id(202),
            status: "approved".into(),
            reason: None,
            created_at: ts(80),
            updated_at: ts(81),
            deleted_at: None,
        }],
        group_organizations: vec![GroupOrganization {
            id: id(1501),
            group_id: id(101),
            organization_id: id(601),
            created_at: ts(90),
            updated_at: ts(90),
            deleted_at: None,
        }],
        notification_preferences: vec![
            NotificationPreference {
                id: id(1601),
                user_id: id(201),
                notification_type_id: id(501),
                notification_target_id: Some(id(401)),
                enabled: true,
                created_at: ts(100),
                updated_at: ts(100),
                deleted_at: None,
            },
            // A tombstoned preference still counts as the user's choice.
            NotificationPreference {
                id: id(1602),
                user_id: id(202),
                notification_type_id: id(501),
                notification_target_id: None,
                enabled: false,
                created_at: ts(101),
                updated_at: ts(102),
                deleted_at: gone,
            },
            NotificationPreference {
                id: id(1603),
                user_id: id(201),
                notification_type_id: id(502),
                notification_target_id: None,
                enabled: true,
                created_at: ts(103),
                updated_at: ts(103),
                deleted_at: None,
            },
        ],
        notification_targets: vec![NotificationTarget {
            id: id(401),
            name: "security-inbox".into(),
            kind: "email".into(),
            config: json!({"address": "security@example.com", "digest": false}),
            created_at: ts(110),
            updated_at: ts(110),
            deleted_at: None,
        }],
        notification_types: vec![
            NotificationType {
                id: id(501),
                name: "access_request".into(),
                description: Some("Someone asked to join a group you approve for".into()),
                default_enabled: true,
                created_at: ts(120),
                updated_at: ts(120),
                deleted_at: None,
            },
            NotificationType {
                id: id(502),
                name: "weekly_digest".into(),
                description: None,
                default_enabled: false,
                created_at: ts(121),
                updated_at: ts(121),
                deleted_at: None,
            },
            NotificationType {
                id: id(503),
                name: "legacy_alert".into(),
                description: None,
                default_enabled: true,
                created_at: ts(122),
                updated_at: ts(123),
                deleted_at: gone,
            },
        ],
        organizations: vec![Organization {
            id: id(601),
            name: "Acme".into(),
            created_at: ts(130),
            updated_at: ts(130),
            deleted_at: None,
        }],
        users: vec![
            User {
                id: id(201),
                email: "ada@example.com".into(),
                display_name: "Ada".into(),
                created_at: ts(140),
                updated_at: ts(140),
                deleted_at: None,
            },
            User {
                id: id(202),
                email: "grace@example.com".into(),
                display_name: "Grace".into(),
                created_at: ts(141),
                updated_at: ts(141),
                deleted_at: None,
            },
            User {
                id: id(203),
                email: "former@example.com".into(),
                display_name: "Former Employee".into(),
                created_at: ts(142),
                updated_at: ts(143),
                deleted_at: gone,
            },
        ],
        extensions: vec![Extension {
            id: id(301),
            name: "scim".into(),
            version: "1.2.0".into(),
            created_at: ts(150),
            updated_at: ts(150),
            deleted_at: None,
        }],
        extension_resource_definitions: vec![ExtensionResourceDefinition {
            id: id(901),
            extension_id: id(301),
            resource_type: "scim.user".into(),
            schema: json!({"type": "object", "required": ["externalId"]}),
            created_at: ts(160),
            updated_at: ts(160),
            deleted_at: None,
        }],
        system_extension_resources: vec![SystemExtensionResource {
            id: id(1701),
            extension_resource_definition_id: id(901),
            data: json!({"endpoint": "https://scim.example.com/v2"}),
            created_at: ts(170),
            updated_at: ts(170),
            deleted_at: None,
        }],
        user_extension_resources: vec![UserExtensionResource {
            id: id(1801),
            user_id: id(201),
            extension_resource_definition_id: id(901),
            data: json!({"externalId": "ada-01"}),
            created_at: ts(180),
            updated_at: ts(180),
            deleted_at: None,
        }],
    }
}

/// Create every table of `M` in `store`.
pub fn migrate<M: ModelSet>(store: &mut impl Store) {
    let statements = schema::statements::<M>(store.backend());
    store
        .apply_schema(&Context::new(), &statements)
        .expect("apply schema");
}

/// Insert exactly the rows of `snapshot` in one transaction. No repair runs.
pub fn seed<M: ModelSet>(store: &mut impl Store, snapshot: &Snapshot<M>) {
    let ctx = Context::new();
    let mut tx = store.begin(&ctx).expect("begin seed transaction");
    for group in restoration_groups(snapshot).expect("sortable groups") {
        for row in &group.rows {
            tx.insert_row(&ctx, &group.table, row)
                .unwrap_or_else(|err| panic!("seed {}: {err}", group.name));
        }
    }
    tx.commit().expect("commit seed transaction");
}

/// In-memory SQLite store with every table of `M` created.
#[must_use]
pub fn migrated_store<M: ModelSet>() -> SqliteStore {
    let mut store = SqliteStore::open_in_memory().expect("open in-memory sqlite");
    migrate::<M>(&mut store);
    store
}

/// Migrated in-memory store holding exactly the rows of `snapshot`.
#[must_use]
pub fn seeded_store<M: ModelSet>(snapshot: &Snapshot<M>) -> SqliteStore {
    let mut store = migrated_store::<M>();
    seed(&mut store, snapshot);
    store
}

/// Row count per collection, in snapshot field order.
pub fn row_counts<M: ModelSet>(store: &mut impl Store) -> Vec<(&'static str, usize)> {
    extract::<M, _>(&Context::new(), store, false)
        .expect("extract for row counts")
        .counts()
}
