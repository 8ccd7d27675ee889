//! DDL rendering from entity metadata.
//!
//! Used by `restore --migrate` and by the test suite to prepare an empty
//! database. Tables are created in restore order, so every referenced table
//! exists before the table that references it.

use crate::models::{
    Application, ApplicationType, AuditEvent, Column, ColumnType, Entity, Extension,
    ExtensionResourceDefinition, Group, GroupApplication, GroupApplicationRequest,
    GroupHierarchy, GroupMembership, GroupMembershipRequest, GroupOrganization, ModelSet,
    NotificationPreference, NotificationTarget, NotificationType, Organization,
    SystemExtensionResource, TableDef, User, UserExtensionResource,
};

use super::Backend;

/// All governed tables of model set `M`, in restore order.
#[must_use]
pub fn tables<M: ModelSet>() -> Vec<TableDef> {
    vec![
        ApplicationType::<M::Id>::table(),
        Group::<M::Id>::table(),
        User::<M::Id>::table(),
        Extension::<M::Id>::table(),
        NotificationTarget::<M::Id>::table(),
        NotificationType::<M::Id>::table(),
        Organization::<M::Id>::table(),
        Application::<M::Id>::table(),
        AuditEvent::<M::Id>::table(),
        ExtensionResourceDefinition::<M::Id>::table(),
        GroupApplicationRequest::<M::Id>::table(),
        GroupApplication::<M::Id>::table(),
        GroupHierarchy::<M::Id>::table(),
        GroupMembershipRequest::<M::Id>::table(),
        GroupMembership::<M::Id>::table(),
        GroupOrganization::<M::Id>::table(),
        NotificationPreference::<M::Id>::table(),
        SystemExtensionResource::<M::Id>::table(),
        UserExtensionResource::<M::Id>::table(),
    ]
}

/// `CREATE TABLE IF NOT EXISTS` statements for every table of `M`.
#[must_use]
pub fn statements<M: ModelSet>(backend: Backend) -> Vec<String> {
    tables::<M>()
        .iter()
        .map(|table| create_table(table, backend))
        .collect()
}

fn create_table(table: &TableDef, backend: Backend) -> String {
    let columns = table
        .columns
        .iter()
        .map(|column| format!("    {}", column_def(column, backend)))
        .collect::<Vec<_>>()
        .join(",\n");
    format!("CREATE TABLE IF NOT EXISTS {} (\n{columns}\n)", table.name)
}

fn column_def(column: &Column, backend: Backend) -> String {
    let mut def = format!("{} {}", column.name, sql_type(column.ty, backend));
    if column.name == "id" {
        def.push_str(" PRIMARY KEY");
    } else if !column.nullable {
        def.push_str(" NOT NULL");
    }
    if let Some(target) = column.references {
        def.push_str(&format!(" REFERENCES {target}(id)"));
    }
    def
}

const fn sql_type(ty: ColumnType, backend: Backend) -> &'static str {
    match backend {
        Backend::Postgres => match ty {
            ColumnType::Bool => "BOOL",
            ColumnType::Int => "INT8",
            ColumnType::Text => "TEXT",
            ColumnType::Uuid => "UUID",
            ColumnType::Timestamp => "TIMESTAMPTZ",
            ColumnType::Json => "JSONB",
        },
        Backend::Sqlite => match ty {
            ColumnType::Bool | ColumnType::Int => "INTEGER",
            ColumnType::Text | ColumnType::Uuid | ColumnType::Timestamp | ColumnType::Json => {
                "TEXT"
            }
        },
    }
}
