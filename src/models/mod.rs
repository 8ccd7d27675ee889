//! Entity model layer.
//!
//! The 19 governed collections are declared once in [`entities`], generic over
//! the identifier type. A [`ModelSet`] picks the identifier type for a dialect,
//! which is how the CockroachDB and PostgreSQL shapes share one implementation.

use serde::Serialize;
use serde::de::DeserializeOwned;

pub mod dialect;
pub mod value;

pub use dialect::{CrdbModels, Dialect, EntityId, ModelSet, PostgresModels};
pub use value::{ColumnType, SqlType, Value, ValueError};

/// Column metadata for one entity field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub ty: ColumnType,
    pub nullable: bool,
    /// Table whose `id` this column references.
    pub references: Option<&'static str>,
}

/// Table name plus ordered column list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDef {
    pub name: &'static str,
    pub columns: Vec<Column>,
}

impl TableDef {
    /// Comma separated column list, in declaration order.
    #[must_use]
    pub fn column_list(&self) -> String {
        self.columns
            .iter()
            .map(|c| c.name)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// A persisted row type.
pub trait Entity:
    Serialize + DeserializeOwned + Clone + std::fmt::Debug + PartialEq + Send + 'static
{
    const TABLE: &'static str;

    fn columns() -> Vec<Column>;

    fn table() -> TableDef {
        TableDef {
            name: Self::TABLE,
            columns: Self::columns(),
        }
    }

    fn to_values(&self) -> Vec<Value>;

    fn from_values(values: Vec<Value>) -> Result<Self, ValueError>;
}

/// Declares an entity struct generic over its identifier type and derives
/// [`Entity`] from the field list. `=> "table"` after a field marks a foreign
/// key to that table's `id`.
macro_rules! entity {
    (@refs) => { None };
    (@refs $refs:literal) => { Some($refs) };
    (
        $(#[$meta:meta])*
        pub struct $name:ident<$id:ident> => $table:literal {
            $(
                $(#[$field_meta:meta])*
                pub $field:ident : $ty:ty $(=> $refs:literal)?
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
        #[serde(deny_unknown_fields)]
        pub struct $name<$id> {
            $(
                $(#[$field_meta])*
                pub $field: $ty,
            )*
        }

        impl<$id: $crate::models::EntityId> $crate::models::Entity for $name<$id> {
            const TABLE: &'static str = $table;

            fn columns() -> Vec<$crate::models::Column> {
                vec![
                    $(
                        $crate::models::Column {
                            name: stringify!($field),
                            ty: <$ty as $crate::models::SqlType>::TYPE,
                            nullable: <$ty as $crate::models::SqlType>::NULLABLE,
                            references: entity!(@refs $($refs)?),
                        },
                    )*
                ]
            }

            fn to_values(&self) -> Vec<$crate::models::Value> {
                vec![$($crate::models::SqlType::to_value(&self.$field),)*]
            }

            fn from_values(
                values: Vec<$crate::models::Value>,
            ) -> Result<Self, $crate::models::ValueError> {
                const FIELDS: &[&str] = &[$(stringify!($field)),*];
                let arity = $crate::models::ValueError::Arity {
                    expected: FIELDS.len(),
                    found: values.len(),
                };
                if values.len() != FIELDS.len() {
                    return Err(arity);
                }
                let mut values = values.into_iter();
                Ok(Self {
                    $(
                        $field: $crate::models::SqlType::from_value(
                            values.next().ok_or_else(|| arity.clone())?,
                        )?,
                    )*
                })
            }
        }
    };
}

pub mod entities;

pub use entities::*;
