//! Lead-collection schemas built at runtime from a tenant's selected-field
//! configuration, plus the fixed per-tenant users schema.
//!
//! Field identifiers form a closed set: each known identifier maps through a
//! fixed translation table to an output column name and primitive type.
//! Unknown identifiers are silently dropped rather than rejected.

pub mod registry;

pub use registry::SchemaRegistry;

use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashMap;

/// Fixed name of the per-tenant lead collection. Connections are already
/// tenant-isolated, so the name never varies per tenant.
pub const LEADS_TABLE: &str = "leads";

/// Fixed per-tenant users table. Tenant-independent shape, created when a
/// tenant database is first provisioned.
pub const USERS_TABLE_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    name TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE,
    role TEXT NOT NULL DEFAULT 'user' CHECK (role IN ('user', 'manager', 'admin')),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
)
"#;

/// Closed set of selectable lead-capture field identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldId {
    Name,
    Organisation,
    Email,
    InquiryType,
    Designation,
    MobileNumber,
    Comments,
    Address,
    Pincode,
    Purpose,
    Type,
}

static FIELD_IDS: Lazy<HashMap<&'static str, FieldId>> = Lazy::new(|| {
    HashMap::from([
        ("name", FieldId::Name),
        ("organisation", FieldId::Organisation),
        ("email", FieldId::Email),
        ("inquiryType", FieldId::InquiryType),
        ("designation", FieldId::Designation),
        ("mobileNumber", FieldId::MobileNumber),
        ("comments", FieldId::Comments),
        ("address", FieldId::Address),
        ("pincode", FieldId::Pincode),
        ("purpose", FieldId::Purpose),
        ("type", FieldId::Type),
    ])
});

impl FieldId {
    /// Parse a stored field identifier. Unknown identifiers yield `None`
    /// and are dropped by the schema builder.
    pub fn parse(raw: &str) -> Option<Self> {
        FIELD_IDS.get(raw).copied()
    }

    /// Translated output column name.
    pub fn column_name(self) -> &'static str {
        match self {
            FieldId::Name => "name",
            FieldId::Organisation => "organization",
            FieldId::Email => "email",
            FieldId::InquiryType => "inquiry_type",
            FieldId::Designation => "designation",
            FieldId::MobileNumber => "phone",
            FieldId::Comments => "comments",
            FieldId::Address => "address",
            FieldId::Pincode => "pincode",
            FieldId::Purpose => "purpose",
            FieldId::Type => "type",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Uuid,
    Text,
    Timestamp,
}

impl ColumnType {
    fn sql_type(self) -> &'static str {
        match self {
            ColumnType::Uuid => "UUID",
            ColumnType::Text => "TEXT",
            ColumnType::Timestamp => "TIMESTAMPTZ",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ColumnDef {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: ColumnType,
    /// Whether clients may supply a value for this column on insert.
    #[serde(skip)]
    pub insertable: bool,
}

/// The materialized shape of one tenant's lead collection: fixed metadata
/// columns followed by the translated selected fields in input order.
#[derive(Debug, Clone, Serialize)]
pub struct LeadSchema {
    pub columns: Vec<ColumnDef>,
}

impl LeadSchema {
    /// Build a schema from a selected-field configuration. Unknown
    /// identifiers and duplicates are dropped; order is preserved.
    pub fn build(selected_fields: &[String]) -> Self {
        let mut columns = vec![
            ColumnDef {
                name: "id".to_string(),
                ty: ColumnType::Uuid,
                insertable: false,
            },
            ColumnDef {
                name: "capture_time".to_string(),
                ty: ColumnType::Timestamp,
                insertable: true,
            },
            ColumnDef {
                name: "source".to_string(),
                ty: ColumnType::Text,
                insertable: true,
            },
            ColumnDef {
                name: "created_at".to_string(),
                ty: ColumnType::Timestamp,
                insertable: false,
            },
            ColumnDef {
                name: "updated_at".to_string(),
                ty: ColumnType::Timestamp,
                insertable: false,
            },
        ];

        for raw in selected_fields {
            let Some(field) = FieldId::parse(raw) else {
                continue;
            };
            let name = field.column_name();
            if columns.iter().any(|c| c.name == name) {
                continue;
            }
            columns.push(ColumnDef {
                name: name.to_string(),
                ty: ColumnType::Text,
                insertable: true,
            });
        }

        Self { columns }
    }

    /// Column names clients may set on insert.
    pub fn insertable_columns(&self) -> impl Iterator<Item = &ColumnDef> {
        self.columns.iter().filter(|c| c.insertable)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// DDL for the lead collection. Idempotent: materialization runs it
    /// once per live tenant connection, and IF NOT EXISTS guards process
    /// restarts against an already-provisioned database.
    pub fn create_table_ddl(&self) -> String {
        let mut parts = Vec::with_capacity(self.columns.len());
        for col in &self.columns {
            let line = match col.name.as_str() {
                "id" => "    id UUID PRIMARY KEY DEFAULT gen_random_uuid()".to_string(),
                "capture_time" => {
                    "    capture_time TIMESTAMPTZ NOT NULL DEFAULT now()".to_string()
                }
                "source" => {
                    "    source TEXT NOT NULL DEFAULT 'manual' CHECK (source IN ('website', 'manual'))"
                        .to_string()
                }
                "created_at" => "    created_at TIMESTAMPTZ NOT NULL DEFAULT now()".to_string(),
                "updated_at" => "    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()".to_string(),
                name => format!("    \"{}\" {}", name, col.ty.sql_type()),
            };
            parts.push(line);
        }

        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n{}\n)",
            LEADS_TABLE,
            parts.join(",\n")
        )
    }
}
