use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Contact {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company_name: Option<String>,
    pub contact_type: String,
    pub status: String,
    pub source: Option<String>,
    pub score: i32,
    pub notes: Option<String>,
    pub assigned_to: Option<Uuid>,
    pub last_contact_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Customer form body as the frontend sends it. The field names are the
/// Spanish form names; the handler maps them onto the English schema.
#[derive(Debug, Deserialize)]
pub struct CreateCustomerRequest {
    pub nombre: String,
    pub correo_electronico: Option<String>,
    pub telefono: Option<String>,
    pub empresa: Option<String>,
    pub estado: Option<String>,
    pub notas: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCustomerRequest {
    pub nombre: Option<String>,
    pub correo_electronico: Option<String>,
    pub telefono: Option<String>,
    pub empresa: Option<String>,
    pub estado: Option<String>,
    pub notas: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CustomerQuery {
    pub busqueda: Option<String>,
    pub estado: Option<String>,
    pub tipo: Option<String>,
    pub page: Option<i64>,
    pub limite: Option<i64>,
}

/// Spanish form status -> English schema status. Unknown values pass
/// through untouched.
pub fn map_estado(estado: &str) -> &str {
    match estado {
        "activo" => "active",
        "inactivo" => "inactive",
        "prospecto" => "qualified",
        "lead" => "new",
        other => other,
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateScoreRequest {
    pub score: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Interaction {
    pub id: Uuid,
    pub contact_id: Uuid,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub interaction_type: String,
    pub notes: Option<String>,
    pub interaction_date: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateInteractionRequest {
    #[serde(rename = "type")]
    pub interaction_type: String,
    pub notes: Option<String>,
    pub interaction_date: Option<DateTime<Utc>>,
}

/// Bulk import rows come in with the English schema names, unlike the
/// one-at-a-time Spanish form.
#[derive(Debug, Deserialize)]
pub struct ImportContact {
    pub first_name: String,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company_name: Option<String>,
    pub contact_type: Option<String>,
    pub status: Option<String>,
    pub source: Option<String>,
    pub notes: Option<String>,
}

/// Import rows transposed into column arrays so the whole batch lands in a
/// single `INSERT ... SELECT FROM UNNEST` statement, all rows or none.
#[derive(Debug, Default)]
pub struct ImportBatch {
    pub first_names: Vec<String>,
    pub last_names: Vec<Option<String>>,
    pub emails: Vec<Option<String>>,
    pub phones: Vec<Option<String>>,
    pub company_names: Vec<Option<String>>,
    pub contact_types: Vec<String>,
    pub statuses: Vec<String>,
    pub sources: Vec<String>,
    pub notes: Vec<Option<String>>,
}

impl ImportBatch {
    pub fn from_rows(rows: &[ImportContact]) -> Self {
        let mut batch = Self::default();
        for row in rows {
            batch.first_names.push(row.first_name.trim().to_string());
            batch.last_names.push(row.last_name.clone());
            batch.emails.push(row.email.clone());
            batch.phones.push(row.phone.clone());
            batch.company_names.push(row.company_name.clone());
            batch
                .contact_types
                .push(row.contact_type.clone().unwrap_or_else(|| "lead".into()));
            batch
                .statuses
                .push(row.status.clone().unwrap_or_else(|| "new".into()));
            batch
                .sources
                .push(row.source.clone().unwrap_or_else(|| "import".into()));
            batch.notes.push(row.notes.clone());
        }
        batch
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    pub color: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateTagRequest {
    pub name: String,
    pub color: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTagRequest {
    pub name: Option<String>,
    pub color: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn import_row(first_name: &str) -> ImportContact {
        ImportContact {
            first_name: first_name.into(),
            last_name: None,
            email: None,
            phone: None,
            company_name: None,
            contact_type: None,
            status: None,
            source: None,
            notes: None,
        }
    }

    #[test]
    fn import_batch_applies_defaults() {
        let mut row = import_row("  Ana ");
        row.email = Some("ana@example.com".into());

        let batch = ImportBatch::from_rows(&[row]);
        assert_eq!(batch.first_names, vec!["Ana"]);
        assert_eq!(batch.emails, vec![Some("ana@example.com".to_string())]);
        assert_eq!(batch.contact_types, vec!["lead"]);
        assert_eq!(batch.statuses, vec!["new"]);
        assert_eq!(batch.sources, vec!["import"]);
        assert_eq!(batch.notes, vec![None]);
    }

    #[test]
    fn import_batch_keeps_explicit_values() {
        let mut row = import_row("Luis");
        row.contact_type = Some("customer".into());
        row.status = Some("active".into());
        row.source = Some("feria".into());

        let batch = ImportBatch::from_rows(&[row, import_row("Eva")]);
        assert_eq!(batch.contact_types, vec!["customer", "lead"]);
        assert_eq!(batch.statuses, vec!["active", "new"]);
        assert_eq!(batch.sources, vec!["feria", "import"]);
        assert_eq!(batch.first_names.len(), 2);
    }

    #[test]
    fn estado_mapping() {
        assert_eq!(map_estado("activo"), "active");
        assert_eq!(map_estado("inactivo"), "inactive");
        assert_eq!(map_estado("prospecto"), "qualified");
        assert_eq!(map_estado("lead"), "new");
        assert_eq!(map_estado("vip"), "vip");
    }
}
