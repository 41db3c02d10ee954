use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Legacy SoftControl client, the entity licenses are sold against.
/// Distinct from `contact`, which is the newer pipeline-facing record.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Client {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateClientRequest {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateClientRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ClientQuery {
    pub busqueda: Option<String>,
}

/// Same permissive check the dashboard forms run client-side: one `@`, a
/// dotted domain, no whitespace.
pub fn is_valid_email(email: &str) -> bool {
    if email.contains(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_validation() {
        assert!(is_valid_email("ana@softcontrol.es"));
        assert!(is_valid_email("a+b@sub.example.com"));
        assert!(!is_valid_email("sin-arroba.com"));
        assert!(!is_valid_email("dos@@arrobas.com"));
        assert!(!is_valid_email("espacio @dominio.com"));
        assert!(!is_valid_email("ana@dominio"));
        assert!(!is_valid_email("ana@.com"));
        assert!(!is_valid_email("ana@dominio."));
        assert!(!is_valid_email("@dominio.com"));
    }
}
