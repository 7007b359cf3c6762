use super::PhoneUpdate;

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq)]
pub struct Client {
    pub id: i32,
    pub firstname: String,
    pub lastname: String,
    pub email: String,
}

/// A client to be inserted, with the phones it starts out with
#[derive(Debug, Clone, Default)]
pub struct NewClient {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phones: Vec<String>,
}

impl NewClient {
    pub fn new(first_name: &str, last_name: &str, email: &str) -> Self {
        Self {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            email: email.to_string(),
            phones: Vec::new(),
        }
    }

    pub fn with_phones<I, S>(mut self, phones: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.phones = phones.into_iter().map(Into::into).collect();
        self
    }
}

/// Sparse update of a client. `None` fields keep their stored value.
#[derive(Debug, Clone, Default)]
pub struct ClientChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phones: PhoneUpdate,
}

impl ClientChanges {
    pub fn has_field_changes(&self) -> bool {
        self.first_name.is_some() || self.last_name.is_some() || self.email.is_some()
    }

    pub fn is_empty(&self) -> bool {
        !self.has_field_changes() && matches!(self.phones, PhoneUpdate::Keep)
    }
}

/// Lookup filters; an omitted field matches every row
#[derive(Debug, Clone, Default)]
pub struct ClientFilter {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// One row of the client/phone join
#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq)]
pub struct ClientPhone {
    pub client_id: i32,
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    pub phone_id: i32,
    pub number: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_changes_are_empty() {
        assert!(ClientChanges::default().is_empty());
    }

    #[test]
    fn replacing_with_no_phones_is_still_a_change() {
        let changes = ClientChanges {
            phones: PhoneUpdate::Replace(Vec::new()),
            ..Default::default()
        };
        assert!(!changes.has_field_changes());
        assert!(!changes.is_empty());
    }

    #[test]
    fn single_field_counts_as_field_change() {
        let changes = ClientChanges {
            email: Some("new@mail.ru".to_string()),
            ..Default::default()
        };
        assert!(changes.has_field_changes());
        assert!(!changes.is_empty());
    }

    #[test]
    fn new_client_collects_phones() {
        let client = NewClient::new("Ivan", "Petrov", "petrov@mail.ru")
            .with_phones(["79096785678", "79035678767"]);
        assert_eq!(client.phones, vec!["79096785678", "79035678767"]);
    }
}
