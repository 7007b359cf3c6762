#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq)]
pub struct Phone {
    pub id: i32,
    pub client_id: i32,
    pub number: String,
}

/// What `change_client` does with a client's phones
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PhoneUpdate {
    /// Leave the stored phones alone
    #[default]
    Keep,
    /// Delete every stored phone, then insert these. An empty list clears them.
    Replace(Vec<String>),
}

impl PhoneUpdate {
    /// `None` keeps the phones, `Some(list)` replaces them with `list`
    pub fn from_option(phones: Option<Vec<String>>) -> Self {
        match phones {
            Some(phones) => Self::Replace(phones),
            None => Self::Keep,
        }
    }
}
