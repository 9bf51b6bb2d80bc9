use serde::{Deserialize, Serialize};

use super::UserContact;

/// Profile row mirrored from the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl From<User> for UserContact {
    fn from(u: User) -> Self {
        UserContact {
            email: u.email.filter(|e| !e.trim().is_empty()),
            name: u.full_name.or(u.name),
        }
    }
}

/// Authenticated caller, injected by the bearer-token middleware.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: String,
}
