use serde::{Deserialize, Serialize};

use crate::recipe::RecipeMini;

// API Response Types
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Whether the viewer subscribes to this user
    pub is_subscribed: bool,
}

/// An author as seen from the subscriptions page.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct Subscription {
    #[serde(flatten)]
    pub author: User,
    pub recipes: Vec<RecipeMini>,
    pub recipes_count: i64,
}

// Database Model Types
#[cfg(feature = "diesel")]
pub mod db {
    use diesel::prelude::*;
    use serde::{Deserialize, Serialize};

    #[derive(Queryable, Selectable, Identifiable, Deserialize, Serialize, Debug, Clone)]
    #[diesel(table_name = crate::users)]
    #[diesel(check_for_backend(diesel::pg::Pg))]
    pub struct User {
        pub id: i32,
        pub username: String,
        pub email: String,
        pub first_name: String,
        pub last_name: String,
        #[serde(with = "time::serde::rfc3339")]
        pub created_at: time::OffsetDateTime,
    }

    #[derive(Insertable, Debug, Clone)]
    #[diesel(table_name = crate::users)]
    pub struct NewUser {
        pub username: String,
        pub email: String,
        pub first_name: String,
        pub last_name: String,
    }

    impl User {
        pub fn into_response(self, is_subscribed: bool) -> super::User {
            super::User {
                id: self.id,
                username: self.username,
                email: self.email,
                first_name: self.first_name,
                last_name: self.last_name,
                is_subscribed,
            }
        }
    }
}
