use serde::{Deserialize, Serialize};

/// What a relation record links a user to.
///
/// `Favorite` and `ShoppingCart` target a recipe, `Subscribe` targets another user.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[cfg_attr(
    feature = "diesel",
    derive(diesel::expression::AsExpression, diesel::deserialize::FromSqlRow)
)]
#[cfg_attr(feature = "diesel", diesel(sql_type = diesel::sql_types::Text))]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    Favorite,
    ShoppingCart,
    Subscribe,
}

impl RelationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationKind::Favorite => "favorite",
            RelationKind::ShoppingCart => "shopping_cart",
            RelationKind::Subscribe => "subscribe",
        }
    }

    pub fn targets_recipe(&self) -> bool {
        !matches!(self, RelationKind::Subscribe)
    }
}

impl std::fmt::Display for RelationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RelationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "favorite" => Ok(RelationKind::Favorite),
            "shopping_cart" => Ok(RelationKind::ShoppingCart),
            "subscribe" => Ok(RelationKind::Subscribe),
            other => Err(format!("unknown relation kind: {}", other)),
        }
    }
}

#[cfg(feature = "diesel")]
mod sql {
    use std::io::Write;

    use diesel::deserialize::{self, FromSql};
    use diesel::pg::{Pg, PgValue};
    use diesel::serialize::{self, IsNull, Output, ToSql};
    use diesel::sql_types::Text;

    use super::RelationKind;

    impl ToSql<Text, Pg> for RelationKind {
        fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
            out.write_all(self.as_str().as_bytes())?;
            Ok(IsNull::No)
        }
    }

    impl FromSql<Text, Pg> for RelationKind {
        fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
            let raw = std::str::from_utf8(bytes.as_bytes())?;
            Ok(raw.parse()?)
        }
    }
}

// Database Model Types
#[cfg(feature = "diesel")]
pub mod db {
    use diesel::prelude::*;
    use serde::{Deserialize, Serialize};

    use super::RelationKind;

    #[derive(Queryable, Selectable, Identifiable, Deserialize, Serialize, Debug, Clone)]
    #[diesel(table_name = crate::relations)]
    #[diesel(check_for_backend(diesel::pg::Pg))]
    pub struct Relation {
        pub id: i32,
        pub user_id: i32,
        pub target_id: i32,
        pub kind: RelationKind,
        #[serde(with = "time::serde::rfc3339")]
        pub created_at: time::OffsetDateTime,
    }

    #[derive(Insertable, Debug, Clone)]
    #[diesel(table_name = crate::relations)]
    pub struct NewRelation {
        pub user_id: i32,
        pub target_id: i32,
        pub kind: RelationKind,
    }
}
