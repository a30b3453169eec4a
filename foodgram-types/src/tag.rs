use serde::{Deserialize, Serialize};

// API Response Types
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct Tag {
    pub id: i32,
    pub name: String,
    pub color: String,
    pub slug: String,
}

// Database Model Types
#[cfg(feature = "diesel")]
pub mod db {
    use diesel::prelude::*;
    use serde::{Deserialize, Serialize};

    #[derive(Queryable, Selectable, Identifiable, Debug, Clone, Deserialize, Serialize)]
    #[diesel(table_name = crate::tags)]
    #[diesel(check_for_backend(diesel::pg::Pg))]
    pub struct Tag {
        pub id: i32,
        pub name: String,
        pub color: String,
        pub slug: String,
    }

    #[derive(Insertable, Identifiable, Selectable, Queryable, Associations, Debug)]
    #[diesel(belongs_to(crate::recipe::db::Recipe))]
    #[diesel(belongs_to(Tag))]
    #[diesel(table_name = crate::recipe_tags)]
    #[diesel(primary_key(recipe_id, tag_id))]
    pub struct RecipeTag {
        pub recipe_id: i32,
        pub tag_id: i32,
    }

    impl From<Tag> for super::Tag {
        fn from(t: Tag) -> Self {
            Self {
                id: t.id,
                name: t.name,
                color: t.color,
                slug: t.slug,
            }
        }
    }
}
