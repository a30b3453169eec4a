use serde::{Deserialize, Serialize};

// API Response Types
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct Ingredient {
    pub id: i32,
    pub name: String,
    pub measurement_unit: String,
}

// Database Model Types
#[cfg(feature = "diesel")]
pub mod db {
    use diesel::prelude::*;
    use serde::{Deserialize, Serialize};

    #[derive(Queryable, Selectable, Identifiable, Debug, Clone, Deserialize, Serialize)]
    #[diesel(table_name = crate::ingredients)]
    #[diesel(check_for_backend(diesel::pg::Pg))]
    pub struct Ingredient {
        pub id: i32,
        pub name: String,
        pub measurement_unit: String,
    }

    #[derive(Insertable, Debug, Clone, Deserialize)]
    #[diesel(table_name = crate::ingredients)]
    pub struct NewIngredient {
        pub name: String,
        pub measurement_unit: String,
    }

    impl From<Ingredient> for super::Ingredient {
        fn from(i: Ingredient) -> Self {
            Self {
                id: i.id,
                name: i.name,
                measurement_unit: i.measurement_unit,
            }
        }
    }
}
