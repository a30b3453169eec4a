use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::errors::ValidationError;
use crate::tag::Tag;
use crate::user::User;

pub const NAME_MAX_LENGTH: usize = 199;

// API Request Types
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct IngredientAmount {
    /// Ingredient id in the catalog
    pub id: i32,
    pub amount: i32,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct CreateRecipe {
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
    #[serde(default)]
    pub image: Option<String>,
    pub tags: Vec<i32>,
    pub ingredients: Vec<IngredientAmount>,
}

/// Partial update of a recipe.
///
/// Scalar fields left as `None` keep their stored value. `tags` and
/// `ingredients`, when present, replace the whole collection.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct ModifyRecipe {
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i32>,
    pub image: Option<String>,
    pub tags: Option<Vec<i32>>,
    pub ingredients: Option<Vec<IngredientAmount>>,
}

// API Response Types
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct RecipeIngredient {
    /// Ingredient id in the catalog
    pub id: i32,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct Recipe {
    pub id: i32,
    pub author: Option<User>,
    #[cfg_attr(feature = "utoipa", schema(format = DateTime, value_type=String))]
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: time::OffsetDateTime,
    pub name: String,
    pub image: Option<String>,
    pub text: String,
    pub cooking_time: i32,
    pub tags: Vec<Tag>,
    pub ingredients: Vec<RecipeIngredient>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct RecipeMini {
    pub id: i32,
    pub name: String,
    pub image: Option<String>,
    pub cooking_time: i32,
}

pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    let length = name.chars().count();
    if length == 0 || length > NAME_MAX_LENGTH {
        return Err(ValidationError::new(
            "name",
            format!("must be between 1 and {} characters", NAME_MAX_LENGTH),
        ));
    }
    Ok(())
}

pub fn validate_cooking_time(cooking_time: i32) -> Result<(), ValidationError> {
    if cooking_time < 1 {
        return Err(ValidationError::new(
            "cooking_time",
            "must be at least 1 minute",
        ));
    }
    Ok(())
}

pub fn validate_tags(tags: &[i32]) -> Result<(), ValidationError> {
    let mut seen = HashSet::with_capacity(tags.len());
    if let Some(dup) = tags.iter().find(|id| !seen.insert(**id)) {
        return Err(ValidationError::new(
            "tags",
            format!("tag {} is listed more than once", dup),
        ));
    }
    Ok(())
}

pub fn validate_ingredients(ingredients: &[IngredientAmount]) -> Result<(), ValidationError> {
    if ingredients.is_empty() {
        return Err(ValidationError::new(
            "ingredients",
            "at least one ingredient is required",
        ));
    }
    let mut seen = HashSet::with_capacity(ingredients.len());
    for item in ingredients {
        if item.amount < 1 {
            return Err(ValidationError::new(
                "ingredients",
                format!("amount of ingredient {} must be at least 1", item.id),
            ));
        }
        if !seen.insert(item.id) {
            return Err(ValidationError::new(
                "ingredients",
                format!("ingredient {} is listed more than once", item.id),
            ));
        }
    }
    Ok(())
}

impl CreateRecipe {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_name(&self.name)?;
        validate_cooking_time(self.cooking_time)?;
        validate_tags(&self.tags)?;
        validate_ingredients(&self.ingredients)
    }
}

impl ModifyRecipe {
    /// True when none of the scalar columns is touched.
    pub fn keeps_scalars(&self) -> bool {
        self.name.is_none()
            && self.text.is_none()
            && self.cooking_time.is_none()
            && self.image.is_none()
    }

    pub fn is_empty(&self) -> bool {
        self.keeps_scalars() && self.tags.is_none() && self.ingredients.is_none()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.is_empty() {
            return Err(ValidationError::new("recipe", "no changes"));
        }
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(cooking_time) = self.cooking_time {
            validate_cooking_time(cooking_time)?;
        }
        if let Some(tags) = &self.tags {
            validate_tags(tags)?;
        }
        if let Some(ingredients) = &self.ingredients {
            validate_ingredients(ingredients)?;
        }
        Ok(())
    }
}

// Database Model Types
#[cfg(feature = "diesel")]
pub mod db {
    use diesel::prelude::*;
    use serde::{Deserialize, Serialize};

    use crate::ingredient::db::Ingredient;
    use crate::user::db::User;

    #[derive(
        Queryable,
        Selectable,
        Identifiable,
        Associations,
        Deserialize,
        Serialize,
        PartialEq,
        Eq,
        Debug,
        Clone,
    )]
    #[diesel(belongs_to(User, foreign_key = author_id))]
    #[diesel(table_name = crate::recipes)]
    #[diesel(check_for_backend(diesel::pg::Pg))]
    pub struct Recipe {
        pub id: i32,
        pub author_id: Option<i32>,
        #[serde(with = "time::serde::rfc3339")]
        pub created_at: time::OffsetDateTime,
        pub name: String,
        pub text: String,
        pub cooking_time: i32,
        pub image: Option<String>,
    }

    #[derive(Insertable, Debug, Clone)]
    #[diesel(table_name = crate::recipes)]
    pub struct NewRecipe {
        pub author_id: i32,
        pub name: String,
        pub text: String,
        pub cooking_time: i32,
        pub image: Option<String>,
    }

    #[derive(AsChangeset, Debug, Clone)]
    #[diesel(table_name = crate::recipes)]
    pub struct ModifyRecipe {
        pub name: Option<String>,
        pub text: Option<String>,
        pub cooking_time: Option<i32>,
        pub image: Option<String>,
    }

    #[derive(Queryable, Selectable, Identifiable, Associations, Debug, Clone)]
    #[diesel(belongs_to(Recipe))]
    #[diesel(belongs_to(Ingredient))]
    #[diesel(table_name = crate::recipe_ingredients)]
    #[diesel(check_for_backend(diesel::pg::Pg))]
    pub struct RecipeIngredient {
        pub id: i32,
        pub recipe_id: i32,
        pub ingredient_id: i32,
        pub amount: i32,
    }

    #[derive(Insertable, Debug, Clone)]
    #[diesel(table_name = crate::recipe_ingredients)]
    pub struct NewRecipeIngredient {
        pub recipe_id: i32,
        pub ingredient_id: i32,
        pub amount: i32,
    }

    impl From<Recipe> for super::RecipeMini {
        fn from(r: Recipe) -> Self {
            Self {
                id: r.id,
                name: r.name,
                image: r.image,
                cooking_time: r.cooking_time,
            }
        }
    }

    impl From<(RecipeIngredient, Ingredient)> for super::RecipeIngredient {
        fn from((link, ingredient): (RecipeIngredient, Ingredient)) -> Self {
            Self {
                id: ingredient.id,
                name: ingredient.name,
                measurement_unit: ingredient.measurement_unit,
                amount: link.amount,
            }
        }
    }
}
