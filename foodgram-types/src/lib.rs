pub mod errors;
pub mod ingredient;
pub mod recipe;
pub mod relation;
pub mod tag;
pub mod user;

#[cfg(feature = "diesel")]
pub mod schema;

#[cfg(feature = "diesel")]
pub use schema::*;

// Re-export for convenience
pub use errors::*;
pub use ingredient::Ingredient;
pub use recipe::{CreateRecipe, IngredientAmount, ModifyRecipe, Recipe, RecipeIngredient, RecipeMini};
pub use relation::RelationKind;
pub use tag::Tag;
pub use user::{Subscription, User};
