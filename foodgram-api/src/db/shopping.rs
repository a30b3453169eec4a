use diesel::prelude::*;
use diesel_async::{AsyncPgConnection as Connection, RunQueryDsl};
use indexmap::IndexMap;
use tracing::debug;

use foodgram_types::schema::{ingredients, recipe_ingredients, relations};
use foodgram_types::RelationKind;

use crate::utils::DatabaseError;

/// Summed amounts keyed by `(name, measurement_unit)`, in order of first encounter.
pub type ShoppingList = IndexMap<(String, String), i64>;

/// Folds ingredient lines into a [`ShoppingList`].
pub fn aggregate<I>(lines: I) -> ShoppingList
where
    I: IntoIterator<Item = (String, String, i32)>,
{
    lines
        .into_iter()
        .fold(ShoppingList::new(), |mut acc, (name, unit, amount)| {
            *acc.entry((name, unit)).or_default() += i64::from(amount);
            acc
        })
}

/// Ingredient lines of every recipe in the user's cart, ordered by when the
/// recipe went into the cart and then by position inside the recipe.
async fn cart_lines(
    conn: &mut Connection,
    user_id: i32,
) -> Result<Vec<(String, String, i32)>, DatabaseError> {
    Ok(relations::table
        .inner_join(
            recipe_ingredients::table.on(recipe_ingredients::recipe_id.eq(relations::target_id)),
        )
        .inner_join(ingredients::table.on(ingredients::id.eq(recipe_ingredients::ingredient_id)))
        .filter(relations::user_id.eq(user_id))
        .filter(relations::kind.eq(RelationKind::ShoppingCart))
        .order_by((
            relations::created_at,
            relations::id,
            recipe_ingredients::id,
        ))
        .select((
            ingredients::name,
            ingredients::measurement_unit,
            recipe_ingredients::amount,
        ))
        .load(conn)
        .await?)
}

pub async fn shopping_list(
    conn: &mut Connection,
    user_id: i32,
) -> Result<ShoppingList, DatabaseError> {
    let lines = cart_lines(conn, user_id).await?;
    let rv = aggregate(lines);
    debug!(user_id, items = rv.len(), "shopping list aggregated");
    Ok(rv)
}
