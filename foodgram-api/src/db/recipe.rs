use std::collections::{HashMap, HashSet};

use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection as Connection, RunQueryDsl};
use itertools::Itertools;
use tracing::{debug, info};

use foodgram_types::ingredient::db::Ingredient;
use foodgram_types::recipe::db::{self as model, NewRecipe, NewRecipeIngredient, Recipe, RecipeIngredient};
use foodgram_types::schema::{ingredients, recipe_ingredients, recipe_tags, recipes, relations, tags, users};
use foodgram_types::tag::db::{RecipeTag, Tag};
use foodgram_types::user::db::User;
use foodgram_types::{CreateRecipe, IngredientAmount, ModifyRecipe, RelationKind};

use super::catalog;
use crate::utils::{CommonError, DatabaseError};

/// A recipe with everything needed to answer a read, as seen by one viewer.
#[derive(Debug, Clone)]
pub struct RecipeDetails {
    pub recipe: Recipe,
    pub author: Option<User>,
    pub is_subscribed: bool,
    pub tags: Vec<Tag>,
    pub ingredients: Vec<(RecipeIngredient, Ingredient)>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

impl From<RecipeDetails> for foodgram_types::Recipe {
    fn from(d: RecipeDetails) -> Self {
        Self {
            id: d.recipe.id,
            author: d.author.map(|a| a.into_response(d.is_subscribed)),
            created_at: d.recipe.created_at,
            name: d.recipe.name,
            image: d.recipe.image,
            text: d.recipe.text,
            cooking_time: d.recipe.cooking_time,
            tags: d.tags.into_iter().map(Into::into).collect(),
            ingredients: d.ingredients.into_iter().map(Into::into).collect(),
            is_favorited: d.is_favorited,
            is_in_shopping_cart: d.is_in_shopping_cart,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct RecipeFilter {
    pub author: Option<i32>,
    /// Tag slugs, a recipe matches when it carries any of them
    pub tags: Vec<String>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

pub async fn get_recipe(conn: &mut Connection, id: i32) -> Result<Option<Recipe>, DatabaseError> {
    Ok(recipes::table
        .find(id)
        .select(Recipe::as_select())
        .first(conn)
        .await
        .optional()?)
}

/// Row-locks the recipe and checks that `actor` wrote it.
async fn get_owned_recipe(
    conn: &mut Connection,
    actor: i32,
    id: i32,
) -> Result<Recipe, CommonError> {
    let recipe = recipes::table
        .find(id)
        .select(Recipe::as_select())
        .for_update()
        .first(conn)
        .await
        .optional()?
        .ok_or(CommonError::not_found("recipe", id))?;
    if recipe.author_id != Some(actor) {
        return Err(CommonError::Permission(format!(
            "user {} is not the author of recipe {}",
            actor, id
        )));
    }
    Ok(recipe)
}

/// Resolves every referenced tag and ingredient, failing on the first unknown id.
async fn resolve_references(
    conn: &mut Connection,
    tags: Option<&[i32]>,
    ingredients: Option<&[IngredientAmount]>,
) -> Result<(), CommonError> {
    if let Some(tags) = tags {
        catalog::resolve_tags(conn, tags).await?;
    }
    if let Some(ingredients) = ingredients {
        let ids = ingredients.iter().map(|i| i.id).collect_vec();
        catalog::resolve_ingredients(conn, &ids).await?;
    }
    Ok(())
}

async fn replace_recipe_tags(
    conn: &mut Connection,
    recipe_id: i32,
    tags: &[i32],
) -> Result<(), DatabaseError> {
    diesel::delete(recipe_tags::table.filter(recipe_tags::recipe_id.eq(recipe_id)))
        .execute(conn)
        .await?;

    if tags.is_empty() {
        return Ok(());
    }
    let links = tags
        .iter()
        .map(|&tag_id| RecipeTag { recipe_id, tag_id })
        .collect_vec();
    diesel::insert_into(recipe_tags::table)
        .values(&links)
        .execute(conn)
        .await?;
    Ok(())
}

async fn replace_recipe_ingredients(
    conn: &mut Connection,
    recipe_id: i32,
    ingredients: &[IngredientAmount],
) -> Result<(), DatabaseError> {
    diesel::delete(recipe_ingredients::table.filter(recipe_ingredients::recipe_id.eq(recipe_id)))
        .execute(conn)
        .await?;

    let links = ingredients
        .iter()
        .map(|i| NewRecipeIngredient {
            recipe_id,
            ingredient_id: i.id,
            amount: i.amount,
        })
        .collect_vec();
    diesel::insert_into(recipe_ingredients::table)
        .values(&links)
        .execute(conn)
        .await?;
    Ok(())
}

/// Creates a recipe with its tag and ingredient links in one transaction.
pub async fn create_recipe(
    conn: &mut Connection,
    author_id: i32,
    payload: CreateRecipe,
) -> Result<RecipeDetails, CommonError> {
    payload.validate()?;
    store_recipe(conn, author_id, payload).await
}

/// Writes an already validated payload. Any failure leaves no recipe row behind.
async fn store_recipe(
    conn: &mut Connection,
    author_id: i32,
    payload: CreateRecipe,
) -> Result<RecipeDetails, CommonError> {
    conn.transaction::<_, CommonError, _>(|conn| {
        async move {
            resolve_references(
                conn,
                Some(payload.tags.as_slice()),
                Some(payload.ingredients.as_slice()),
            )
            .await?;

            let recipe = diesel::insert_into(recipes::table)
                .values(&NewRecipe {
                    author_id,
                    name: payload.name,
                    text: payload.text,
                    cooking_time: payload.cooking_time,
                    image: payload.image,
                })
                .returning(Recipe::as_returning())
                .get_result(conn)
                .await?;

            replace_recipe_tags(conn, recipe.id, &payload.tags).await?;
            replace_recipe_ingredients(conn, recipe.id, &payload.ingredients).await?;
            info!(recipe_id = recipe.id, author_id, "recipe created");

            Ok(get_recipe_details(conn, Some(author_id), vec![recipe])
                .await?
                .remove(0))
        }
        .scope_boxed()
    })
    .await
}

/// Updates a recipe written by `actor`.
///
/// Scalar fields are patched, while `tags` and `ingredients` replace the
/// stored collections wholesale when present.
pub async fn update_recipe(
    conn: &mut Connection,
    actor: i32,
    id: i32,
    payload: ModifyRecipe,
) -> Result<RecipeDetails, CommonError> {
    payload.validate()?;

    conn.transaction::<_, CommonError, _>(|conn| {
        async move {
            let recipe = get_owned_recipe(conn, actor, id).await?;
            resolve_references(conn, payload.tags.as_deref(), payload.ingredients.as_deref())
                .await?;

            let recipe = if payload.keeps_scalars() {
                recipe
            } else {
                diesel::update(recipes::table.find(id))
                    .set(&model::ModifyRecipe {
                        name: payload.name,
                        text: payload.text,
                        cooking_time: payload.cooking_time,
                        image: payload.image,
                    })
                    .returning(Recipe::as_returning())
                    .get_result(conn)
                    .await?
            };

            if let Some(tags) = &payload.tags {
                replace_recipe_tags(conn, id, tags).await?;
            }
            if let Some(ingredients) = &payload.ingredients {
                replace_recipe_ingredients(conn, id, ingredients).await?;
            }
            info!(recipe_id = id, actor, "recipe updated");

            Ok(get_recipe_details(conn, Some(actor), vec![recipe])
                .await?
                .remove(0))
        }
        .scope_boxed()
    })
    .await
}

/// Deletes a recipe written by `actor` together with its links and the
/// favorite and cart entries pointing at it.
pub async fn delete_recipe(conn: &mut Connection, actor: i32, id: i32) -> Result<(), CommonError> {
    conn.transaction::<_, CommonError, _>(|conn| {
        async move {
            get_owned_recipe(conn, actor, id).await?;

            let dropped = diesel::delete(
                relations::table
                    .filter(relations::target_id.eq(id))
                    .filter(
                        relations::kind
                            .eq_any([RelationKind::Favorite, RelationKind::ShoppingCart]),
                    ),
            )
            .execute(conn)
            .await?;

            diesel::delete(recipes::table.find(id))
                .execute(conn)
                .await?;
            info!(recipe_id = id, actor, dropped, "recipe deleted");
            Ok(())
        }
        .scope_boxed()
    })
    .await
}

/// Recipes newest first.
pub async fn list_recipes(
    conn: &mut Connection,
    viewer: Option<i32>,
    filter: &RecipeFilter,
) -> Result<Vec<RecipeDetails>, DatabaseError> {
    let mut query = recipes::table
        .select(Recipe::as_select())
        .order_by((recipes::created_at.desc(), recipes::id.desc()))
        .into_boxed();

    if let Some(author) = filter.author {
        query = query.filter(recipes::author_id.eq(author));
    }
    if !filter.tags.is_empty() {
        query = query.filter(
            recipes::id.eq_any(
                recipe_tags::table
                    .inner_join(tags::table)
                    .filter(tags::slug.eq_any(filter.tags.clone()))
                    .select(recipe_tags::recipe_id),
            ),
        );
    }
    for (wanted, kind) in [
        (filter.is_favorited, RelationKind::Favorite),
        (filter.is_in_shopping_cart, RelationKind::ShoppingCart),
    ] {
        if !wanted {
            continue;
        }
        // an anonymous viewer has neither favorites nor a cart
        let Some(user_id) = viewer else {
            return Ok(vec![]);
        };
        query = query.filter(
            recipes::id.eq_any(
                relations::table
                    .filter(relations::user_id.eq(user_id))
                    .filter(relations::kind.eq(kind))
                    .select(relations::target_id),
            ),
        );
    }
    debug!(?filter, ?viewer, "listing recipes");

    let rv = query.load(conn).await?;
    get_recipe_details(conn, viewer, rv).await
}

/// Attaches authors, tags, ingredient lines and the viewer's flags.
pub async fn get_recipe_details(
    conn: &mut Connection,
    viewer: Option<i32>,
    recipes: Vec<Recipe>,
) -> Result<Vec<RecipeDetails>, DatabaseError> {
    if recipes.is_empty() {
        return Ok(vec![]);
    }

    let links = RecipeIngredient::belonging_to(&recipes)
        .inner_join(ingredients::table)
        .select((RecipeIngredient::as_select(), Ingredient::as_select()))
        .order_by(recipe_ingredients::id)
        .load::<(RecipeIngredient, Ingredient)>(conn)
        .await?;

    let recipe_tags = RecipeTag::belonging_to(&recipes)
        .inner_join(tags::table)
        .select((RecipeTag::as_select(), Tag::as_select()))
        .order_by(tags::id)
        .load::<(RecipeTag, Tag)>(conn)
        .await?;

    let recipe_ids = recipes.iter().map(|r| r.id).collect_vec();
    let author_ids = recipes.iter().filter_map(|r| r.author_id).unique().collect_vec();
    let authors: HashMap<i32, User> = users::table
        .filter(users::id.eq_any(&author_ids))
        .select(User::as_select())
        .load(conn)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    let marks: HashSet<(RelationKind, i32)> = match viewer {
        Some(user_id) => relations::table
            .filter(relations::user_id.eq(user_id))
            .filter(
                relations::kind
                    .eq_any([RelationKind::Favorite, RelationKind::ShoppingCart])
                    .and(relations::target_id.eq_any(&recipe_ids))
                    .or(relations::kind
                        .eq(RelationKind::Subscribe)
                        .and(relations::target_id.eq_any(&author_ids))),
            )
            .select((relations::kind, relations::target_id))
            .load::<(RelationKind, i32)>(conn)
            .await?
            .into_iter()
            .collect(),
        None => HashSet::new(),
    };

    let links = links.grouped_by(&recipes);
    let recipe_tags = recipe_tags.grouped_by(&recipes);

    Ok(recipes
        .into_iter()
        .zip(links)
        .zip(recipe_tags)
        .map(|((recipe, links), tags)| {
            let author = recipe.author_id.and_then(|id| authors.get(&id).cloned());
            let is_subscribed = recipe
                .author_id
                .is_some_and(|id| marks.contains(&(RelationKind::Subscribe, id)));
            RecipeDetails {
                is_favorited: marks.contains(&(RelationKind::Favorite, recipe.id)),
                is_in_shopping_cart: marks.contains(&(RelationKind::ShoppingCart, recipe.id)),
                is_subscribed,
                author,
                tags: tags.into_iter().map(|(_, tag)| tag).collect(),
                ingredients: links,
                recipe,
            }
        })
        .collect())
}
