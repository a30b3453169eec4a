use diesel::prelude::*;
use diesel_async::{AsyncPgConnection as Connection, RunQueryDsl};
use itertools::Itertools;

use foodgram_types::recipe::db::Recipe;
use foodgram_types::schema::{recipes, users};
use foodgram_types::user::db::User;
use foodgram_types::RelationKind;

use super::relation;
use crate::utils::DatabaseError;

#[derive(Debug, Clone)]
pub struct SubscriptionDetails {
    pub author: User,
    /// Newest first, cut to the requested limit
    pub recipes: Vec<Recipe>,
    pub recipes_count: i64,
}

impl From<SubscriptionDetails> for foodgram_types::Subscription {
    fn from(d: SubscriptionDetails) -> Self {
        Self {
            author: d.author.into_response(true),
            recipes: d.recipes.into_iter().map(Into::into).collect(),
            recipes_count: d.recipes_count,
        }
    }
}

pub async fn get_user(conn: &mut Connection, id: i32) -> Result<Option<User>, DatabaseError> {
    Ok(users::table
        .find(id)
        .select(User::as_select())
        .first(conn)
        .await
        .optional()?)
}

/// Attaches each author's recipes, keeping at most `recipes_limit` of them.
pub async fn get_subscription_details(
    conn: &mut Connection,
    authors: Vec<User>,
    recipes_limit: Option<usize>,
) -> Result<Vec<SubscriptionDetails>, DatabaseError> {
    let written = Recipe::belonging_to(&authors)
        .select(Recipe::as_select())
        .order_by((recipes::created_at.desc(), recipes::id.desc()))
        .load::<Recipe>(conn)
        .await?
        .grouped_by(&authors);

    Ok(authors
        .into_iter()
        .zip(written)
        .map(|(author, mut recipes)| {
            let recipes_count = recipes.len() as i64;
            if let Some(limit) = recipes_limit {
                recipes.truncate(limit);
            }
            SubscriptionDetails {
                author,
                recipes,
                recipes_count,
            }
        })
        .collect())
}

/// Authors `user_id` subscribes to, in subscription order.
pub async fn list_subscriptions(
    conn: &mut Connection,
    user_id: i32,
    recipes_limit: Option<usize>,
) -> Result<Vec<SubscriptionDetails>, DatabaseError> {
    let ids = relation::targets(conn, user_id, RelationKind::Subscribe).await?;
    let mut authors = users::table
        .filter(users::id.eq_any(&ids))
        .select(User::as_select())
        .load::<User>(conn)
        .await?;
    authors.sort_by_key(|a| ids.iter().position(|id| *id == a.id));

    get_subscription_details(conn, authors, recipes_limit).await
}
