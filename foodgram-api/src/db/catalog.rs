use std::collections::HashMap;

use diesel::prelude::*;
use diesel_async::{AsyncPgConnection as Connection, RunQueryDsl};
use tracing::debug;

use foodgram_types::ingredient::db::{Ingredient, NewIngredient};
use foodgram_types::schema::{ingredients, tags};
use foodgram_types::tag::db::Tag;

use crate::utils::{CommonError, DatabaseError};

pub async fn list_tags(conn: &mut Connection) -> Result<Vec<Tag>, DatabaseError> {
    Ok(tags::table
        .select(Tag::as_select())
        .order_by(tags::id)
        .load(conn)
        .await?)
}

pub async fn get_tag(conn: &mut Connection, id: i32) -> Result<Option<Tag>, DatabaseError> {
    Ok(tags::table
        .find(id)
        .select(Tag::as_select())
        .first(conn)
        .await
        .optional()?)
}

pub async fn get_ingredient(
    conn: &mut Connection,
    id: i32,
) -> Result<Option<Ingredient>, DatabaseError> {
    Ok(ingredients::table
        .find(id)
        .select(Ingredient::as_select())
        .first(conn)
        .await
        .optional()?)
}

fn escape_like(raw: &str) -> String {
    raw.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Ingredients whose name starts with `name`, case-insensitively.
pub async fn search_ingredients(
    conn: &mut Connection,
    name: Option<&str>,
) -> Result<Vec<Ingredient>, DatabaseError> {
    let mut query = ingredients::table
        .select(Ingredient::as_select())
        .order_by((ingredients::name, ingredients::measurement_unit))
        .into_boxed();
    if let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) {
        query = query.filter(ingredients::name.ilike(format!("{}%", escape_like(name))));
    }
    Ok(query.load(conn).await?)
}

/// Reads `name,measurement_unit` rows without a header line.
pub fn parse_ingredients<R: std::io::Read>(reader: R) -> Result<Vec<NewIngredient>, csv::Error> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_reader(reader)
        .deserialize::<(String, String)>()
        .map(|row| {
            row.map(|(name, measurement_unit)| NewIngredient {
                name,
                measurement_unit,
            })
        })
        .collect()
}

const IMPORT_BATCH: usize = 1000;

/// Inserts the pairs which are not in the catalog yet, returns how many were new.
pub async fn import_ingredients(
    conn: &mut Connection,
    items: &[NewIngredient],
) -> Result<usize, DatabaseError> {
    let mut inserted = 0;
    for batch in items.chunks(IMPORT_BATCH) {
        inserted += diesel::insert_into(ingredients::table)
            .values(batch)
            .on_conflict((ingredients::name, ingredients::measurement_unit))
            .do_nothing()
            .execute(conn)
            .await?;
    }
    debug!(total = items.len(), inserted, "imported ingredients");
    Ok(inserted)
}

/// Loads every id in `ids`, keeping the input order.
pub async fn resolve_tags(conn: &mut Connection, ids: &[i32]) -> Result<Vec<Tag>, CommonError> {
    if ids.is_empty() {
        return Ok(vec![]);
    }
    let mut found: HashMap<i32, Tag> = tags::table
        .filter(tags::id.eq_any(ids))
        .select(Tag::as_select())
        .load(conn)
        .await?
        .into_iter()
        .map(|t| (t.id, t))
        .collect();
    ids.iter()
        .map(|id| found.remove(id).ok_or(CommonError::not_found("tag", *id)))
        .collect()
}

/// Loads every id in `ids`, keeping the input order.
pub async fn resolve_ingredients(
    conn: &mut Connection,
    ids: &[i32],
) -> Result<Vec<Ingredient>, CommonError> {
    if ids.is_empty() {
        return Ok(vec![]);
    }
    let mut found: HashMap<i32, Ingredient> = ingredients::table
        .filter(ingredients::id.eq_any(ids))
        .select(Ingredient::as_select())
        .load(conn)
        .await?
        .into_iter()
        .map(|i| (i.id, i))
        .collect();
    ids.iter()
        .map(|id| {
            found
                .remove(id)
                .ok_or(CommonError::not_found("ingredient", *id))
        })
        .collect()
}
