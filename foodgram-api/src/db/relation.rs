use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection as Connection, RunQueryDsl};
use tracing::info;

use foodgram_types::relation::db::{NewRelation, Relation};
use foodgram_types::schema::{recipes, relations, users};
use foodgram_types::{RelationKind, ValidationError};

use crate::utils::{CommonError, DatabaseError};

fn entity_of(kind: RelationKind) -> &'static str {
    if kind.targets_recipe() {
        "recipe"
    } else {
        "user"
    }
}

/// Locks the target row for the rest of the transaction so it cannot
/// disappear before the relation is written.
async fn lock_target(
    conn: &mut Connection,
    kind: RelationKind,
    target_id: i32,
) -> Result<(), CommonError> {
    let found = if kind.targets_recipe() {
        recipes::table
            .find(target_id)
            .select(recipes::id)
            .for_share()
            .first::<i32>(conn)
            .await
            .optional()?
    } else {
        users::table
            .find(target_id)
            .select(users::id)
            .for_share()
            .first::<i32>(conn)
            .await
            .optional()?
    };
    found
        .map(|_| ())
        .ok_or(CommonError::not_found(entity_of(kind), target_id))
}

/// Records that `user_id` favorites, carts or subscribes to `target_id`.
///
/// The unique index on `(user_id, kind, target_id)` decides concurrent adds,
/// the loser gets [`CommonError::Conflict`].
pub async fn add(
    conn: &mut Connection,
    user_id: i32,
    kind: RelationKind,
    target_id: i32,
) -> Result<Relation, CommonError> {
    if kind == RelationKind::Subscribe && user_id == target_id {
        return Err(ValidationError::new("author", "cannot subscribe to yourself").into());
    }

    conn.transaction::<_, CommonError, _>(|conn| {
        async move {
            lock_target(conn, kind, target_id).await?;

            let rv = diesel::insert_into(relations::table)
                .values(&NewRelation {
                    user_id,
                    target_id,
                    kind,
                })
                .returning(Relation::as_returning())
                .get_result(conn)
                .await
                .map_err(|e| match DatabaseError::from(e) {
                    DatabaseError::DuplicationError { .. } => CommonError::Conflict(format!(
                        "{} of {} {}",
                        kind,
                        entity_of(kind),
                        target_id
                    )),
                    DatabaseError::CheckViolation { .. } => {
                        ValidationError::new("author", "cannot subscribe to yourself").into()
                    }
                    e => e.into(),
                })?;
            info!(user_id, %kind, target_id, "relation added");
            Ok(rv)
        }
        .scope_boxed()
    })
    .await
}

/// Drops a relation, failing with [`CommonError::NotFound`] when there is none.
pub async fn remove(
    conn: &mut Connection,
    user_id: i32,
    kind: RelationKind,
    target_id: i32,
) -> Result<(), CommonError> {
    let deleted = diesel::delete(
        relations::table
            .filter(relations::user_id.eq(user_id))
            .filter(relations::kind.eq(kind))
            .filter(relations::target_id.eq(target_id)),
    )
    .execute(conn)
    .await?;

    if deleted == 0 {
        return Err(CommonError::not_found(kind.as_str(), target_id));
    }
    info!(user_id, %kind, target_id, "relation removed");
    Ok(())
}

pub async fn exists(
    conn: &mut Connection,
    user_id: i32,
    kind: RelationKind,
    target_id: i32,
) -> Result<bool, DatabaseError> {
    Ok(diesel::select(diesel::dsl::exists(
        relations::table
            .filter(relations::user_id.eq(user_id))
            .filter(relations::kind.eq(kind))
            .filter(relations::target_id.eq(target_id)),
    ))
    .get_result(conn)
    .await?)
}

/// Target ids of one kind, oldest relation first.
pub async fn targets(
    conn: &mut Connection,
    user_id: i32,
    kind: RelationKind,
) -> Result<Vec<i32>, DatabaseError> {
    Ok(relations::table
        .filter(relations::user_id.eq(user_id))
        .filter(relations::kind.eq(kind))
        .order_by((relations::created_at, relations::id))
        .select(relations::target_id)
        .load(conn)
        .await?)
}
