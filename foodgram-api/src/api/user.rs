use super::errors::Error;
use super::fairings::db::Db;
use super::guards::{self, CurrentUser};
use crate::db::{relation, user};

use foodgram_types::{ErrorMessage, RecipeMini, RelationKind, Subscription, User};
use rocket::http::Status;
use rocket::response::status::Created;
use rocket::serde::json::Json;
use rocket_db_pools::Connection;

fn recipes_limit(raw: Option<i64>) -> Result<Option<usize>, Error> {
    raw.map(|n| {
        usize::try_from(n).map_err(|_| Error::bad_request("recipes_limit must not be negative"))
    })
    .transpose()
}

/// Get a user profile
#[utoipa::path(
    get,
    path = "/{id}",
    params(
        ("id" = inline(i32), Path, description = "The user id")
    ),
    responses(
        (status = 200, description = "User found", body = User),
        (status = 404, description = "User not found", body = ErrorMessage)
    )
)]
#[get("/<id>")]
pub async fn get_user(
    mut db: Connection<Db>,
    _required: guards::Auth,
    viewer: Option<CurrentUser>,
    id: i32,
) -> Result<Json<User>, Error> {
    let m = user::get_user(&mut db, id)
        .await?
        .ok_or_else(|| Error::not_found(format!("user not found: {}", id)))?;
    let is_subscribed = match viewer {
        Some(CurrentUser(viewer)) => {
            relation::exists(&mut db, viewer, RelationKind::Subscribe, id).await?
        }
        None => false,
    };
    Ok(Json(m.into_response(is_subscribed)))
}

/// List the authors the current user subscribes to
#[utoipa::path(
    get,
    path = "/subscriptions",
    params(
        ("recipes_limit" = inline(Option<i64>), Query, description = "How many recipes to show per author")
    ),
    responses(
        (status = 200, description = "Subscriptions listed success", body = Vec<Subscription>)
    )
)]
#[get("/subscriptions?<recipes_limit>")]
pub async fn list_subscriptions(
    mut db: Connection<Db>,
    _required: guards::Auth,
    user: CurrentUser,
    recipes_limit: Option<i64>,
) -> Result<Json<Vec<Subscription>>, Error> {
    let limit = self::recipes_limit(recipes_limit)?;
    let rv = user::list_subscriptions(&mut db, user.0, limit).await?;
    Ok(Json(rv.into_iter().map(Into::into).collect()))
}

/// Subscribe to an author
#[utoipa::path(
    post,
    path = "/{id}/subscribe",
    params(
        ("id" = inline(i32), Path, description = "The author id"),
        ("recipes_limit" = inline(Option<i64>), Query, description = "How many recipes to show")
    ),
    responses(
        (status = 201, description = "Subscribed", body = Subscription),
        (status = 400, description = "Subscribing to yourself", body = ErrorMessage),
        (status = 404, description = "Author not found", body = ErrorMessage),
        (status = 409, description = "Already subscribed", body = ErrorMessage)
    )
)]
#[post("/<id>/subscribe?<recipes_limit>")]
pub async fn subscribe(
    mut db: Connection<Db>,
    _required: guards::Auth,
    user: CurrentUser,
    id: i32,
    recipes_limit: Option<i64>,
) -> Result<Created<Json<Subscription>>, Error> {
    let limit = self::recipes_limit(recipes_limit)?;
    relation::add(&mut db, user.0, RelationKind::Subscribe, id).await?;

    let author = user::get_user(&mut db, id)
        .await?
        .ok_or_else(|| Error::not_found(format!("user not found: {}", id)))?;
    let rv = user::get_subscription_details(&mut db, vec![author], limit)
        .await?
        .remove(0);
    Ok(Created::new(format!("/api/users/{}", id)).body(Json(rv.into())))
}

/// Unsubscribe from an author
#[utoipa::path(
    delete,
    path = "/{id}/subscribe",
    params(
        ("id" = inline(i32), Path, description = "The author id")
    ),
    responses(
        (status = 204, description = "Unsubscribed"),
        (status = 404, description = "Not subscribed", body = ErrorMessage)
    )
)]
#[delete("/<id>/subscribe")]
pub async fn unsubscribe(
    mut db: Connection<Db>,
    _required: guards::Auth,
    user: CurrentUser,
    id: i32,
) -> Result<Status, Error> {
    relation::remove(&mut db, user.0, RelationKind::Subscribe, id).await?;
    Ok(Status::NoContent)
}

pub fn routes() -> Vec<rocket::Route> {
    routes![get_user, list_subscriptions, subscribe, unsubscribe]
}

pub(crate) mod misc {
    use super::*;

    use utoipa::OpenApi;

    pub struct ApiDoc;

    impl OpenApi for ApiDoc {
        fn openapi() -> utoipa::openapi::OpenApi {
            foodgram_macro::openapi_group! {
                title: "Users API",
                prefix: "/api/users",
                paths: [get_user, list_subscriptions, subscribe, unsubscribe],
                components: [User, Subscription, RecipeMini, ErrorMessage],
            }
        }
    }
}
