use super::errors::Error;
use super::fairings::db::Db;
use super::guards;
use crate::db::catalog;

use foodgram_types::{ErrorMessage, Ingredient, Tag};
use rocket::serde::json::Json;
use rocket_db_pools::Connection;

/// List all tags
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Tags listed success", body = Vec<Tag>)
    )
)]
#[get("/")]
pub async fn list_tags(
    mut db: Connection<Db>,
    _required: guards::Auth,
) -> Result<Json<Vec<Tag>>, Error> {
    let rv = catalog::list_tags(&mut db).await?;
    Ok(Json(rv.into_iter().map(Into::into).collect()))
}

/// Get a tag
#[utoipa::path(
    get,
    path = "/{id}",
    params(
        ("id" = inline(i32), Path, description = "The tag id")
    ),
    responses(
        (status = 200, description = "Tag found", body = Tag),
        (status = 404, description = "Tag not found", body = ErrorMessage)
    )
)]
#[get("/<id>")]
pub async fn get_tag(
    mut db: Connection<Db>,
    _required: guards::Auth,
    id: i32,
) -> Result<Json<Tag>, Error> {
    catalog::get_tag(&mut db, id)
        .await?
        .map(|t| Json(t.into()))
        .ok_or_else(|| Error::not_found(format!("tag not found: {}", id)))
}

/// Search ingredients by name prefix
#[utoipa::path(
    get,
    path = "/",
    params(
        ("name" = inline(Option<&str>), Query, description = "Case-insensitive name prefix")
    ),
    responses(
        (status = 200, description = "Ingredients listed success", body = Vec<Ingredient>)
    )
)]
#[get("/?<name>")]
pub async fn list_ingredients(
    mut db: Connection<Db>,
    _required: guards::Auth,
    name: Option<&str>,
) -> Result<Json<Vec<Ingredient>>, Error> {
    let rv = catalog::search_ingredients(&mut db, name).await?;
    Ok(Json(rv.into_iter().map(Into::into).collect()))
}

/// Get an ingredient
#[utoipa::path(
    get,
    path = "/{id}",
    params(
        ("id" = inline(i32), Path, description = "The ingredient id")
    ),
    responses(
        (status = 200, description = "Ingredient found", body = Ingredient),
        (status = 404, description = "Ingredient not found", body = ErrorMessage)
    )
)]
#[get("/<id>")]
pub async fn get_ingredient(
    mut db: Connection<Db>,
    _required: guards::Auth,
    id: i32,
) -> Result<Json<Ingredient>, Error> {
    catalog::get_ingredient(&mut db, id)
        .await?
        .map(|i| Json(i.into()))
        .ok_or_else(|| Error::not_found(format!("ingredient not found: {}", id)))
}

pub fn tag_routes() -> Vec<rocket::Route> {
    routes![list_tags, get_tag]
}

pub fn ingredient_routes() -> Vec<rocket::Route> {
    routes![list_ingredients, get_ingredient]
}

pub(crate) mod misc {
    use super::*;

    use utoipa::openapi::OpenApi as Document;
    use utoipa::OpenApi;

    pub struct ApiDoc;

    impl OpenApi for ApiDoc {
        fn openapi() -> Document {
            let mut tags: Document = foodgram_macro::openapi_group! {
                title: "Catalog API",
                prefix: "/api/tags",
                paths: [list_tags, get_tag],
                components: [Tag, ErrorMessage],
            };
            let ingredients: Document = foodgram_macro::openapi_group! {
                title: "Catalog API",
                prefix: "/api/ingredients",
                paths: [list_ingredients, get_ingredient],
                components: [Ingredient],
            };
            tags.merge(ingredients);
            tags
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::api::test::test_client;
    use crate::db::catalog::test::{create_ingredient, create_rand_tag};
    use crate::db::connection;
    use crate::utils::rand::rand_str;

    use rocket::http::Status;

    #[rocket::async_test]
    async fn read_tags() {
        let mut conn = connection::establish().await.unwrap();
        let tag = create_rand_tag(&mut conn).await;
        let client = test_client(tag_routes()).await;

        let response = client.get(uri!(super::list_tags)).dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        let listed: Vec<Tag> = response.into_json().await.unwrap();
        assert!(listed.iter().any(|t| t.slug == tag.slug));

        let response = client.get(uri!(super::get_tag(tag.id))).dispatch().await;
        let got: Tag = response.into_json().await.unwrap();
        assert_eq!(got.color, tag.color);

        let response = client.get(uri!(super::get_tag(i32::MAX))).dispatch().await;
        assert_eq!(response.status(), Status::NotFound);
    }

    #[rocket::async_test]
    async fn search_ingredients() {
        let mut conn = connection::establish().await.unwrap();
        let prefix = rand_str(10);
        let butter = create_ingredient(&mut conn, &format!("{} butter", prefix), "g").await;
        create_ingredient(&mut conn, &format!("{} buttermilk", prefix), "ml").await;
        let client = test_client(ingredient_routes()).await;

        let response = client
            .get(uri!(super::list_ingredients(Some(prefix.as_str()))))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        let listed: Vec<Ingredient> = response.into_json().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, butter.id);

        let response = client
            .get(uri!(super::get_ingredient(butter.id)))
            .dispatch()
            .await;
        let got: Ingredient = response.into_json().await.unwrap();
        assert_eq!(got.measurement_unit, "g");
    }
}
