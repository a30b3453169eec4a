use super::configs::Config;
use super::errors::Error;
use super::fairings::db::Db;
use super::guards::{self, CurrentUser};
use crate::db::recipe::{self as composer, RecipeFilter};
use crate::db::{relation, shopping};
use crate::render;

use foodgram_types::{
    CreateRecipe, ErrorMessage, IngredientAmount, ModifyRecipe, Recipe, RecipeIngredient,
    RecipeMini, RelationKind, Tag, User,
};
use rocket::http::{Header, Status};
use rocket::response::status::Created;
use rocket::serde::json::Json;
use rocket::State;
use rocket_db_pools::Connection;
use tracing::debug;

/// Create a new recipe
#[utoipa::path(
    post,
    path = "/",
    request_body = CreateRecipe,
    responses(
        (status = 201, description = "Recipe created success", body = Recipe),
        (status = 400, description = "Invalid recipe", body = ErrorMessage),
        (status = 404, description = "Unknown tag or ingredient", body = ErrorMessage)
    )
)]
#[post("/", format = "application/json", data = "<payload>")]
pub async fn create_recipe(
    mut db: Connection<Db>,
    _required: guards::Auth,
    user: CurrentUser,
    payload: Json<CreateRecipe>,
) -> Result<Created<Json<Recipe>>, Error> {
    let rv: Recipe = composer::create_recipe(&mut db, user.0, payload.into_inner())
        .await?
        .into();
    Ok(Created::new(format!("/api/recipes/{}", rv.id)).body(Json(rv)))
}

/// List recipes, newest first
#[utoipa::path(
    get,
    path = "/",
    params(
        ("author" = inline(Option<i32>), Query, description = "Only recipes of this author"),
        ("tags" = inline(Option<Vec<String>>), Query, description = "Tag slugs, any of them matches"),
        ("is_favorited" = inline(Option<bool>), Query, description = "Only the viewer's favorites"),
        ("is_in_shopping_cart" = inline(Option<bool>), Query, description = "Only recipes in the viewer's cart")
    ),
    responses(
        (status = 200, description = "Recipes listed success", body = Vec<Recipe>)
    )
)]
#[get("/?<author>&<tags>&<is_favorited>&<is_in_shopping_cart>")]
pub async fn list_recipes(
    mut db: Connection<Db>,
    _required: guards::Auth,
    viewer: Option<CurrentUser>,
    author: Option<i32>,
    tags: Vec<String>,
    is_favorited: Option<bool>,
    is_in_shopping_cart: Option<bool>,
) -> Result<Json<Vec<Recipe>>, Error> {
    let filter = RecipeFilter {
        author,
        tags,
        is_favorited: is_favorited.unwrap_or_default(),
        is_in_shopping_cart: is_in_shopping_cart.unwrap_or_default(),
    };
    let rv = composer::list_recipes(&mut db, viewer.map(|u| u.0), &filter).await?;
    debug!(count = rv.len(), "recipes listed");

    Ok(Json(rv.into_iter().map(Into::into).collect()))
}

/// Get a recipe
#[utoipa::path(
    get,
    path = "/{id}",
    params(
        ("id" = inline(i32), Path, description = "The recipe id")
    ),
    responses(
        (status = 200, description = "Recipe found", body = Recipe),
        (status = 404, description = "Recipe not found", body = ErrorMessage)
    )
)]
#[get("/<id>")]
pub async fn get_recipe(
    mut db: Connection<Db>,
    _required: guards::Auth,
    viewer: Option<CurrentUser>,
    id: i32,
) -> Result<Json<Recipe>, Error> {
    let m = composer::get_recipe(&mut db, id)
        .await?
        .ok_or_else(|| Error::not_found(format!("recipe not found: {}", id)))?;
    let rv = composer::get_recipe_details(&mut db, viewer.map(|u| u.0), vec![m])
        .await?
        .remove(0);
    Ok(Json(rv.into()))
}

/// Update a recipe
///
/// `tags` and `ingredients` replace the stored collections when given.
#[utoipa::path(
    patch,
    path = "/{id}",
    params(
        ("id" = inline(i32), Path, description = "The recipe id to be updated")
    ),
    request_body = ModifyRecipe,
    responses(
        (status = 200, description = "Recipe updated success", body = Recipe),
        (status = 400, description = "Invalid changes", body = ErrorMessage),
        (status = 403, description = "Not the author", body = ErrorMessage),
        (status = 404, description = "Recipe not found", body = ErrorMessage)
    )
)]
#[patch("/<id>", format = "application/json", data = "<payload>")]
pub async fn update_recipe(
    mut db: Connection<Db>,
    _required: guards::Auth,
    user: CurrentUser,
    id: i32,
    payload: Json<ModifyRecipe>,
) -> Result<Json<Recipe>, Error> {
    let rv = composer::update_recipe(&mut db, user.0, id, payload.into_inner()).await?;
    Ok(Json(rv.into()))
}

/// Delete a recipe
#[utoipa::path(
    delete,
    path = "/{id}",
    params(
        ("id" = inline(i32), Path, description = "The recipe id to be deleted")
    ),
    responses(
        (status = 204, description = "Recipe deleted success"),
        (status = 403, description = "Not the author", body = ErrorMessage),
        (status = 404, description = "Recipe not found", body = ErrorMessage)
    )
)]
#[delete("/<id>")]
pub async fn delete_recipe(
    mut db: Connection<Db>,
    _required: guards::Auth,
    user: CurrentUser,
    id: i32,
) -> Result<Status, Error> {
    composer::delete_recipe(&mut db, user.0, id).await?;
    Ok(Status::NoContent)
}

async fn mark_recipe(
    db: &mut Connection<Db>,
    user: CurrentUser,
    kind: RelationKind,
    id: i32,
) -> Result<Created<Json<RecipeMini>>, Error> {
    relation::add(db, user.0, kind, id).await?;
    let m = composer::get_recipe(db, id)
        .await?
        .ok_or_else(|| Error::not_found(format!("recipe not found: {}", id)))?;
    Ok(Created::new(format!("/api/recipes/{}", id)).body(Json(m.into())))
}

/// Add a recipe to favorites
#[utoipa::path(
    post,
    path = "/{id}/favorite",
    params(
        ("id" = inline(i32), Path, description = "The recipe id")
    ),
    responses(
        (status = 201, description = "Favorite added", body = RecipeMini),
        (status = 404, description = "Recipe not found", body = ErrorMessage),
        (status = 409, description = "Already a favorite", body = ErrorMessage)
    )
)]
#[post("/<id>/favorite")]
pub async fn add_favorite(
    mut db: Connection<Db>,
    _required: guards::Auth,
    user: CurrentUser,
    id: i32,
) -> Result<Created<Json<RecipeMini>>, Error> {
    mark_recipe(&mut db, user, RelationKind::Favorite, id).await
}

/// Remove a recipe from favorites
#[utoipa::path(
    delete,
    path = "/{id}/favorite",
    params(
        ("id" = inline(i32), Path, description = "The recipe id")
    ),
    responses(
        (status = 204, description = "Favorite removed"),
        (status = 404, description = "Not a favorite", body = ErrorMessage)
    )
)]
#[delete("/<id>/favorite")]
pub async fn remove_favorite(
    mut db: Connection<Db>,
    _required: guards::Auth,
    user: CurrentUser,
    id: i32,
) -> Result<Status, Error> {
    relation::remove(&mut db, user.0, RelationKind::Favorite, id).await?;
    Ok(Status::NoContent)
}

/// Put a recipe into the shopping cart
#[utoipa::path(
    post,
    path = "/{id}/shopping_cart",
    params(
        ("id" = inline(i32), Path, description = "The recipe id")
    ),
    responses(
        (status = 201, description = "Recipe added to the cart", body = RecipeMini),
        (status = 404, description = "Recipe not found", body = ErrorMessage),
        (status = 409, description = "Already in the cart", body = ErrorMessage)
    )
)]
#[post("/<id>/shopping_cart")]
pub async fn add_to_shopping_cart(
    mut db: Connection<Db>,
    _required: guards::Auth,
    user: CurrentUser,
    id: i32,
) -> Result<Created<Json<RecipeMini>>, Error> {
    mark_recipe(&mut db, user, RelationKind::ShoppingCart, id).await
}

/// Take a recipe out of the shopping cart
#[utoipa::path(
    delete,
    path = "/{id}/shopping_cart",
    params(
        ("id" = inline(i32), Path, description = "The recipe id")
    ),
    responses(
        (status = 204, description = "Recipe removed from the cart"),
        (status = 404, description = "Not in the cart", body = ErrorMessage)
    )
)]
#[delete("/<id>/shopping_cart")]
pub async fn remove_from_shopping_cart(
    mut db: Connection<Db>,
    _required: guards::Auth,
    user: CurrentUser,
    id: i32,
) -> Result<Status, Error> {
    relation::remove(&mut db, user.0, RelationKind::ShoppingCart, id).await?;
    Ok(Status::NoContent)
}

pub const SHOPPING_LIST_FILENAME: &str = "shopping_list.pdf";

#[derive(Responder)]
#[response(content_type = "application/pdf")]
pub struct PdfAttachment {
    inner: Vec<u8>,
    disposition: Header<'static>,
}

impl PdfAttachment {
    fn new(bytes: Vec<u8>, filename: &str) -> Self {
        Self {
            inner: bytes,
            disposition: Header::new(
                "Content-Disposition",
                format!("attachment; filename=\"{}\"", filename),
            ),
        }
    }
}

/// Download the summed ingredients of the shopping cart as PDF
#[utoipa::path(
    get,
    path = "/download_shopping_cart",
    responses(
        (status = 200, description = "Shopping list document", content_type = "application/pdf", body = Vec<u8>)
    )
)]
#[get("/download_shopping_cart")]
pub async fn download_shopping_cart(
    mut db: Connection<Db>,
    _required: guards::Auth,
    user: CurrentUser,
    config: &State<Config>,
) -> Result<PdfAttachment, Error> {
    let list = shopping::shopping_list(&mut db, user.0).await?;
    let bytes = render::render(&config.document_title, &list)?;
    Ok(PdfAttachment::new(bytes, SHOPPING_LIST_FILENAME))
}

pub fn routes() -> Vec<rocket::Route> {
    routes![
        create_recipe,
        list_recipes,
        get_recipe,
        update_recipe,
        delete_recipe,
        add_favorite,
        remove_favorite,
        add_to_shopping_cart,
        remove_from_shopping_cart,
        download_shopping_cart
    ]
}

pub(crate) mod misc {
    use super::*;

    use utoipa::OpenApi;

    pub struct ApiDoc;

    impl OpenApi for ApiDoc {
        fn openapi() -> utoipa::openapi::OpenApi {
            foodgram_macro::openapi_group! {
                title: "Recipes API",
                prefix: "/api/recipes",
                paths: [
                    create_recipe,
                    list_recipes,
                    get_recipe,
                    update_recipe,
                    delete_recipe,
                    add_favorite,
                    remove_favorite,
                    add_to_shopping_cart,
                    remove_from_shopping_cart,
                    download_shopping_cart
                ],
                components: [
                    CreateRecipe,
                    ModifyRecipe,
                    IngredientAmount,
                    Recipe,
                    RecipeIngredient,
                    RecipeMini,
                    Tag,
                    User,
                    ErrorMessage
                ],
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::api::test::{as_user, test_client};
    use crate::db::catalog::test::{create_ingredient, create_rand_ingredient, create_rand_tag};
    use crate::db::connection;
    use crate::db::user::test::create_rand_user;
    use crate::utils::rand::rand_str;

    use rocket::http::ContentType;
    use rocket::local::asynchronous::Client;

    fn payload(tags: Vec<i32>, ingredients: Vec<(i32, i32)>) -> CreateRecipe {
        CreateRecipe {
            name: rand_str(16),
            text: "Mix and bake.".to_string(),
            cooking_time: 30,
            image: Some("recipes/images/cake.png".to_string()),
            tags,
            ingredients: ingredients
                .into_iter()
                .map(|(id, amount)| IngredientAmount { id, amount })
                .collect(),
        }
    }

    async fn post_recipe(client: &Client, user_id: i32, payload: &CreateRecipe) -> Recipe {
        let response = client
            .post(uri!(super::create_recipe))
            .header(as_user(user_id))
            .json(payload)
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Created);
        response.into_json().await.unwrap()
    }

    #[rocket::async_test]
    async fn create_and_get_recipe() {
        let mut conn = connection::establish().await.unwrap();
        let author = create_rand_user(&mut conn).await;
        let tag = create_rand_tag(&mut conn).await;
        let flour = create_rand_ingredient(&mut conn, "g").await;
        let client = test_client(routes()).await;

        let payload = payload(vec![tag.id], vec![(flour.id, 250)]);
        let added = post_recipe(&client, author.id, &payload).await;
        assert!(added.id > 0);
        assert_eq!(added.name, payload.name);
        assert_eq!(added.image, payload.image);
        assert_eq!(added.author.as_ref().map(|a| a.id), Some(author.id));
        assert_eq!(added.tags[0].slug, tag.slug);
        assert_eq!(added.ingredients[0].measurement_unit, "g");
        assert_eq!(added.ingredients[0].amount, 250);

        let response = client
            .get(uri!(super::get_recipe(added.id)))
            .header(as_user(author.id))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        let fetched: Recipe = response.into_json().await.unwrap();
        assert_eq!(fetched, added);

        // anonymous readers see the recipe with both flags off
        let response = client.get(uri!(super::get_recipe(added.id))).dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        let anonymous: Recipe = response.into_json().await.unwrap();
        assert!(!anonymous.is_favorited && !anonymous.is_in_shopping_cart);

        let response = client.get(uri!(super::get_recipe(i32::MAX))).dispatch().await;
        assert_eq!(response.status(), Status::NotFound);
    }

    #[rocket::async_test]
    async fn create_rejects_invalid_payloads() {
        let mut conn = connection::establish().await.unwrap();
        let author = create_rand_user(&mut conn).await;
        let flour = create_rand_ingredient(&mut conn, "g").await;
        let client = test_client(routes()).await;

        let response = client
            .post(uri!(super::create_recipe))
            .json(&payload(vec![], vec![(flour.id, 1)]))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Unauthorized);

        let mut invalid = payload(vec![], vec![(flour.id, 1)]);
        invalid.cooking_time = 0;
        let response = client
            .post(uri!(super::create_recipe))
            .header(as_user(author.id))
            .json(&invalid)
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::BadRequest);
        let body: ErrorMessage = response.into_json().await.unwrap();
        assert_eq!(body.field.as_deref(), Some("cooking_time"));

        let response = client
            .post(uri!(super::create_recipe))
            .header(as_user(author.id))
            .json(&payload(vec![], vec![(flour.id, 1), (flour.id, 2)]))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::BadRequest);

        let response = client
            .post(uri!(super::create_recipe))
            .header(as_user(author.id))
            .json(&payload(vec![i32::MAX], vec![(flour.id, 1)]))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::NotFound);

        let response = client
            .post(uri!(super::create_recipe))
            .header(as_user(author.id))
            .header(ContentType::JSON)
            .body(r#"{"name": "no fields"}"#)
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::UnprocessableEntity);
    }

    #[rocket::async_test]
    async fn update_and_delete_recipe() {
        let mut conn = connection::establish().await.unwrap();
        let author = create_rand_user(&mut conn).await;
        let stranger = create_rand_user(&mut conn).await;
        let flour = create_ingredient(&mut conn, &format!("flour {}", rand_str(6)), "g").await;
        let egg = create_ingredient(&mut conn, &format!("egg {}", rand_str(6)), "pcs").await;
        let sugar = create_ingredient(&mut conn, &format!("sugar {}", rand_str(6)), "g").await;
        let client = test_client(routes()).await;

        let added = post_recipe(
            &client,
            author.id,
            &payload(vec![], vec![(flour.id, 200), (egg.id, 2)]),
        )
        .await;

        let changes = ModifyRecipe {
            ingredients: Some(vec![IngredientAmount {
                id: sugar.id,
                amount: 100,
            }]),
            ..Default::default()
        };
        let response = client
            .patch(uri!(super::update_recipe(added.id)))
            .header(as_user(stranger.id))
            .json(&changes)
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Forbidden);

        let response = client
            .patch(uri!(super::update_recipe(added.id)))
            .header(as_user(author.id))
            .json(&changes)
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        let updated: Recipe = response.into_json().await.unwrap();
        assert_eq!(
            updated.ingredients,
            vec![RecipeIngredient {
                id: sugar.id,
                name: sugar.name.clone(),
                measurement_unit: "g".to_string(),
                amount: 100,
            }]
        );
        assert_eq!(updated.name, added.name);

        let response = client
            .patch(uri!(super::update_recipe(added.id)))
            .header(as_user(author.id))
            .json(&ModifyRecipe::default())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::BadRequest);

        let response = client
            .delete(uri!(super::delete_recipe(added.id)))
            .header(as_user(stranger.id))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Forbidden);

        let response = client
            .delete(uri!(super::delete_recipe(added.id)))
            .header(as_user(author.id))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::NoContent);

        let response = client
            .delete(uri!(super::delete_recipe(added.id)))
            .header(as_user(author.id))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::NotFound);
    }

    #[rocket::async_test]
    async fn favorite_twice_conflicts() {
        let mut conn = connection::establish().await.unwrap();
        let author = create_rand_user(&mut conn).await;
        let fan = create_rand_user(&mut conn).await;
        let flour = create_rand_ingredient(&mut conn, "g").await;
        let client = test_client(routes()).await;
        let added = post_recipe(&client, author.id, &payload(vec![], vec![(flour.id, 1)])).await;

        let response = client
            .post(uri!(super::add_favorite(added.id)))
            .header(as_user(fan.id))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Created);
        let mini: RecipeMini = response.into_json().await.unwrap();
        assert_eq!(mini.id, added.id);
        assert_eq!(mini.cooking_time, added.cooking_time);

        let response = client
            .post(uri!(super::add_favorite(added.id)))
            .header(as_user(fan.id))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Conflict);

        let response = client
            .get(uri!(super::get_recipe(added.id)))
            .header(as_user(fan.id))
            .dispatch()
            .await;
        let seen: Recipe = response.into_json().await.unwrap();
        assert!(seen.is_favorited);
        assert!(!seen.is_in_shopping_cart);

        let response = client
            .delete(uri!(super::remove_favorite(added.id)))
            .header(as_user(fan.id))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::NoContent);
        let response = client
            .delete(uri!(super::remove_favorite(added.id)))
            .header(as_user(fan.id))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::NotFound);

        let response = client
            .post(uri!(super::add_favorite(i32::MAX)))
            .header(as_user(fan.id))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::NotFound);
    }

    #[rocket::async_test]
    async fn list_recipes_with_filters() {
        let mut conn = connection::establish().await.unwrap();
        let author = create_rand_user(&mut conn).await;
        let shopper = create_rand_user(&mut conn).await;
        let tag = create_rand_tag(&mut conn).await;
        let flour = create_rand_ingredient(&mut conn, "g").await;
        let client = test_client(routes()).await;

        let tagged = post_recipe(&client, author.id, &payload(vec![tag.id], vec![(flour.id, 1)])).await;
        let plain = post_recipe(&client, author.id, &payload(vec![], vec![(flour.id, 1)])).await;

        let response = client
            .get(format!("/?author={}", author.id))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        let listed: Vec<Recipe> = response.into_json().await.unwrap();
        assert_eq!(
            listed.iter().map(|r| r.id).collect::<Vec<_>>(),
            vec![plain.id, tagged.id]
        );

        let response = client
            .get(format!("/?author={}&tags={}", author.id, tag.slug))
            .dispatch()
            .await;
        let listed: Vec<Recipe> = response.into_json().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, tagged.id);

        let response = client
            .post(uri!(super::add_to_shopping_cart(plain.id)))
            .header(as_user(shopper.id))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Created);

        let response = client
            .get("/?is_in_shopping_cart=true")
            .header(as_user(shopper.id))
            .dispatch()
            .await;
        let listed: Vec<Recipe> = response.into_json().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, plain.id);
        assert!(listed[0].is_in_shopping_cart);
    }

    #[rocket::async_test]
    async fn download_shopping_cart() {
        let mut conn = connection::establish().await.unwrap();
        let author = create_rand_user(&mut conn).await;
        let shopper = create_rand_user(&mut conn).await;
        let flour = create_ingredient(&mut conn, &format!("мука {}", rand_str(6)), "г").await;
        let client = test_client(routes()).await;
        let added = post_recipe(&client, author.id, &payload(vec![], vec![(flour.id, 200)])).await;

        // an empty cart still downloads
        let response = client
            .get(uri!(super::download_shopping_cart))
            .header(as_user(shopper.id))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);

        client
            .post(uri!(super::add_to_shopping_cart(added.id)))
            .header(as_user(shopper.id))
            .dispatch()
            .await;
        let response = client
            .get(uri!(super::download_shopping_cart))
            .header(as_user(shopper.id))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        assert_eq!(response.content_type(), Some(ContentType::PDF));
        assert_eq!(
            response.headers().get_one("Content-Disposition"),
            Some("attachment; filename=\"shopping_list.pdf\"")
        );
        let body = response.into_bytes().await.unwrap();
        assert!(body.starts_with(b"%PDF"));

        let response = client
            .delete(uri!(super::remove_from_shopping_cart(added.id)))
            .header(as_user(shopper.id))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::NoContent);

        let response = client
            .get(uri!(super::download_shopping_cart))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Unauthorized);
    }
}
