#[macro_use]
extern crate rocket;

pub mod api;
pub mod db;
pub mod render;
pub mod utils;

#[cfg(test)]
#[cfg(not(tarpaulin_include))]
#[ctor::ctor]
fn init() {
    crate::utils::logging::setup_console_log();
}

pub(crate) mod misc {
    use utoipa::OpenApi;
    use utoipa_rapidoc::RapiDoc;
    use utoipa_swagger_ui::SwaggerUi;
    use utoipa_swagger_ui::Url;

    #[derive(OpenApi)]
    #[openapi(info(
        title = "Foodgram API",
        description = r"## Main API documentation

- [Recipes API](/swagger-ui/?urls.primaryName=recipes)
- [Users API](/swagger-ui/?urls.primaryName=users)
- [Catalog API](/swagger-ui/?urls.primaryName=catalog)

Identify the acting user with the `X-User-Id` header.
    ",
        version = "1.0"
    ))]
    pub struct ApiDoc;

    pub fn docs() -> Vec<rocket::Route> {
        use crate::api::{catalog, recipe, user};
        SwaggerUi::new("/swagger-ui/<_..>")
            .urls(vec![
                (
                    Url::with_primary("main", "/api-docs/openapi.json", true),
                    ApiDoc::openapi(),
                ),
                (
                    Url::new("recipes", "/api-docs/openapi-recipes.json"),
                    recipe::misc::ApiDoc::openapi(),
                ),
                (
                    Url::new("users", "/api-docs/openapi-users.json"),
                    user::misc::ApiDoc::openapi(),
                ),
                (
                    Url::new("catalog", "/api-docs/openapi-catalog.json"),
                    catalog::misc::ApiDoc::openapi(),
                ),
            ])
            .into()
    }

    pub fn rapidoc() -> Vec<rocket::Route> {
        RapiDoc::new("/api-docs/openapi-recipes.json")
            .path("/rapidoc")
            .into()
    }
}

/// Keeps the file log writer flushing for as long as the server lives.
struct LogGuard(#[allow(dead_code)] tracing_appender::non_blocking::WorkerGuard);

#[cfg(not(tarpaulin_include))]
pub async fn rocket() -> anyhow::Result<rocket::Rocket<rocket::Build>> {
    use rocket::fairing::AdHoc;
    use rocket_db_pools::Database;

    use crate::api::configs::{self, Config};
    use crate::api::errors::catchers;
    use crate::api::fairings::db::Db;
    use crate::api::{catalog, recipe, user};
    use crate::misc;

    let cfg_provider = configs::config_provider();
    let config: Config = cfg_provider.extract()?;

    let log_guard = crate::utils::logging::setup_logging(config.log_dir.as_deref());
    crate::db::connection::run_migrations().await?;

    let mut builder = rocket::custom(cfg_provider);
    if let Some(guard) = log_guard {
        builder = builder.manage(LogGuard(guard));
    }
    Ok(builder
        .attach(Db::init())
        .mount("/api/recipes", recipe::routes())
        .mount("/api/users", user::routes())
        .mount("/api/tags", catalog::tag_routes())
        .mount("/api/ingredients", catalog::ingredient_routes())
        .mount("/", misc::docs())
        .mount("/", misc::rapidoc())
        .register("/", catchers())
        .attach(AdHoc::config::<Config>()))
}
