use rocket::http::Status;
use rocket::request::{FromRequest, Outcome};
use rocket_db_pools::Connection;

use crate::api::configs::Config;
use crate::api::errors::{Error, GuardFailure};
use crate::api::fairings::db::Db;
use crate::db::user;

pub const USER_HEADER: &str = "X-User-Id";

fn fail<T>(request: &rocket::Request<'_>, status: Status, error: Error) -> Outcome<T, Error> {
    let message = match &error {
        Error::BadRequest(m)
        | Error::Unauthorized(m)
        | Error::Forbidden(m)
        | Error::NotFound(m)
        | Error::Conflict(m)
        | Error::InternalServer(m) => m.error.clone(),
    };
    request.local_cache(|| GuardFailure(Some(message)));
    Outcome::Error((status, error))
}

pub struct Auth;

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Auth {
    type Error = Error;

    async fn from_request(request: &'r rocket::Request<'_>) -> Outcome<Self, Self::Error> {
        let Some(config) = request.rocket().state::<Config>() else {
            return fail(request, Status::InternalServerError, Error::internal());
        };
        if let Some(key) = config.api_key.as_ref() {
            match request.headers().get_one("Authorization") {
                Some(token) if token == key => {}
                Some(_) => {
                    return fail(request, Status::Forbidden, Error::forbidden("Invalid API Key"))
                }
                None => {
                    return fail(
                        request,
                        Status::Unauthorized,
                        Error::unauthorized("Missing API Key"),
                    )
                }
            }
        }
        Outcome::Success(Auth)
    }
}

/// The acting user, as asserted by the identity layer in front of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser(pub i32);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for CurrentUser {
    type Error = Error;

    async fn from_request(request: &'r rocket::Request<'_>) -> Outcome<Self, Self::Error> {
        let Some(raw) = request.headers().get_one(USER_HEADER) else {
            return fail(
                request,
                Status::Unauthorized,
                Error::unauthorized(format!("Missing {} header", USER_HEADER)),
            );
        };
        let Ok(id) = raw.trim().parse::<i32>() else {
            return fail(
                request,
                Status::Unauthorized,
                Error::unauthorized(format!("Malformed {} header", USER_HEADER)),
            );
        };

        let mut db = match request.guard::<Connection<Db>>().await {
            Outcome::Success(db) => db,
            _ => return fail(request, Status::InternalServerError, Error::internal()),
        };
        match user::get_user(&mut db, id).await {
            Ok(Some(_)) => Outcome::Success(CurrentUser(id)),
            Ok(None) => fail(
                request,
                Status::Unauthorized,
                Error::unauthorized(format!("Unknown user {}", id)),
            ),
            Err(e) => {
                tracing::error!(error = %e, "failed to load the current user");
                fail(request, Status::InternalServerError, Error::internal())
            }
        }
    }
}

#[cfg(test)]
mod test {
    use crate::api::configs;
    use crate::api::errors::catchers;
    use crate::db::connection;
    use crate::db::user::test::create_rand_user;
    use crate::utils::rand::rand_str;

    use super::*;

    use foodgram_types::ErrorMessage;
    use rocket::fairing::AdHoc;
    use rocket::http::Header;
    use rocket::local::blocking;
    use rocket_db_pools::Database;

    #[get("/")]
    fn required_auth(_required: Auth) -> &'static str {
        "Hello, World!"
    }

    #[get("/me")]
    fn whoami(user: CurrentUser) -> String {
        user.0.to_string()
    }

    #[get("/maybe")]
    fn maybe(user: Option<CurrentUser>) -> String {
        user.map(|u| u.0.to_string()).unwrap_or_default()
    }

    #[test]
    fn test_without_config() {
        let app = rocket::build().mount("/", routes![required_auth]);
        let client = blocking::Client::tracked(app).expect("valid rocket instance");
        let response = client.get(uri!(required_auth)).dispatch();
        assert_eq!(response.status(), Status::InternalServerError);
    }

    fn test_client(config: Config) -> blocking::Client {
        use rocket::figment::{providers::Serialized, Figment};
        let figment = Figment::from(rocket::Config::default()).merge(Serialized::defaults(config));
        let app = rocket::custom(figment)
            .mount("/", routes![required_auth])
            .register("/", catchers())
            .attach(AdHoc::config::<Config>());
        blocking::Client::tracked(app).expect("valid rocket instance")
    }

    #[test]
    fn test_disable_auth() {
        let client = test_client(Config {
            api_key: None,
            ..Default::default()
        });
        let response = client.get(uri!(required_auth)).dispatch();
        assert_eq!(response.status(), Status::Ok);
    }

    #[test]
    fn test_enable_auth() {
        let key = rand_str(32);
        let client = test_client(Config {
            api_key: Some(key.clone()),
            ..Default::default()
        });

        let response = client.get(uri!(required_auth)).dispatch();
        assert_eq!(response.status(), Status::Unauthorized);
        let body: ErrorMessage = response.into_json().unwrap();
        assert_eq!(body.error, "Missing API Key");

        let response = client
            .get(uri!(required_auth))
            .header(Header::new("Authorization", key))
            .dispatch();
        assert_eq!(response.status(), Status::Ok);

        let response = client
            .get(uri!(required_auth))
            .header(Header::new("Authorization", rand_str(32)))
            .dispatch();
        assert_eq!(response.status(), Status::Forbidden);
    }

    #[rocket::async_test]
    async fn test_current_user() {
        use rocket::local::asynchronous::Client;

        let mut conn = connection::establish().await.unwrap();
        let known = create_rand_user(&mut conn).await;

        let app = rocket::custom(configs::config_provider())
            .attach(Db::init())
            .mount("/", routes![whoami, maybe])
            .register("/", catchers());
        let client = Client::tracked(app).await.expect("valid rocket instance");

        let response = client.get(uri!(whoami)).dispatch().await;
        assert_eq!(response.status(), Status::Unauthorized);

        let response = client
            .get(uri!(whoami))
            .header(Header::new(USER_HEADER, "not-a-number"))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Unauthorized);
        let body: ErrorMessage = response.into_json().await.unwrap();
        assert_eq!(body.error, "Malformed X-User-Id header");

        let response = client
            .get(uri!(whoami))
            .header(Header::new(USER_HEADER, i32::MAX.to_string()))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Unauthorized);

        let response = client
            .get(uri!(whoami))
            .header(Header::new(USER_HEADER, known.id.to_string()))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        assert_eq!(response.into_string().await.unwrap(), known.id.to_string());

        let response = client.get(uri!(maybe)).dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        assert_eq!(response.into_string().await.unwrap(), "");
    }
}
