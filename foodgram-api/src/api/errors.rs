use rocket::serde::json::Json;
use rocket::Request;
use tracing::error;

use foodgram_types::ErrorMessage;

use crate::render::RenderError;
use crate::utils::{CommonError, DatabaseError};

#[derive(Responder, Debug)]
pub enum Error {
    #[response(status = 400)]
    BadRequest(Json<ErrorMessage>),
    #[response(status = 401)]
    Unauthorized(Json<ErrorMessage>),
    #[response(status = 403)]
    Forbidden(Json<ErrorMessage>),
    #[response(status = 404)]
    NotFound(Json<ErrorMessage>),
    #[response(status = 409)]
    Conflict(Json<ErrorMessage>),
    #[response(status = 500)]
    InternalServer(Json<ErrorMessage>),
}

impl Error {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Error::BadRequest(Json(ErrorMessage::new(msg)))
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Error::Unauthorized(Json(ErrorMessage::new(msg)))
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Error::Forbidden(Json(ErrorMessage::new(msg)))
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Error::NotFound(Json(ErrorMessage::new(msg)))
    }

    pub fn internal() -> Self {
        Error::InternalServer(Json(ErrorMessage::new("Internal server error")))
    }
}

impl From<CommonError> for Error {
    fn from(e: CommonError) -> Self {
        match e {
            CommonError::Validation(e) => Error::BadRequest(Json(e.into())),
            CommonError::NotFound { .. } => Error::not_found(e.to_string()),
            CommonError::Conflict(_) => Error::Conflict(Json(ErrorMessage::new(e.to_string()))),
            CommonError::Permission(_) => Error::forbidden(e.to_string()),
            CommonError::Database(e) => e.into(),
        }
    }
}

impl From<DatabaseError> for Error {
    fn from(e: DatabaseError) -> Self {
        error!(error = %e, "unhandled database error");
        Error::internal()
    }
}

impl From<RenderError> for Error {
    fn from(e: RenderError) -> Self {
        error!(error = %e, "failed to render document");
        Error::internal()
    }
}

// Guard failures and malformed bodies never reach a handler, so they are
// answered here with the same body shape.

#[catch(400)]
fn bad_request(_req: &Request) -> Json<ErrorMessage> {
    Json(ErrorMessage::new("Bad request"))
}

#[catch(401)]
fn unauthorized(req: &Request) -> Json<ErrorMessage> {
    Json(ErrorMessage::new(guard_message(req, "Missing credentials")))
}

#[catch(403)]
fn forbidden(req: &Request) -> Json<ErrorMessage> {
    Json(ErrorMessage::new(guard_message(req, "Forbidden")))
}

#[catch(404)]
fn not_found(_req: &Request) -> Json<ErrorMessage> {
    Json(ErrorMessage::new("Not found"))
}

#[catch(422)]
fn unprocessable(_req: &Request) -> Json<ErrorMessage> {
    Json(ErrorMessage::new("Malformed request body"))
}

#[catch(500)]
fn internal(_req: &Request) -> Json<ErrorMessage> {
    Json(ErrorMessage::new("Internal server error"))
}

/// Message a failing guard left in the request-local cache.
fn guard_message(req: &Request, fallback: &str) -> String {
    req.local_cache(|| GuardFailure(None))
        .0
        .clone()
        .unwrap_or_else(|| fallback.to_string())
}

pub(crate) struct GuardFailure(pub Option<String>);

pub fn catchers() -> Vec<rocket::Catcher> {
    catchers![
        bad_request,
        unauthorized,
        forbidden,
        not_found,
        unprocessable,
        internal
    ]
}
