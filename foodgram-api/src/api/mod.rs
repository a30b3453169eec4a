pub mod catalog;
pub mod configs;
pub mod errors;
pub mod guards;
pub mod recipe;
pub mod user;

pub mod fairings {
    pub mod db;
}
