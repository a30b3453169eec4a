pub mod logging;
#[cfg(test)]
pub mod rand;

mod errors;
pub use errors::{CommonError, DatabaseError};
