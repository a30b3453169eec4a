// Catalog
pub mod catalog;

// Core
pub mod recipe;
pub mod relation;
pub mod shopping;
pub mod user;

// Driver
pub mod connection;
