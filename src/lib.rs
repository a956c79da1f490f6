pub mod csv;
pub mod domain;
pub mod error;
pub mod store;
