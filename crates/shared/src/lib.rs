pub mod aggregate;
pub mod domain;
pub mod error;
pub mod protocol;
