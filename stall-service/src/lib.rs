pub mod api;
pub mod auth;
pub mod domain;
pub mod error;
pub mod events;
pub mod lifecycle;
pub mod models;
pub mod persistence;
pub mod repository;
pub mod schema;
pub mod service;
pub mod validation;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
