//! Authentication for the price API.
//!
//! The API accepts an optional key that raises the call budget. The key is
//! kept in a [`secrecy::SecretString`] and only exposed when a request header
//! is built.

mod api_key;

pub use api_key::{ApiKey, API_KEY_ENV};
