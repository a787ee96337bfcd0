//! Request middleware and authentication extractors.

pub mod auth;
