//! # HTTP message model.
//!
//! This crate provides the request, response, header and body types shared
//! by the htkit crates. It intentionally models only what an HTTP client
//! needs for authentication handling; it is not a full protocol
//! implementation.

pub mod body;
pub mod error;
pub mod header;
pub mod request;
pub mod response;

pub use crate::{
    body::Body,
    error::Error,
    header::{HeaderField, HeaderFields},
    request::Request,
    response::Response,
};
