//! Publish admission: query decoding, request validation and loopback URI rewriting

pub mod query;
pub mod request;
pub mod uri;

pub use query::{parse_query, QueryParams};
pub use request::{validate, MulticastType, ParameterNames, PublishRequest, RequestError};
pub use uri::rewrite_protocol;
