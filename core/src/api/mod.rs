//! Resource-scoped sub-clients.
//!
//! # Design
//! The set of resources is fixed, so names are parsed into the closed
//! `Resource` enum and handed out as the `Api` variant for that resource.
//! Names the API reserves but this client does not implement are rejected
//! the same way as unknown names.

mod boards;
mod cards;
mod members;

use std::borrow::Cow;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::Serialize;

pub use boards::Boards;
pub use cards::Cards;
pub use members::Members;

use crate::dispatch::Dispatcher;
use crate::error::ApiError;
use crate::http::HttpMethod;

/// Resources with a sub-client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Boards,
    Cards,
    Members,
}

impl Resource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Boards => "boards",
            Resource::Cards => "cards",
            Resource::Members => "members",
        }
    }
}

impl FromStr for Resource {
    type Err = ApiError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "boards" => Ok(Resource::Boards),
            "cards" => Ok(Resource::Cards),
            "members" => Ok(Resource::Members),
            other => Err(ApiError::InvalidArgument(other.to_string())),
        }
    }
}

/// A borrowed handle on one memoized sub-client.
#[derive(Debug, Clone, Copy)]
pub enum Api<'a> {
    Boards(&'a Boards),
    Cards(&'a Cards),
    Members(&'a Members),
}

impl Api<'_> {
    pub fn resource(&self) -> Resource {
        match self {
            Api::Boards(_) => Resource::Boards,
            Api::Cards(_) => Resource::Cards,
            Api::Members(_) => Resource::Members,
        }
    }
}

/// Percent-encode a caller-supplied id so it stays one path segment.
fn segment(id: &str) -> Cow<'_, str> {
    urlencoding::encode(id)
}

/// Status-checked GET, JSON-decoded. `None` means no content.
fn fetch<T: DeserializeOwned>(dispatcher: &Dispatcher, path: &str) -> Result<Option<T>, ApiError> {
    dispatcher.dispatch_checked(path, HttpMethod::Get, None)?.json()
}

fn to_body<T: Serialize>(payload: &T) -> Result<String, ApiError> {
    serde_json::to_string(payload).map_err(|e| ApiError::SerializationError(e.to_string()))
}

/// Typed reads need a body; "no content" is an error here.
fn required<T>(value: Option<T>) -> Result<T, ApiError> {
    value.ok_or(ApiError::UnexpectedPayload {
        expected: "JSON",
        found: "no content",
    })
}
