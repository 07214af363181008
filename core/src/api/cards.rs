use std::sync::Arc;

use super::{fetch, required, segment, to_body};
use crate::dispatch::Dispatcher;
use crate::error::ApiError;
use crate::http::HttpMethod;
use crate::types::{Card, CardUpdate, NewCard};

/// Card endpoints.
#[derive(Debug)]
pub struct Cards {
    dispatcher: Arc<Dispatcher>,
}

impl Cards {
    pub(crate) fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    pub fn show(&self, id: &str) -> Result<Card, ApiError> {
        required(fetch(&self.dispatcher, &format!("/cards/{}.json", segment(id)))?)
    }

    pub fn create(&self, input: &NewCard) -> Result<Card, ApiError> {
        self.dispatcher
            .dispatch_checked("/cards.json", HttpMethod::Post, Some(&to_body(input)?))?
            .into_json()
    }

    pub fn update(&self, id: &str, input: &CardUpdate) -> Result<Card, ApiError> {
        let path = format!("/cards/{}.json", segment(id));
        self.dispatcher
            .dispatch_checked(&path, HttpMethod::Put, Some(&to_body(input)?))?
            .into_json()
    }

    pub fn remove(&self, id: &str) -> Result<(), ApiError> {
        let path = format!("/cards/{}.json", segment(id));
        self.dispatcher.dispatch_checked(&path, HttpMethod::Delete, None)?;
        Ok(())
    }
}
