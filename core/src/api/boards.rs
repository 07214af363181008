use std::sync::Arc;

use super::{fetch, required, segment, to_body};
use crate::dispatch::Dispatcher;
use crate::error::ApiError;
use crate::http::HttpMethod;
use crate::types::{Board, BoardUpdate, Card, Member, NewBoard};

/// Board endpoints.
#[derive(Debug)]
pub struct Boards {
    dispatcher: Arc<Dispatcher>,
}

impl Boards {
    pub(crate) fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    pub fn show(&self, id: &str) -> Result<Board, ApiError> {
        required(fetch(&self.dispatcher, &format!("/boards/{}.json", segment(id)))?)
    }

    pub fn cards(&self, id: &str) -> Result<Vec<Card>, ApiError> {
        let path = format!("/boards/{}/cards.json", segment(id));
        Ok(fetch(&self.dispatcher, &path)?.unwrap_or_default())
    }

    pub fn members(&self, id: &str) -> Result<Vec<Member>, ApiError> {
        let path = format!("/boards/{}/members.json", segment(id));
        Ok(fetch(&self.dispatcher, &path)?.unwrap_or_default())
    }

    pub fn create(&self, input: &NewBoard) -> Result<Board, ApiError> {
        self.dispatcher
            .dispatch_checked("/boards.json", HttpMethod::Post, Some(&to_body(input)?))?
            .into_json()
    }

    pub fn update(&self, id: &str, input: &BoardUpdate) -> Result<Board, ApiError> {
        let path = format!("/boards/{}.json", segment(id));
        self.dispatcher
            .dispatch_checked(&path, HttpMethod::Put, Some(&to_body(input)?))?
            .into_json()
    }

    /// Boards are never deleted, only closed.
    pub fn close(&self, id: &str) -> Result<Board, ApiError> {
        let update = BoardUpdate {
            closed: Some(true),
            ..BoardUpdate::default()
        };
        self.update(id, &update)
    }
}
