use std::sync::Arc;

use super::{fetch, required, segment};
use crate::dispatch::Dispatcher;
use crate::error::ApiError;
use crate::types::{Board, Member};

/// Member endpoints. `me` names the member owning the credential.
#[derive(Debug)]
pub struct Members {
    dispatcher: Arc<Dispatcher>,
}

impl Members {
    pub(crate) fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    pub fn show(&self, id: &str) -> Result<Member, ApiError> {
        required(fetch(&self.dispatcher, &format!("/members/{}.json", segment(id)))?)
    }

    pub fn me(&self) -> Result<Member, ApiError> {
        self.show("me")
    }

    pub fn boards(&self, id: &str) -> Result<Vec<Board>, ApiError> {
        let path = format!("/members/{}/boards.json", segment(id));
        Ok(fetch(&self.dispatcher, &path)?.unwrap_or_default())
    }
}
