#![non_null_api]

use crate::model::{Author, Book};
use crate::service::CrudService;
use uuid::Uuid;

#[derive(Debug)]
pub struct ApiError;

#[endpoint("books")]
pub struct BookEndpoint;

impl BookEndpoint {
    pub fn new() -> Self {
        BookEndpoint
    }

    pub fn find(&self, id: Uuid) -> Result<Option<Book>, ApiError> {
        Ok(None)
    }

    pub async fn search(&self, query: String, #[nullable] limit: u32) -> Vec<Book> {
        Vec::new()
    }

    pub fn remove(&self, id: Uuid) {}

    fn reindex(&self) {}
}

#[endpoint]
pub struct AuthorEndpoint;

impl CrudService<Author> for AuthorEndpoint {}
