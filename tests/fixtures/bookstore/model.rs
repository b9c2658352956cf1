//! Domain types shared by the bookstore endpoints.
#![non_null_api]

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::marker::PhantomData;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Book {
    pub id: Uuid,
    pub title: String,
    #[serde(rename = "publishedYear")]
    pub year: i32,
    #[nullable]
    pub subtitle: String,
    pub author: Option<Author>,
    pub tags: Vec<String>,
    pub status: Status,
    #[serde(skip)]
    pub cache_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    pub books: Vec<Book>,
    pub ratings: HashMap<String, f64>,
    #[serde(skip)]
    marker: PhantomData<Book>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum Status {
    Available,
    #[serde(rename = "checked-out")]
    CheckedOut,
}

/// Not reachable from any endpoint.
pub struct Pair(i32, i32);
