use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::slug;

#[derive(Clone, Debug, PartialEq)]
pub struct Movie {
    pub id: Uuid,
    pub title: String,
    pub year_of_release: i32,
    pub genres: Vec<String>,
    /// Average of every user's rating, one decimal place.
    pub rating: Option<f64>,
    /// The requesting user's own rating.
    pub user_rating: Option<i32>,
}

impl Movie {
    pub fn new(id: Uuid, title: impl Into<String>, year_of_release: i32, genres: Vec<String>) -> Self {
        Self { id, title: title.into(), year_of_release, genres, rating: None, user_rating: None }
    }

    pub fn slug(&self) -> String {
        slug::derive(&self.title, self.year_of_release)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SortField {
    Title,
    YearOfRelease,
}

impl SortField {
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.eq_ignore_ascii_case("title") {
            Some(SortField::Title)
        } else if raw.eq_ignore_ascii_case("yearofrelease") {
            Some(SortField::YearOfRelease)
        } else {
            None
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum SortOrder {
    #[default]
    Unsorted,
    Ascending,
    Descending,
}

#[derive(Clone, Debug)]
pub struct GetAllMoviesOptions {
    pub title: Option<String>,
    pub year_of_release: Option<i32>,
    /// Raw field name as supplied by the caller; checked by validation.
    pub sort_field: Option<String>,
    pub sort_order: SortOrder,
    pub page: u64,
    pub page_size: u64,
    pub user_id: Option<Uuid>,
}

impl Default for GetAllMoviesOptions {
    fn default() -> Self {
        Self {
            title: None,
            year_of_release: None,
            sort_field: None,
            sort_order: SortOrder::Unsorted,
            page: 1,
            page_size: 10,
            user_id: None,
        }
    }
}

impl GetAllMoviesOptions {
    pub fn with_user(mut self, user_id: Option<Uuid>) -> Self {
        self.user_id = user_id;
        self
    }

    pub fn sort(&self) -> Option<(SortField, SortOrder)> {
        let field = SortField::parse(self.sort_field.as_deref()?)?;
        match self.sort_order {
            SortOrder::Descending => Some((field, SortOrder::Descending)),
            _ => Some((field, SortOrder::Ascending)),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingSummary {
    pub rating: Option<f64>,
    pub user_rating: Option<i32>,
}

#[derive(Clone, Debug, PartialEq, Serialize, sea_orm::FromQueryResult)]
#[serde(rename_all = "camelCase")]
pub struct MovieRating {
    pub movie_id: Uuid,
    pub slug: String,
    pub rating: i32,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationFailure {
    pub property_name: String,
    pub message: String,
}

impl ValidationFailure {
    pub fn new(property_name: &str, message: impl Into<String>) -> Self {
        Self { property_name: property_name.to_string(), message: message.into() }
    }
}
