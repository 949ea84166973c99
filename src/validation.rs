//! Input checks run before any mutation or listing reaches the stores.
//!
//! Every rule set collects all failures before reporting them.

use std::ops::RangeInclusive;

use tokio_util::sync::CancellationToken;

use crate::{
    error::{CatalogResult, ValidationErrors},
    models::{GetAllMoviesOptions, Movie, SortField},
    slug,
    store::MovieStore,
};

pub const RATING_RANGE: RangeInclusive<i32> = 1..=5;
pub const PAGE_SIZE_RANGE: RangeInclusive<u64> = 1..=25;

pub fn current_year() -> i32 {
    jiff::Zoned::now().year().into()
}

pub async fn validate_movie(
    movie: &Movie,
    movies: &MovieStore,
    current_year: i32,
    cancel: &CancellationToken,
) -> CatalogResult<()> {
    let mut errors = ValidationErrors::default();

    if movie.id.is_nil() {
        errors.push("id", "'id' must not be empty.");
    }

    if movie.genres.is_empty() {
        errors.push("genres", "'genres' must not be empty.");
    } else if movie.genres.iter().any(|g| g.trim().is_empty()) {
        errors.push("genres", "Genre names must not be empty.");
    } else if has_duplicates(&movie.genres) {
        errors.push("genres", "Genre names must be unique.");
    }

    let title_missing = movie.title.trim().is_empty();
    if title_missing {
        errors.push("title", "'title' must not be empty.");
    }

    if movie.year_of_release > current_year {
        errors.push(
            "yearOfRelease",
            format!("'yearOfRelease' must be less than or equal to '{current_year}'."),
        );
    }

    let slug = movie.slug();
    if slug::is_degenerate(&slug, movie.year_of_release) {
        if !title_missing {
            errors.push("slug", "'title' must contain at least one letter or digit.");
        }
    } else if let Some(existing) = movies.get_by_slug(&slug, None, cancel).await? {
        if existing.id != movie.id {
            errors.push("slug", "This movie already exists.");
        }
    }

    errors.into_result()?;
    Ok(())
}

pub fn validate_options(
    options: &GetAllMoviesOptions,
    current_year: i32,
) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();

    if let Some(year) = options.year_of_release {
        if year > current_year {
            errors.push(
                "yearOfRelease",
                format!("'yearOfRelease' must be less than or equal to '{current_year}'."),
            );
        }
    }

    if let Some(field) = options.sort_field.as_deref() {
        if SortField::parse(field).is_none() {
            errors.push("sortField", "You can only sort by 'title' or 'yearofrelease'.");
        }
    }

    if options.page < 1 {
        errors.push("page", "Page must be greater than or equal to 1.");
    }

    if !PAGE_SIZE_RANGE.contains(&options.page_size) {
        errors.push("pageSize", "You can get between 1 and 25 movies per page.");
    }

    errors.into_result()
}

pub fn validate_rating(value: i32) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    if !RATING_RANGE.contains(&value) {
        errors.push(
            "rating",
            format!(
                "Rating must be between {} and {}.",
                RATING_RANGE.start(),
                RATING_RANGE.end()
            ),
        );
    }
    errors.into_result()
}

fn has_duplicates(genres: &[String]) -> bool {
    genres.iter().enumerate().any(|(i, g)| genres[..i].contains(g))
}
