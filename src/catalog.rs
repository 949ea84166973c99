use sea_orm::DatabaseConnection;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

use crate::{
    error::CatalogResult,
    models::{GetAllMoviesOptions, Movie, MovieRating, RatingSummary},
    store::{MovieStore, RatingStore},
    validation,
};

/// Entry point for callers: validates first, then hands over to the stores.
#[derive(Clone)]
pub struct Catalog {
    movies: MovieStore,
    ratings: RatingStore,
}

impl Catalog {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { movies: MovieStore::new(db.clone()), ratings: RatingStore::new(db) }
    }

    pub async fn create_movie(&self, movie: &Movie, cancel: &CancellationToken) -> CatalogResult<bool> {
        validation::validate_movie(movie, &self.movies, validation::current_year(), cancel).await?;
        Ok(self.movies.create(movie, cancel).await?)
    }

    pub async fn get_movie_by_id(
        &self,
        id: Uuid,
        user_id: Option<Uuid>,
        cancel: &CancellationToken,
    ) -> CatalogResult<Option<Movie>> {
        Ok(self.movies.get_by_id(id, user_id, cancel).await?)
    }

    pub async fn get_movie_by_slug(
        &self,
        slug: &str,
        user_id: Option<Uuid>,
        cancel: &CancellationToken,
    ) -> CatalogResult<Option<Movie>> {
        Ok(self.movies.get_by_slug(slug, user_id, cancel).await?)
    }

    /// Resolves a route token that is either a movie id or a slug.
    pub async fn get_movie(
        &self,
        id_or_slug: &str,
        user_id: Option<Uuid>,
        cancel: &CancellationToken,
    ) -> CatalogResult<Option<Movie>> {
        match Uuid::parse_str(id_or_slug) {
            Ok(id) => self.get_movie_by_id(id, user_id, cancel).await,
            Err(_) => self.get_movie_by_slug(id_or_slug, user_id, cancel).await,
        }
    }

    pub async fn exists_movie(&self, id: Uuid, cancel: &CancellationToken) -> CatalogResult<bool> {
        Ok(self.movies.exists_by_id(id, cancel).await?)
    }

    pub async fn list_movies(
        &self,
        options: &GetAllMoviesOptions,
        cancel: &CancellationToken,
    ) -> CatalogResult<Vec<Movie>> {
        validation::validate_options(options, validation::current_year())?;
        Ok(self.movies.get_all(options, cancel).await?)
    }

    /// Returns `false` when no movie has `movie.id`.
    pub async fn update_movie(&self, movie: &Movie, cancel: &CancellationToken) -> CatalogResult<bool> {
        validation::validate_movie(movie, &self.movies, validation::current_year(), cancel).await?;
        if !self.movies.exists_by_id(movie.id, cancel).await? {
            debug!(id = %movie.id, "update of unknown movie");
            return Ok(false);
        }
        Ok(self.movies.update(movie, cancel).await?)
    }

    pub async fn delete_movie(&self, id: Uuid, cancel: &CancellationToken) -> CatalogResult<bool> {
        Ok(self.movies.delete_by_id(id, cancel).await?)
    }

    /// Returns `false` when the movie does not exist.
    pub async fn rate_movie(
        &self,
        movie_id: Uuid,
        user_id: Uuid,
        value: i32,
        cancel: &CancellationToken,
    ) -> CatalogResult<bool> {
        validation::validate_rating(value)?;
        if !self.movies.exists_by_id(movie_id, cancel).await? {
            return Ok(false);
        }
        Ok(self.ratings.upsert(movie_id, user_id, value, cancel).await?)
    }

    pub async fn delete_rating(
        &self,
        movie_id: Uuid,
        user_id: Uuid,
        cancel: &CancellationToken,
    ) -> CatalogResult<bool> {
        Ok(self.ratings.delete(movie_id, user_id, cancel).await?)
    }

    pub async fn get_user_ratings(
        &self,
        user_id: Uuid,
        cancel: &CancellationToken,
    ) -> CatalogResult<Vec<MovieRating>> {
        Ok(self.ratings.get_ratings_for_user(user_id, cancel).await?)
    }

    /// Average and, for a known user, their own rating. `None` for unknown movies.
    pub async fn get_movie_rating(
        &self,
        movie_id: Uuid,
        user_id: Option<Uuid>,
        cancel: &CancellationToken,
    ) -> CatalogResult<Option<RatingSummary>> {
        if !self.exists_movie(movie_id, cancel).await? {
            return Ok(None);
        }
        let summary = match user_id {
            Some(user_id) => self.ratings.get_for_user(movie_id, user_id, cancel).await?,
            None => RatingSummary {
                rating: self.ratings.get_average(movie_id, cancel).await?,
                user_rating: None,
            },
        };
        Ok(Some(summary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db::test_db, error::CatalogError, models::SortOrder};

    fn genres(names: &[&str]) -> Vec<String> {
        names.iter().map(|g| g.to_string()).collect()
    }

    #[tokio::test]
    async fn second_movie_with_same_slug_is_rejected_before_io() {
        let catalog = Catalog::new(test_db().await);
        let cancel = CancellationToken::new();
        let first = Movie::new(Uuid::new_v4(), "The Matrix", 1999, genres(&["Action"]));
        let second = Movie::new(Uuid::new_v4(), "The Matrix", 1999, genres(&["Action"]));

        assert!(catalog.create_movie(&first, &cancel).await.unwrap());
        let err = catalog.create_movie(&second, &cancel).await.unwrap_err();
        assert!(matches!(err, CatalogError::Validation(ref e) if e.has("slug")));
        assert!(!catalog.exists_movie(second.id, &cancel).await.unwrap());
    }

    #[tokio::test]
    async fn resolves_by_id_or_slug() {
        let catalog = Catalog::new(test_db().await);
        let cancel = CancellationToken::new();
        let m = Movie::new(Uuid::new_v4(), "Fargo", 1996, genres(&["Crime"]));
        catalog.create_movie(&m, &cancel).await.unwrap();

        let by_id = catalog.get_movie(&m.id.to_string(), None, &cancel).await.unwrap().unwrap();
        let by_slug = catalog.get_movie("fargo-1996", None, &cancel).await.unwrap().unwrap();
        assert_eq!(by_id.id, m.id);
        assert_eq!(by_slug.id, m.id);
        assert!(catalog.get_movie("fargo-1997", None, &cancel).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_of_unknown_movie_reports_false() {
        let catalog = Catalog::new(test_db().await);
        let m = Movie::new(Uuid::new_v4(), "Nowhere", 2001, genres(&["Drama"]));
        assert!(!catalog.update_movie(&m, &CancellationToken::new()).await.unwrap());
    }

    #[tokio::test]
    async fn update_keeps_own_slug_and_replaces_fields() {
        let catalog = Catalog::new(test_db().await);
        let cancel = CancellationToken::new();
        let mut m = Movie::new(Uuid::new_v4(), "Solaris", 1972, genres(&["Drama", "Sci-Fi"]));
        catalog.create_movie(&m, &cancel).await.unwrap();

        m.genres = genres(&["Sci-Fi"]);
        assert!(catalog.update_movie(&m, &cancel).await.unwrap());

        let stored = catalog.get_movie_by_id(m.id, None, &cancel).await.unwrap().unwrap();
        assert_eq!(stored.genres, vec!["Sci-Fi"]);
    }

    #[tokio::test]
    async fn rating_flow_round_trips() {
        let catalog = Catalog::new(test_db().await);
        let cancel = CancellationToken::new();
        let me = Uuid::new_v4();
        let m = Movie::new(Uuid::new_v4(), "Oldboy", 2003, genres(&["Thriller"]));
        catalog.create_movie(&m, &cancel).await.unwrap();

        assert!(!catalog.rate_movie(Uuid::new_v4(), me, 4, &cancel).await.unwrap());
        let err = catalog.rate_movie(m.id, me, 9, &cancel).await.unwrap_err();
        assert!(matches!(err, CatalogError::Validation(ref e) if e.has("rating")));

        assert!(catalog.rate_movie(m.id, me, 4, &cancel).await.unwrap());
        let summary = catalog.get_movie_rating(m.id, Some(me), &cancel).await.unwrap().unwrap();
        assert_eq!(summary, RatingSummary { rating: Some(4.0), user_rating: Some(4) });
        let anonymous = catalog.get_movie_rating(m.id, None, &cancel).await.unwrap().unwrap();
        assert_eq!(anonymous, RatingSummary { rating: Some(4.0), user_rating: None });
        assert!(catalog.get_movie_rating(Uuid::new_v4(), None, &cancel).await.unwrap().is_none());

        let mine = catalog.get_user_ratings(me, &cancel).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].slug, "oldboy-2003");

        assert!(catalog.delete_rating(m.id, me, &cancel).await.unwrap());
        assert!(catalog.get_user_ratings(me, &cancel).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn listing_validates_before_querying() {
        let catalog = Catalog::new(test_db().await);
        let options = GetAllMoviesOptions {
            sort_field: Some("director".to_string()),
            sort_order: SortOrder::Descending,
            page_size: 50,
            ..Default::default()
        };
        let err = catalog.list_movies(&options, &CancellationToken::new()).await.unwrap_err();
        match err {
            CatalogError::Validation(e) => {
                assert!(e.has("sortField"));
                assert!(e.has("pageSize"));
            },
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn delete_then_exists_is_false() {
        let catalog = Catalog::new(test_db().await);
        let cancel = CancellationToken::new();
        let m = Movie::new(Uuid::new_v4(), "Vertigo", 1958, genres(&["Mystery"]));
        catalog.create_movie(&m, &cancel).await.unwrap();
        catalog.rate_movie(m.id, Uuid::new_v4(), 5, &cancel).await.unwrap();

        assert!(catalog.delete_movie(m.id, &cancel).await.unwrap());
        assert!(!catalog.exists_movie(m.id, &cancel).await.unwrap());
        assert!(!catalog.delete_movie(m.id, &cancel).await.unwrap());
    }
}
