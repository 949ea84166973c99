use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, FromQueryResult, JoinType, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait, Set,
    sea_query::{Expr, OnConflict},
};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

use super::cancellable;
use crate::{
    entities::{movie, rating},
    error::StoreResult,
    models::{MovieRating, RatingSummary},
};

#[derive(Debug, FromQueryResult)]
struct AverageRow {
    rating: Option<f64>,
}

#[derive(Debug, FromQueryResult)]
struct SummaryRow {
    rating: Option<f64>,
    user_rating: Option<i32>,
}

#[derive(Clone)]
pub struct RatingStore {
    db: DatabaseConnection,
}

impl RatingStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn get_average(
        &self,
        movie_id: Uuid,
        cancel: &CancellationToken,
    ) -> StoreResult<Option<f64>> {
        let query = rating::Entity::find()
            .select_only()
            .column_as(Expr::cust(r#"ROUND(AVG("ratings"."rating"), 1)"#), "rating")
            .filter(rating::Column::MovieId.eq(movie_id))
            .into_model::<AverageRow>();
        let row = cancellable(cancel, query.one(&self.db)).await?;
        Ok(row.and_then(|r| r.rating))
    }

    pub async fn get_for_user(
        &self,
        movie_id: Uuid,
        user_id: Uuid,
        cancel: &CancellationToken,
    ) -> StoreResult<RatingSummary> {
        let query = rating::Entity::find()
            .select_only()
            .column_as(Expr::cust(r#"ROUND(AVG("ratings"."rating"), 1)"#), "rating")
            .column_as(
                Expr::cust_with_values(
                    r#"MAX(CASE WHEN "ratings"."user_id" = ? THEN "ratings"."rating" END)"#,
                    [user_id],
                ),
                "user_rating",
            )
            .filter(rating::Column::MovieId.eq(movie_id))
            .into_model::<SummaryRow>();
        let row = cancellable(cancel, query.one(&self.db)).await?;
        Ok(row
            .map(|r| RatingSummary { rating: r.rating, user_rating: r.user_rating })
            .unwrap_or_default())
    }

    /// Inserts or overwrites the rating for `(user_id, movie_id)` in one statement.
    pub async fn upsert(
        &self,
        movie_id: Uuid,
        user_id: Uuid,
        value: i32,
        cancel: &CancellationToken,
    ) -> StoreResult<bool> {
        let model = rating::ActiveModel {
            user_id: Set(user_id),
            movie_id: Set(movie_id),
            rating: Set(value),
        };
        let insert = rating::Entity::insert(model).on_conflict(
            OnConflict::columns([rating::Column::UserId, rating::Column::MovieId])
                .update_column(rating::Column::Rating)
                .to_owned(),
        );
        let affected = cancellable(cancel, insert.exec_without_returning(&self.db)).await?;
        debug!(movie_id = %movie_id, user_id = %user_id, value, "upsert rating");
        Ok(affected > 0)
    }

    pub async fn delete(
        &self,
        movie_id: Uuid,
        user_id: Uuid,
        cancel: &CancellationToken,
    ) -> StoreResult<bool> {
        let delete = rating::Entity::delete_many()
            .filter(rating::Column::MovieId.eq(movie_id))
            .filter(rating::Column::UserId.eq(user_id));
        let res = cancellable(cancel, delete.exec(&self.db)).await?;
        debug!(movie_id = %movie_id, user_id = %user_id, removed = res.rows_affected, "delete rating");
        Ok(res.rows_affected > 0)
    }

    pub async fn get_ratings_for_user(
        &self,
        user_id: Uuid,
        cancel: &CancellationToken,
    ) -> StoreResult<Vec<MovieRating>> {
        let query = rating::Entity::find()
            .select_only()
            .column(rating::Column::MovieId)
            .column(movie::Column::Slug)
            .column(rating::Column::Rating)
            .join(JoinType::InnerJoin, rating::Relation::Movie.def())
            .filter(rating::Column::UserId.eq(user_id))
            .order_by_asc(movie::Column::Slug)
            .into_model::<MovieRating>();
        cancellable(cancel, query.all(&self.db)).await
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::PaginatorTrait;

    use super::*;
    use crate::{db::test_db, models::Movie, store::MovieStore};

    async fn seeded() -> (RatingStore, Movie, DatabaseConnection) {
        let db = test_db().await;
        let movies = MovieStore::new(db.clone());
        let m = Movie::new(Uuid::new_v4(), "Paris, Texas", 1984, vec!["Drama".to_string()]);
        assert!(movies.create(&m, &CancellationToken::new()).await.unwrap());
        (RatingStore::new(db.clone()), m, db)
    }

    #[tokio::test]
    async fn upsert_overwrites_previous_value() {
        let (ratings, m, db) = seeded().await;
        let cancel = CancellationToken::new();
        let user = Uuid::new_v4();

        assert!(ratings.upsert(m.id, user, 3, &cancel).await.unwrap());
        assert!(ratings.upsert(m.id, user, 5, &cancel).await.unwrap());

        let rows = rating::Entity::find()
            .filter(rating::Column::MovieId.eq(m.id))
            .filter(rating::Column::UserId.eq(user))
            .all(&db)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].rating, 5);
    }

    #[tokio::test]
    async fn average_is_rounded_and_absent_without_ratings() {
        let (ratings, m, _db) = seeded().await;
        let cancel = CancellationToken::new();

        assert_eq!(ratings.get_average(m.id, &cancel).await.unwrap(), None);

        ratings.upsert(m.id, Uuid::new_v4(), 3, &cancel).await.unwrap();
        ratings.upsert(m.id, Uuid::new_v4(), 5, &cancel).await.unwrap();
        assert_eq!(ratings.get_average(m.id, &cancel).await.unwrap(), Some(4.0));

        ratings.upsert(m.id, Uuid::new_v4(), 5, &cancel).await.unwrap();
        assert_eq!(ratings.get_average(m.id, &cancel).await.unwrap(), Some(4.3));
    }

    #[tokio::test]
    async fn summary_reports_average_and_own_rating_independently() {
        let (ratings, m, _db) = seeded().await;
        let cancel = CancellationToken::new();
        let me = Uuid::new_v4();

        let empty = ratings.get_for_user(m.id, me, &cancel).await.unwrap();
        assert_eq!(empty, RatingSummary::default());

        ratings.upsert(m.id, Uuid::new_v4(), 2, &cancel).await.unwrap();
        let others_only = ratings.get_for_user(m.id, me, &cancel).await.unwrap();
        assert_eq!(others_only, RatingSummary { rating: Some(2.0), user_rating: None });

        ratings.upsert(m.id, me, 4, &cancel).await.unwrap();
        let both = ratings.get_for_user(m.id, me, &cancel).await.unwrap();
        assert_eq!(both, RatingSummary { rating: Some(3.0), user_rating: Some(4) });
    }

    #[tokio::test]
    async fn delete_reports_whether_a_row_was_removed() {
        let (ratings, m, db) = seeded().await;
        let cancel = CancellationToken::new();
        let user = Uuid::new_v4();
        ratings.upsert(m.id, user, 1, &cancel).await.unwrap();

        assert!(ratings.delete(m.id, user, &cancel).await.unwrap());
        assert!(!ratings.delete(m.id, user, &cancel).await.unwrap());
        assert_eq!(rating::Entity::find().count(&db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn rating_an_unknown_movie_violates_the_foreign_key() {
        let (ratings, _m, _db) = seeded().await;
        let res = ratings.upsert(Uuid::new_v4(), Uuid::new_v4(), 3, &CancellationToken::new()).await;
        assert!(res.is_err());
    }

    #[tokio::test]
    async fn lists_a_users_ratings_with_slugs() {
        let (ratings, m, db) = seeded().await;
        let cancel = CancellationToken::new();
        let other = Movie::new(Uuid::new_v4(), "Wings of Desire", 1987, vec!["Fantasy".to_string()]);
        MovieStore::new(db).create(&other, &cancel).await.unwrap();
        let me = Uuid::new_v4();
        ratings.upsert(m.id, me, 5, &cancel).await.unwrap();
        ratings.upsert(other.id, me, 4, &cancel).await.unwrap();
        ratings.upsert(other.id, Uuid::new_v4(), 1, &cancel).await.unwrap();

        let mine = ratings.get_ratings_for_user(me, &cancel).await.unwrap();
        assert_eq!(
            mine,
            vec![
                MovieRating { movie_id: m.id, slug: "paris-texas-1984".to_string(), rating: 5 },
                MovieRating {
                    movie_id: other.id,
                    slug: "wings-of-desire-1987".to_string(),
                    rating: 4
                },
            ]
        );
        assert!(ratings.get_ratings_for_user(Uuid::new_v4(), &cancel).await.unwrap().is_empty());
    }
}
