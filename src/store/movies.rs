use sea_orm::{
    ActiveValue::NotSet, ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait,
    FromQueryResult, JoinType, Order, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    RelationTrait, Select, Set,
    sea_query::{Expr, Func, LikeExpr, OnConflict, SimpleExpr},
};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

use super::{begin, cancellable, settle};
use crate::{
    entities::{genre, movie, rating},
    error::StoreResult,
    models::{GetAllMoviesOptions, Movie, SortField, SortOrder},
};

const AVERAGE_RATING: &str = r#"ROUND(AVG("ratings"."rating"), 1)"#;
const OWN_RATING: &str =
    r#"MAX(CASE WHEN "ratings"."user_id" = ? THEN "ratings"."rating" END)"#;
const GENRE_LIST: &str = r#"GROUP_CONCAT("genres"."name", char(31))"#;
const GENRE_SEPARATOR: char = '\u{1f}';

#[derive(Debug, FromQueryResult)]
struct RatedMovieRow {
    id: Uuid,
    title: String,
    year_of_release: i32,
    rating: Option<f64>,
    user_rating: Option<i32>,
}

#[derive(Debug, FromQueryResult)]
struct MovieListingRow {
    id: Uuid,
    title: String,
    year_of_release: i32,
    genres: Option<String>,
    rating: Option<f64>,
    user_rating: Option<i32>,
}

impl From<MovieListingRow> for Movie {
    fn from(row: MovieListingRow) -> Self {
        Movie {
            id: row.id,
            title: row.title,
            year_of_release: row.year_of_release,
            genres: split_genres(row.genres.as_deref()),
            rating: row.rating,
            user_rating: row.user_rating,
        }
    }
}

#[derive(Clone)]
pub struct MovieStore {
    db: DatabaseConnection,
}

impl MovieStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn create(&self, movie: &Movie, cancel: &CancellationToken) -> StoreResult<bool> {
        let txn = begin(&self.db, cancel).await?;
        let outcome = cancellable(cancel, insert_movie(&txn, movie)).await;
        let created = settle(txn, cancel, outcome).await?;
        debug!(id = %movie.id, slug = %movie.slug(), created, "create movie");
        Ok(created)
    }

    pub async fn get_by_id(
        &self,
        id: Uuid,
        user_id: Option<Uuid>,
        cancel: &CancellationToken,
    ) -> StoreResult<Option<Movie>> {
        let query = rated_movies(user_id).filter(movie::Column::Id.eq(id));
        let row = cancellable(cancel, query.into_model::<RatedMovieRow>().one(&self.db)).await?;
        self.hydrate(row, cancel).await
    }

    pub async fn get_by_slug(
        &self,
        slug: &str,
        user_id: Option<Uuid>,
        cancel: &CancellationToken,
    ) -> StoreResult<Option<Movie>> {
        let query = rated_movies(user_id).filter(movie::Column::Slug.eq(slug));
        let row = cancellable(cancel, query.into_model::<RatedMovieRow>().one(&self.db)).await?;
        self.hydrate(row, cancel).await
    }

    pub async fn exists_by_id(&self, id: Uuid, cancel: &CancellationToken) -> StoreResult<bool> {
        let count = cancellable(cancel, movie::Entity::find_by_id(id).count(&self.db)).await?;
        Ok(count > 0)
    }

    pub async fn get_all(
        &self,
        options: &GetAllMoviesOptions,
        cancel: &CancellationToken,
    ) -> StoreResult<Vec<Movie>> {
        let Some(offset) = page_offset(options.page, options.page_size) else {
            debug!(page = options.page, page_size = options.page_size, "page beyond any offset");
            return Ok(Vec::new());
        };

        let mut query = rated_movies(options.user_id)
            .column_as(Expr::cust(GENRE_LIST), "genres")
            .join(JoinType::LeftJoin, movie::Relation::Genres.def());

        if let Some(title) = options.title.as_deref() {
            // SQLite's LOWER() folds ASCII only; fold the needle the same way.
            let pattern = format!("%{}%", escape_like(&title.to_ascii_lowercase()));
            query = query.filter(
                Expr::expr(Func::lower(Expr::col((movie::Entity, movie::Column::Title))))
                    .like(LikeExpr::new(pattern).escape('\\')),
            );
        }

        if let Some(year) = options.year_of_release {
            query = query.filter(movie::Column::YearOfRelease.eq(year));
        }

        if let Some((field, order)) = options.sort() {
            let order = match order {
                SortOrder::Descending => Order::Desc,
                _ => Order::Asc,
            };
            query = match field {
                SortField::Title => {
                    query.order_by(Expr::cust(r#""movies"."title" COLLATE NOCASE"#), order)
                },
                SortField::YearOfRelease => query.order_by(movie::Column::YearOfRelease, order),
            };
        }

        let rows = cancellable(
            cancel,
            query
                .offset(offset)
                .limit(options.page_size)
                .into_model::<MovieListingRow>()
                .all(&self.db),
        )
        .await?;

        debug!(
            rows = rows.len(),
            page = options.page,
            page_size = options.page_size,
            "list movies"
        );
        Ok(rows.into_iter().map(Movie::from).collect())
    }

    pub async fn update(&self, movie: &Movie, cancel: &CancellationToken) -> StoreResult<bool> {
        let txn = begin(&self.db, cancel).await?;
        let outcome = cancellable(cancel, replace_movie(&txn, movie)).await;
        let updated = settle(txn, cancel, outcome).await?;
        debug!(id = %movie.id, slug = %movie.slug(), updated, "update movie");
        Ok(updated)
    }

    pub async fn delete_by_id(&self, id: Uuid, cancel: &CancellationToken) -> StoreResult<bool> {
        let txn = begin(&self.db, cancel).await?;
        let outcome = cancellable(cancel, remove_movie(&txn, id)).await;
        let deleted = settle(txn, cancel, outcome).await?;
        debug!(id = %id, deleted, "delete movie");
        Ok(deleted)
    }

    async fn hydrate(
        &self,
        row: Option<RatedMovieRow>,
        cancel: &CancellationToken,
    ) -> StoreResult<Option<Movie>> {
        let Some(row) = row else {
            return Ok(None);
        };

        let genres = cancellable(
            cancel,
            genre::Entity::find()
                .filter(genre::Column::MovieId.eq(row.id))
                .order_by_asc(genre::Column::Id)
                .all(&self.db),
        )
        .await?;

        Ok(Some(Movie {
            id: row.id,
            title: row.title,
            year_of_release: row.year_of_release,
            genres: genres.into_iter().map(|g| g.name).collect(),
            rating: row.rating,
            user_rating: row.user_rating,
        }))
    }
}

/// Movies left-joined with their ratings, one row per movie, carrying the
/// rounded average and the given user's own rating.
fn rated_movies(user_id: Option<Uuid>) -> Select<movie::Entity> {
    movie::Entity::find()
        .select_only()
        .columns([movie::Column::Id, movie::Column::Title, movie::Column::YearOfRelease])
        .column_as(Expr::cust(AVERAGE_RATING), "rating")
        .column_as(own_rating(user_id), "user_rating")
        .join(JoinType::LeftJoin, movie::Relation::Ratings.def())
        .group_by(movie::Column::Id)
        .group_by(movie::Column::Title)
        .group_by(movie::Column::YearOfRelease)
}

fn own_rating(user_id: Option<Uuid>) -> SimpleExpr {
    match user_id {
        Some(user_id) => Expr::cust_with_values(OWN_RATING, [user_id]),
        None => Expr::cust("NULL"),
    }
}

async fn insert_movie(txn: &DatabaseTransaction, movie: &Movie) -> Result<bool, DbErr> {
    let model = movie::ActiveModel {
        id: Set(movie.id),
        slug: Set(movie.slug()),
        title: Set(movie.title.clone()),
        year_of_release: Set(movie.year_of_release),
    };

    let inserted = movie::Entity::insert(model)
        .on_conflict(OnConflict::column(movie::Column::Id).do_nothing().to_owned())
        .exec_without_returning(txn)
        .await?;
    if inserted != 1 {
        return Ok(false);
    }

    insert_genres(txn, movie).await?;
    Ok(true)
}

// The movie row is touched first so a missing id never reaches the genre
// foreign key; all three statements share one transaction either way.
async fn replace_movie(txn: &DatabaseTransaction, movie: &Movie) -> Result<bool, DbErr> {
    let updated = movie::Entity::update_many()
        .col_expr(movie::Column::Slug, Expr::value(movie.slug()))
        .col_expr(movie::Column::Title, Expr::value(movie.title.clone()))
        .col_expr(movie::Column::YearOfRelease, Expr::value(movie.year_of_release))
        .filter(movie::Column::Id.eq(movie.id))
        .exec(txn)
        .await?;
    if updated.rows_affected != 1 {
        return Ok(false);
    }

    genre::Entity::delete_many().filter(genre::Column::MovieId.eq(movie.id)).exec(txn).await?;
    insert_genres(txn, movie).await?;
    Ok(true)
}

async fn remove_movie(txn: &DatabaseTransaction, id: Uuid) -> Result<bool, DbErr> {
    genre::Entity::delete_many().filter(genre::Column::MovieId.eq(id)).exec(txn).await?;
    rating::Entity::delete_many().filter(rating::Column::MovieId.eq(id)).exec(txn).await?;
    let deleted = movie::Entity::delete_by_id(id).exec(txn).await?;
    Ok(deleted.rows_affected == 1)
}

async fn insert_genres(txn: &DatabaseTransaction, movie: &Movie) -> Result<(), DbErr> {
    for name in &movie.genres {
        let model = genre::ActiveModel {
            id: NotSet,
            movie_id: Set(movie.id),
            name: Set(name.clone()),
        };
        genre::Entity::insert(model).exec_without_returning(txn).await?;
    }
    Ok(())
}

/// Row offset of `page`, or `None` when it cannot be bound as an SQLite integer.
fn page_offset(page: u64, page_size: u64) -> Option<u64> {
    page.saturating_sub(1).checked_mul(page_size).filter(|offset| *offset <= i64::MAX as u64)
}

fn split_genres(raw: Option<&str>) -> Vec<String> {
    let mut genres: Vec<String> = Vec::new();
    for name in raw.into_iter().flat_map(|r| r.split(GENRE_SEPARATOR)) {
        if !name.is_empty() && !genres.iter().any(|g| g == name) {
            genres.push(name.to_string());
        }
    }
    genres
}

fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
