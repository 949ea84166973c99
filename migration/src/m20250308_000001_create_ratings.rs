use sea_orm_migration::{prelude::*, schema::*};

use crate::m20250301_000001_create_movies::Movies;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Ratings::Table)
                    .if_not_exists()
                    .col(uuid(Ratings::UserId))
                    .col(uuid(Ratings::MovieId))
                    .col(integer(Ratings::Rating))
                    .primary_key(Index::create().col(Ratings::UserId).col(Ratings::MovieId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ratings_movie_id")
                            .from(Ratings::Table, Ratings::MovieId)
                            .to(Movies::Table, Movies::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("ratings_movie_id_idx")
                    .table(Ratings::Table)
                    .if_not_exists()
                    .col(Ratings::MovieId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Ratings::Table).to_owned()).await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Ratings {
    Table,
    UserId,
    MovieId,
    Rating,
}
