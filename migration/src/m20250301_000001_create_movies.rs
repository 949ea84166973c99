use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Movies::Table)
                    .if_not_exists()
                    .col(uuid(Movies::Id).primary_key())
                    .col(string(Movies::Slug))
                    .col(string(Movies::Title))
                    .col(integer(Movies::YearOfRelease))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("movies_slug_idx")
                    .table(Movies::Table)
                    .if_not_exists()
                    .col(Movies::Slug)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Genres::Table)
                    .if_not_exists()
                    .col(pk_auto(Genres::Id))
                    .col(uuid(Genres::MovieId))
                    .col(string(Genres::Name))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_genres_movie_id")
                            .from(Genres::Table, Genres::MovieId)
                            .to(Movies::Table, Movies::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("genres_movie_name_idx")
                    .table(Genres::Table)
                    .if_not_exists()
                    .col(Genres::MovieId)
                    .col(Genres::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Genres::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Movies::Table).to_owned()).await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
pub(crate) enum Movies {
    Table,
    Id,
    Slug,
    Title,
    YearOfRelease,
}

#[derive(DeriveIden)]
enum Genres {
    Table,
    Id,
    MovieId,
    Name,
}
