use sqlx::{Pool, Postgres};

use crate::{
    error::{Error, QueryError},
    schema::{Tag, Uuid},
};

/// Creates a tag. Name, slug and color are each globally unique; clashing on
/// any of them is a Conflict.
pub async fn create_tag(
    name: &str,
    slug: &str,
    color: &str,
    pool: &Pool<Postgres>,
) -> Result<Uuid, Error> {
    let row: Option<(Uuid,)> = sqlx::query_as(
        "
        INSERT INTO tags (name, slug, color)
        VALUES ($1, $2, $3)
        ON CONFLICT DO NOTHING RETURNING id;
    ",
    )
    .bind(name)
    .bind(slug)
    .bind(color)
    .fetch_optional(&*pool)
    .await
    .map_err(|e| QueryError::from(e).into())?;

    match row {
        Some(row) => Ok(row.0),
        None => Err(Error::Conflict(String::from("Tag already exists"))),
    }
}

pub async fn get_tag(id: Uuid, pool: &Pool<Postgres>) -> Result<Option<Tag>, Error> {
    let row: Option<Tag> = sqlx::query_as("SELECT * FROM tags WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    Ok(row)
}

pub async fn find_tag(slug: &str, pool: &Pool<Postgres>) -> Result<Option<Uuid>, Error> {
    let row: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM tags WHERE slug = $1")
        .bind(slug)
        .fetch_optional(pool)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    Ok(row.map(|tag| tag.0))
}

pub async fn list_tags(pool: &Pool<Postgres>) -> Result<Vec<Tag>, Error> {
    let rows: Vec<Tag> = sqlx::query_as("SELECT * FROM tags ORDER BY name")
        .fetch_all(pool)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    Ok(rows)
}
