use sqlx::{Pool, Postgres};

use crate::{
    error::{Error, QueryError},
    schema::{Ingredient, Uuid},
};

/// Creates a catalog ingredient, unique by (name, measurement_unit).
pub async fn create_ingredient(
    name: &str,
    measurement_unit: &str,
    pool: &Pool<Postgres>,
) -> Result<Uuid, Error> {
    let row: Option<(Uuid,)> = sqlx::query_as(
        "
        INSERT INTO ingredients (name, measurement_unit)
        VALUES ($1, $2)
        ON CONFLICT DO NOTHING RETURNING id;
    ",
    )
    .bind(name)
    .bind(measurement_unit)
    .fetch_optional(&*pool)
    .await
    .map_err(|e| QueryError::from(e).into())?;

    match row {
        Some(row) => Ok(row.0),
        None => Err(Error::Conflict(String::from("Ingredient already exists"))),
    }
}

pub async fn get_ingredient(id: Uuid, pool: &Pool<Postgres>) -> Result<Option<Ingredient>, Error> {
    let row: Option<Ingredient> = sqlx::query_as("SELECT * FROM ingredients WHERE id = $1")
        .bind(id)
        .fetch_optional(&*pool)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    Ok(row)
}

pub async fn find_ingredient(
    name: &str,
    measurement_unit: &str,
    pool: &Pool<Postgres>,
) -> Result<Option<Uuid>, Error> {
    let row: Option<(Uuid,)> = sqlx::query_as(
        "SELECT id FROM ingredients WHERE LOWER(name) = LOWER($1) AND measurement_unit = $2",
    )
    .bind(name)
    .bind(measurement_unit)
    .fetch_optional(&*pool)
    .await
    .map_err(|e| QueryError::from(e).into())?;

    Ok(row.map(|r| r.0))
}

/// Reference data listing with an optional name substring filter. Small
/// enough to stay unpaginated.
pub async fn fetch_ingredients(
    search: Option<&str>,
    pool: &Pool<Postgres>,
) -> Result<Vec<Ingredient>, Error> {
    let rows: Vec<Ingredient> = match search {
        Some(search) => {
            sqlx::query_as("SELECT * FROM ingredients WHERE name ILIKE $1 ORDER BY id")
                .bind(format!("%{search}%"))
                .fetch_all(&*pool)
                .await
                .map_err(|e| QueryError::from(e).into())?
        }
        None => sqlx::query_as("SELECT * FROM ingredients ORDER BY id")
            .fetch_all(&*pool)
            .await
            .map_err(|e| QueryError::from(e).into())?,
    };

    Ok(rows)
}
