use sqlx::{Pool, Postgres};

use crate::{
    error::{Error, QueryError},
    schema::{RecipeSummary, Uuid},
};

async fn get_recipe_summary(
    id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<Option<RecipeSummary>, Error> {
    let row: Option<RecipeSummary> =
        sqlx::query_as("SELECT id, name, image, cooking_time FROM recipes WHERE id = $1")
            .bind(id)
            .fetch_optional(&*pool)
            .await
            .map_err(|e| QueryError::from(e).into())?;

    Ok(row)
}

pub async fn is_favorite(id: Uuid, user_id: Uuid, pool: &Pool<Postgres>) -> Result<bool, Error> {
    let result: Option<(Uuid,)> = sqlx::query_as(
        "
        SELECT recipe_id FROM user_favorites WHERE recipe_id = $1 AND user_id = $2
    ",
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(&*pool)
    .await
    .map_err(|e| QueryError::from(e).into())?;

    Ok(result.is_some())
}

pub async fn in_shopping_cart(
    id: Uuid,
    user_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<bool, Error> {
    let result: Option<(Uuid,)> = sqlx::query_as(
        "
        SELECT recipe_id FROM shopping_cart WHERE recipe_id = $1 AND user_id = $2
    ",
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(&*pool)
    .await
    .map_err(|e| QueryError::from(e).into())?;

    Ok(result.is_some())
}

/// Marks a recipe as a favorite. Create-only: a second add for the same pair
/// is a Conflict, not an idempotent success.
pub async fn add_to_favorites(
    id: Uuid,
    user_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<RecipeSummary, Error> {
    let recipe = get_recipe_summary(id, pool).await?;
    let recipe = match recipe {
        Some(recipe) => recipe,
        None => {
            return Err(Error::NotFound(String::from(
                "No recipe exists with specified id",
            )))
        }
    };

    let result = sqlx::query(
        "INSERT INTO user_favorites (user_id, recipe_id) VALUES ($1, $2) ON CONFLICT DO NOTHING;",
    )
    .bind(user_id)
    .bind(id)
    .execute(pool)
    .await
    .map_err(|e| QueryError::from(e).into())?;

    if result.rows_affected() <= 0 {
        return Err(Error::Conflict(String::from(
            "Recipe is already in favorites",
        )));
    }

    Ok(recipe)
}

pub async fn remove_from_favorites(
    id: Uuid,
    user_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    let result = sqlx::query("DELETE FROM user_favorites WHERE user_id = $1 AND recipe_id = $2")
        .bind(user_id)
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    if result.rows_affected() <= 0 {
        return Err(Error::NotFound(String::from("Recipe is not in favorites")));
    }

    Ok(())
}

/// Same contract as the favorite toggle, against the shopping cart table.
pub async fn add_to_shopping_cart(
    id: Uuid,
    user_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<RecipeSummary, Error> {
    let recipe = get_recipe_summary(id, pool).await?;
    let recipe = match recipe {
        Some(recipe) => recipe,
        None => {
            return Err(Error::NotFound(String::from(
                "No recipe exists with specified id",
            )))
        }
    };

    let result = sqlx::query(
        "INSERT INTO shopping_cart (user_id, recipe_id) VALUES ($1, $2) ON CONFLICT DO NOTHING;",
    )
    .bind(user_id)
    .bind(id)
    .execute(pool)
    .await
    .map_err(|e| QueryError::from(e).into())?;

    if result.rows_affected() <= 0 {
        return Err(Error::Conflict(String::from(
            "Recipe is already in the shopping cart",
        )));
    }

    Ok(recipe)
}

pub async fn remove_from_shopping_cart(
    id: Uuid,
    user_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    let result = sqlx::query("DELETE FROM shopping_cart WHERE user_id = $1 AND recipe_id = $2")
        .bind(user_id)
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    if result.rows_affected() <= 0 {
        return Err(Error::NotFound(String::from(
            "Recipe is not in the shopping cart",
        )));
    }

    Ok(())
}
