use std::collections::HashMap;

use sqlx::{Pool, Postgres};

use crate::{
    error::{Error, QueryError},
    schema::{AuthorRecipeRow, RecipeSummary, SubscribedAuthorRow, SubscriptionView, Uuid},
};

use super::users::get_user_by_id;

pub async fn is_subscribed(
    user_id: Uuid,
    author_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<bool, Error> {
    let result: Option<(Uuid,)> = sqlx::query_as(
        "
        SELECT author_id FROM subscriptions WHERE user_id = $1 AND author_id = $2
    ",
    )
    .bind(user_id)
    .bind(author_id)
    .fetch_optional(&*pool)
    .await
    .map_err(|e| QueryError::from(e).into())?;

    Ok(result.is_some())
}

/// Follows an author. Self-subscription is rejected here; the storage
/// constraint only covers duplicate pairs.
pub async fn subscribe(user_id: Uuid, author_id: Uuid, pool: &Pool<Postgres>) -> Result<(), Error> {
    if user_id == author_id {
        return Err(Error::Validation(String::from(
            "You cannot subscribe to yourself",
        )));
    }

    let author = get_user_by_id(pool, author_id).await?;
    if author.is_none() {
        return Err(Error::NotFound(String::from(
            "No user exists with specified id",
        )));
    }

    let result = sqlx::query(
        "INSERT INTO subscriptions (user_id, author_id) VALUES ($1, $2) ON CONFLICT DO NOTHING;",
    )
    .bind(user_id)
    .bind(author_id)
    .execute(pool)
    .await
    .map_err(|e| QueryError::from(e).into())?;

    if result.rows_affected() <= 0 {
        return Err(Error::Conflict(String::from(
            "Already subscribed to this author",
        )));
    }

    Ok(())
}

pub async fn unsubscribe(
    user_id: Uuid,
    author_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    let result = sqlx::query("DELETE FROM subscriptions WHERE user_id = $1 AND author_id = $2")
        .bind(user_id)
        .bind(author_id)
        .execute(pool)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    if result.rows_affected() <= 0 {
        return Err(Error::NotFound(String::from(
            "Not subscribed to this author",
        )));
    }

    Ok(())
}

/// Every author the user follows, each with their recipe count and a capped
/// preview of their most recent recipes. Authors come back id-ascending.
pub async fn list_subscriptions(
    user_id: Uuid,
    recipes_limit: i64,
    pool: &Pool<Postgres>,
) -> Result<Vec<SubscriptionView>, Error> {
    let authors: Vec<SubscribedAuthorRow> = sqlx::query_as(
        "
        SELECT u.id, u.email, u.username, u.first_name, u.last_name,
            (SELECT COUNT(*) FROM recipes r WHERE r.author_id = u.id) AS recipes_count
        FROM subscriptions s
        INNER JOIN users u ON u.id = s.author_id
        WHERE s.user_id = $1
        ORDER BY u.id
    ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(|e| QueryError::from(e).into())?;

    if authors.is_empty() {
        return Ok(vec![]);
    }

    let author_ids: Vec<Uuid> = authors.iter().map(|author| author.id).collect();

    let rows: Vec<AuthorRecipeRow> = sqlx::query_as(
        "
        SELECT r.author_id AS author_id, r.id AS id, r.name AS name, r.image AS image, r.cooking_time AS cooking_time
        FROM recipes r
        WHERE r.author_id = ANY($1)
        ORDER BY r.created_at DESC, r.id DESC
    ",
    )
    .bind(&author_ids)
    .fetch_all(pool)
    .await
    .map_err(|e| QueryError::from(e).into())?;

    let mut previews: HashMap<Uuid, Vec<RecipeSummary>> = HashMap::new();
    rows.into_iter()
        .for_each(|row| match previews.get_mut(&row.author_id) {
            Some(v) => v.push(row.into()),
            None => {
                previews.insert(row.author_id, vec![row.into()]);
            }
        });

    let cap = recipes_limit.max(0) as usize;
    Ok(authors
        .into_iter()
        .map(|author| {
            let mut recipes = previews.remove(&author.id).unwrap_or_default();
            recipes.truncate(cap);

            SubscriptionView {
                id: author.id,
                email: author.email,
                username: author.username,
                first_name: author.first_name,
                last_name: author.last_name,
                is_subscribed: true,
                recipes,
                recipes_count: author.recipes_count,
            }
        })
        .collect())
}
