use crate::{
    authentication::{
        cryptography::{hash_password, verify_password},
        jwt::generate_session,
    },
    error::{Error, QueryError},
    schema::{User, UserView, Uuid},
    validate::{validate_email, validate_username},
};

use sqlx::{Pool, Postgres};

use super::subscriptions::is_subscribed;

pub async fn get_user_by_email(
    pool: &Pool<Postgres>,
    email: &str,
) -> Result<Option<User>, Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(&*pool)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    Ok(row)
}

pub async fn get_user_by_id(pool: &Pool<Postgres>, user_id: Uuid) -> Result<Option<User>, Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(&*pool)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    Ok(row)
}

/// Creates an account. The password is stored as its argon2 hash; the email
/// and username uniqueness constraints back the application-level checks.
pub async fn register_user(
    email: &str,
    username: &str,
    first_name: &str,
    last_name: &str,
    password: &str,
    pool: &Pool<Postgres>,
) -> Result<Uuid, Error> {
    validate_email(email)?;
    validate_username(username)?;

    let password = hash_password(password)
        .map_err(|_e| Error::Database(String::from("Failed to hash password")))?;

    let row: Option<(Uuid,)> = sqlx::query_as(
        "
        INSERT INTO users (email, username, first_name, last_name, password)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT DO NOTHING RETURNING id;
    ",
    )
    .bind(email)
    .bind(username)
    .bind(first_name)
    .bind(last_name)
    .bind(password)
    .fetch_optional(&*pool)
    .await
    .map_err(|e| QueryError::from(e).into())?;

    match row {
        Some(row) => Ok(row.0),
        None => Err(Error::Conflict(String::from(
            "Email or username is already taken",
        ))),
    }
}

pub async fn login_user(
    email: &str,
    password: &str,
    pool: &Pool<Postgres>,
) -> Result<String, Error> {
    let user = get_user_by_email(pool, email).await?;
    let user = match user {
        Some(user) => user,
        None => return Err(Error::Unauthorized(String::from("Invalid credentials"))),
    };

    let authenticated = verify_password(password, &user.password)
        .map_err(|_e| Error::Unauthorized(String::from("Invalid credentials")))?;
    if !authenticated {
        log::warn!("Failed login attempt for user {}", user.id);
        return Err(Error::Unauthorized(String::from("Invalid credentials")));
    }

    Ok(generate_session(&user))
}

pub async fn change_password(
    user_id: Uuid,
    current: &str,
    new: &str,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    let user = get_user_by_id(pool, user_id)
        .await?
        .ok_or_else(|| Error::NotFound(String::from("No user exists with specified id")))?;

    let authenticated = verify_password(current, &user.password)
        .map_err(|_e| Error::Unauthorized(String::from("Invalid credentials")))?;
    if !authenticated {
        return Err(Error::Unauthorized(String::from("Invalid credentials")));
    }

    if verify_password(new, &user.password).unwrap_or(false) {
        return Err(Error::Validation(String::from(
            "New password must differ from the current one",
        )));
    }

    let password = hash_password(new)
        .map_err(|_e| Error::Database(String::from("Failed to hash password")))?;

    sqlx::query("UPDATE users SET password = $1 WHERE id = $2")
        .bind(password)
        .bind(user_id)
        .execute(&*pool)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    Ok(())
}

/// The externally visible user shape. `is_subscribed` is false for an
/// anonymous viewer.
pub async fn project_user(
    user: User,
    viewer: Option<Uuid>,
    pool: &Pool<Postgres>,
) -> Result<UserView, Error> {
    let subscribed = match viewer {
        Some(viewer_id) => is_subscribed(viewer_id, user.id, pool).await?,
        None => false,
    };

    Ok(UserView::assemble(user, subscribed))
}
