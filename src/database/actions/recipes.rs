use std::collections::HashSet;

use sqlx::{Pool, Postgres, QueryBuilder, Transaction};

use crate::{
    authentication::permissions::ActionType,
    constants::RECIPE_COUNT_PER_PAGE,
    error::{Error, QueryError},
    jwt::SessionData,
    pagination::PageContext,
    schema::{
        IngredientSpec, NewRecipe, Recipe, RecipeFilter, RecipeIngredientView, RecipePatch,
        RecipeRow, RecipeView, Tag, Uuid,
    },
    validate::validate_recipe_payload,
};

use super::engagement::{in_shopping_cart, is_favorite};
use super::users::{get_user_by_id, project_user};

pub async fn get_recipe(id: Uuid, pool: &Pool<Postgres>) -> Result<Option<Recipe>, Error> {
    let row: Option<Recipe> = sqlx::query_as("SELECT * FROM recipes WHERE id = $1")
        .bind(id)
        .fetch_optional(&*pool)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    Ok(row)
}

/// Fetches a recipe for mutation on behalf of the session. Admins may touch
/// any recipe, everyone else only their own.
pub async fn get_recipe_mut(
    id: Uuid,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<Recipe, Error> {
    let recipe = get_recipe(id, pool).await?;
    session.authenticate(ActionType::ManageOwnRecipes)?;

    match recipe {
        Some(recipe) => match session.authenticate(ActionType::ManageAllRecipes) {
            Ok(_) => Ok(recipe),
            Err(_) => {
                if recipe.author_id != session.user_id {
                    Err(Error::Forbidden(String::from(
                        "Only the author may modify this recipe",
                    )))
                } else {
                    Ok(recipe)
                }
            }
        },
        None => Err(Error::NotFound(String::from(
            "No recipe exists with specified id",
        ))),
    }
}

async fn resolve_ingredient_ids(ids: &[Uuid], pool: &Pool<Postgres>) -> Result<(), Error> {
    let rows: Vec<(Uuid,)> = sqlx::query_as("SELECT id FROM ingredients WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(&*pool)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    let found: HashSet<Uuid> = rows.into_iter().map(|r| r.0).collect();
    if let Some(missing) = ids.iter().find(|id| !found.contains(id)) {
        return Err(Error::NotFound(format!(
            "Ingredient {missing} does not exist"
        )));
    }

    Ok(())
}

async fn resolve_tag_ids(ids: &[Uuid], pool: &Pool<Postgres>) -> Result<(), Error> {
    let rows: Vec<(Uuid,)> = sqlx::query_as("SELECT id FROM tags WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(&*pool)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    let found: HashSet<Uuid> = rows.into_iter().map(|r| r.0).collect();
    if let Some(missing) = ids.iter().find(|id| !found.contains(id)) {
        return Err(Error::NotFound(format!("Tag {missing} does not exist")));
    }

    Ok(())
}

async fn insert_ingredient_lines(
    recipe_id: Uuid,
    specs: &[IngredientSpec],
    tr: &mut Transaction<'_, Postgres>,
) -> Result<(), Error> {
    let mut query_builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) ");

    query_builder.push_values(specs.iter(), |mut b, spec| {
        b.push_bind(recipe_id)
            .push_bind(spec.id)
            .push_bind(spec.amount);
    });

    query_builder
        .build()
        .execute(&mut **tr)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    Ok(())
}

async fn insert_tag_links(
    recipe_id: Uuid,
    tags: &[Uuid],
    tr: &mut Transaction<'_, Postgres>,
) -> Result<(), Error> {
    let mut query_builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO recipe_tag_links (recipe_id, tag_id) ");

    query_builder.push_values(tags.iter(), |mut b, tag_id| {
        b.push_bind(recipe_id).push_bind(*tag_id);
    });

    query_builder
        .build()
        .execute(&mut **tr)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    Ok(())
}

/// Creates a recipe together with its full ingredient and tag sets in one
/// transaction. Nothing is written if any check fails; a lost race on a
/// uniqueness constraint surfaces as Conflict.
pub async fn create_recipe(
    author_id: Uuid,
    payload: NewRecipe,
    pool: &Pool<Postgres>,
) -> Result<RecipeView, Error> {
    validate_recipe_payload(&payload.ingredients, &payload.tags, payload.cooking_time)?;

    let ingredient_ids: Vec<Uuid> = payload.ingredients.iter().map(|spec| spec.id).collect();
    resolve_ingredient_ids(&ingredient_ids, pool).await?;
    resolve_tag_ids(&payload.tags, pool).await?;

    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()).into())?;

    let recipe: (Uuid,) = sqlx::query_as(
        "
        INSERT INTO recipes (author_id, name, text, cooking_time, image)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
    ",
    )
    .bind(author_id)
    .bind(&payload.name)
    .bind(&payload.text)
    .bind(payload.cooking_time)
    .bind(&payload.image)
    .fetch_one(&mut *tr)
    .await
    .map_err(|e| QueryError::from(e).into())?;

    let recipe_id = recipe.0;

    insert_ingredient_lines(recipe_id, &payload.ingredients, &mut tr).await?;
    insert_tag_links(recipe_id, &payload.tags, &mut tr).await?;

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()).into())?;

    match project_recipe(recipe_id, Some(author_id), pool).await? {
        Some(view) => Ok(view),
        None => Err(Error::Database(String::from(
            "Recipe disappeared after insert",
        ))),
    }
}

/// Updates a recipe as a full replace of its association sets: the stored
/// ingredient lines and tag links are deleted and the submitted ones
/// inserted, all inside one transaction, so readers never observe a recipe
/// with a partial set. Scalar fields change only where the patch carries
/// them.
pub async fn update_recipe(
    id: Uuid,
    session: &SessionData,
    patch: RecipePatch,
    pool: &Pool<Postgres>,
) -> Result<RecipeView, Error> {
    let recipe = get_recipe_mut(id, session, pool).await?;

    let cooking_time = patch.cooking_time.unwrap_or(recipe.cooking_time);
    validate_recipe_payload(&patch.ingredients, &patch.tags, cooking_time)?;

    let ingredient_ids: Vec<Uuid> = patch.ingredients.iter().map(|spec| spec.id).collect();
    resolve_ingredient_ids(&ingredient_ids, pool).await?;
    resolve_tag_ids(&patch.tags, pool).await?;

    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()).into())?;

    sqlx::query(
        "
        UPDATE recipes SET
        name = COALESCE($1, name),
        text = COALESCE($2, text),
        cooking_time = COALESCE($3, cooking_time),
        image = COALESCE($4, image)
        WHERE id = $5
    ",
    )
    .bind(&patch.name)
    .bind(&patch.text)
    .bind(patch.cooking_time)
    .bind(&patch.image)
    .bind(id)
    .execute(&mut *tr)
    .await
    .map_err(|e| QueryError::from(e).into())?;

    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    sqlx::query("DELETE FROM recipe_tag_links WHERE recipe_id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    insert_ingredient_lines(id, &patch.ingredients, &mut tr).await?;
    insert_tag_links(id, &patch.tags, &mut tr).await?;

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()).into())?;

    log::trace!("Replaced association sets for recipe {id}");

    match project_recipe(id, Some(session.user_id), pool).await? {
        Some(view) => Ok(view),
        None => Err(Error::Database(String::from(
            "Recipe disappeared after update",
        ))),
    }
}

/// Deletes a recipe and every row referencing it in one transaction. The
/// schema cascades cover the same rows; the deletes are spelled out here as
/// the documented ownership rule.
pub async fn delete_recipe(
    id: Uuid,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    get_recipe_mut(id, session, pool).await?;

    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()).into())?;

    sqlx::query("DELETE FROM user_favorites WHERE recipe_id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    sqlx::query("DELETE FROM shopping_cart WHERE recipe_id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    sqlx::query("DELETE FROM recipe_tag_links WHERE recipe_id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()).into())?;

    log::info!("Deleted recipe {id} and its association rows");

    Ok(())
}

pub async fn list_recipe_ingredients(
    recipe_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipeIngredientView>, Error> {
    let rows: Vec<RecipeIngredientView> = sqlx::query_as("
        SELECT i.id AS id, i.name AS name, i.measurement_unit AS measurement_unit, ri.amount AS amount
        FROM recipe_ingredients ri
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE ri.recipe_id = $1
        ORDER BY ri.id
    ")
    .bind(recipe_id)
    .fetch_all(pool).await.map_err(|e| QueryError::from(e).into())?;

    Ok(rows)
}

pub async fn list_recipe_tags(recipe_id: Uuid, pool: &Pool<Postgres>) -> Result<Vec<Tag>, Error> {
    let rows: Vec<Tag> = sqlx::query_as(
        "
        SELECT t.*
        FROM recipe_tag_links l
        INNER JOIN tags t ON t.id = l.tag_id
        WHERE l.recipe_id = $1
        ORDER BY t.id
    ",
    )
    .bind(recipe_id)
    .fetch_all(pool)
    .await
    .map_err(|e| QueryError::from(e).into())?;

    Ok(rows)
}

/// Assembles the externally visible recipe shape for a viewer. Only the two
/// engagement booleans depend on the viewer; both are false for None.
pub async fn project_recipe(
    id: Uuid,
    viewer: Option<Uuid>,
    pool: &Pool<Postgres>,
) -> Result<Option<RecipeView>, Error> {
    let recipe = match get_recipe(id, pool).await? {
        Some(recipe) => recipe,
        None => return Ok(None),
    };

    let author = get_user_by_id(pool, recipe.author_id)
        .await?
        .ok_or_else(|| Error::Database(String::from("Recipe author is missing")))?;
    let author = project_user(author, viewer, pool).await?;

    let ingredients = list_recipe_ingredients(id, pool).await?;
    let tags = list_recipe_tags(id, pool).await?;

    let (is_favorited, is_in_shopping_cart) = match viewer {
        Some(viewer_id) => (
            is_favorite(id, viewer_id, pool).await?,
            in_shopping_cart(id, viewer_id, pool).await?,
        ),
        None => (false, false),
    };

    Ok(Some(RecipeView::assemble(
        recipe,
        author,
        ingredients,
        tags,
        is_favorited,
        is_in_shopping_cart,
    )))
}

/// Paged listing narrowed by the pre-parsed filter descriptor. The viewer
/// flags filter on the viewer's own engagement rows and therefore require an
/// authenticated viewer.
pub async fn fetch_recipes(
    filter: &RecipeFilter,
    viewer: Option<Uuid>,
    offset: i64,
    pool: &Pool<Postgres>,
) -> Result<PageContext<RecipeRow>, Error> {
    if (filter.is_favorited || filter.is_in_shopping_cart) && viewer.is_none() {
        return Err(Error::Validation(String::from(
            "Viewer-scoped filters require an authenticated viewer",
        )));
    }

    let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new(
        "SELECT r.id, r.author_id, r.name, r.cooking_time, r.image, r.created_at, COUNT(*) OVER() AS count FROM recipes r WHERE TRUE",
    );

    if !filter.tag_slugs.is_empty() {
        query_builder.push(
            " AND EXISTS (SELECT 1 FROM recipe_tag_links l INNER JOIN tags t ON t.id = l.tag_id WHERE l.recipe_id = r.id AND t.slug = ANY(",
        );
        query_builder.push_bind(filter.tag_slugs.clone());
        query_builder.push("))");
    }

    if let Some(author) = filter.author {
        query_builder.push(" AND r.author_id = ");
        query_builder.push_bind(author);
    }

    if filter.is_favorited {
        query_builder.push(
            " AND EXISTS (SELECT 1 FROM user_favorites f WHERE f.recipe_id = r.id AND f.user_id = ",
        );
        query_builder.push_bind(viewer);
        query_builder.push(")");
    }

    if filter.is_in_shopping_cart {
        query_builder.push(
            " AND EXISTS (SELECT 1 FROM shopping_cart sc WHERE sc.recipe_id = r.id AND sc.user_id = ",
        );
        query_builder.push_bind(viewer);
        query_builder.push(")");
    }

    query_builder.push(" ORDER BY r.created_at DESC, r.id DESC LIMIT ");
    query_builder.push_bind(RECIPE_COUNT_PER_PAGE);
    query_builder.push(" OFFSET ");
    query_builder.push_bind(offset);

    let rows: Vec<RecipeRow> = query_builder
        .build_query_as()
        .fetch_all(pool)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    let total_count = rows.get(0).map(|p| p.count).unwrap_or(0);
    let page = PageContext::from_rows(rows, total_count, RECIPE_COUNT_PER_PAGE, offset);
    Ok(page)
}
