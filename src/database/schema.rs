use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::TypeError;

pub type Uuid = i32;

#[derive(
    Clone, Debug, PartialEq, PartialOrd, sqlx::Type, Serialize, Eq, Ord, Hash, Deserialize,
)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    User,
    Admin,
}

impl TryFrom<Value> for UserRole {
    type Error = TypeError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value.as_str() {
            Some(value) => match value {
                "user" => Ok(Self::User),
                "admin" => Ok(Self::Admin),
                _ => Err(TypeError::new("Invalid variant")),
            },
            None => Err(TypeError::new("Failed to parse value as string")),
        }
    }
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ingredient {
    pub id: Uuid,
    pub name: String,
    pub measurement_unit: String,
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub color: String,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct Recipe {
    pub id: Uuid,
    pub author_id: Uuid,
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Listing row carrying the window total for pagination.
#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct RecipeRow {
    pub id: Uuid,
    pub author_id: Uuid,
    pub name: String,
    pub cooking_time: i32,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub count: i64,
}

/// The minimal recipe shape returned by engagement toggles and used for
/// subscription previews.
#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipeSummary {
    pub id: Uuid,
    pub name: String,
    pub image: Option<String>,
    pub cooking_time: i32,
}

/// One ingredient line joined with its catalog entry, as read projections
/// expose it.
#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipeIngredientView {
    pub id: Uuid,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserView {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
}

impl UserView {
    pub fn assemble(user: User, is_subscribed: bool) -> Self {
        Self {
            id: user.id,
            email: user.email,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            is_subscribed,
        }
    }
}

/// The externally visible recipe shape. Only `is_favorited` and
/// `is_in_shopping_cart` vary with the viewer; both are false for an
/// anonymous one.
#[derive(Debug, Clone, Serialize)]
pub struct RecipeView {
    pub id: Uuid,
    pub author: UserView,
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
    pub image: Option<String>,
    pub ingredients: Vec<RecipeIngredientView>,
    pub tags: Vec<Tag>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

impl RecipeView {
    pub fn assemble(
        recipe: Recipe,
        author: UserView,
        ingredients: Vec<RecipeIngredientView>,
        tags: Vec<Tag>,
        is_favorited: bool,
        is_in_shopping_cart: bool,
    ) -> Self {
        Self {
            id: recipe.id,
            author,
            name: recipe.name,
            text: recipe.text,
            cooking_time: recipe.cooking_time,
            image: recipe.image,
            ingredients,
            tags,
            is_favorited,
            is_in_shopping_cart,
        }
    }
}

/// One `(ingredient, amount)` entry of a submitted recipe payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngredientSpec {
    pub id: Uuid,
    pub amount: i32,
}

impl TryFrom<Value> for IngredientSpec {
    type Error = TypeError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let id = value
            .get("id")
            .and_then(Value::as_i64)
            .ok_or(TypeError::new("Invalid ingredient id"))?;
        let amount = value
            .get("amount")
            .and_then(Value::as_i64)
            .ok_or(TypeError::new("Invalid ingredient amount"))?;

        Ok(Self {
            id: id as Uuid,
            amount: amount as i32,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewRecipe {
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
    pub image: Option<String>,
    pub ingredients: Vec<IngredientSpec>,
    pub tags: Vec<Uuid>,
}

/// Update payload. Scalar fields are applied only when present; the
/// association sets always replace the stored ones wholesale.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipePatch {
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i32>,
    pub image: Option<String>,
    pub ingredients: Vec<IngredientSpec>,
    pub tags: Vec<Uuid>,
}

/// Pre-parsed listing filter handed in by the pagination/filter layer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipeFilter {
    pub tag_slugs: Vec<String>,
    pub author: Option<Uuid>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

/// One raw ingredient line contributing to a user's shopping list.
#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct CartLine {
    pub ingredient_id: Uuid,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

/// A consolidated shopping-list row, ready for the rendering sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShoppingListRow {
    pub ingredient_name: String,
    pub measurement_unit: String,
    pub total_amount: i64,
}

/// One recipe of a followed author, used to build subscription previews.
#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct AuthorRecipeRow {
    pub author_id: Uuid,
    pub id: Uuid,
    pub name: String,
    pub image: Option<String>,
    pub cooking_time: i32,
}

impl From<AuthorRecipeRow> for RecipeSummary {
    fn from(value: AuthorRecipeRow) -> Self {
        Self {
            id: value.id,
            name: value.name,
            image: value.image,
            cooking_time: value.cooking_time,
        }
    }
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct SubscribedAuthorRow {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub recipes_count: i64,
}

/// A followed author annotated with a capped preview of their recipes.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionView {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
    pub recipes: Vec<RecipeSummary>,
    pub recipes_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn recipe() -> Recipe {
        Recipe {
            id: 7,
            author_id: 1,
            name: String::from("Pancakes"),
            text: String::from("Mix and fry"),
            cooking_time: 20,
            image: None,
            created_at: Utc::now(),
        }
    }

    fn author() -> UserView {
        UserView {
            id: 1,
            email: String::from("cook@example.org"),
            username: String::from("cook"),
            first_name: String::from("Kim"),
            last_name: String::from("Cook"),
            is_subscribed: false,
        }
    }

    #[test]
    fn ingredient_spec_from_value() {
        let spec = IngredientSpec::try_from(json!({"id": 3, "amount": 200})).unwrap();
        assert_eq!(spec, IngredientSpec { id: 3, amount: 200 });

        assert!(IngredientSpec::try_from(json!({"id": "three", "amount": 200})).is_err());
        assert!(IngredientSpec::try_from(json!({"id": 3})).is_err());
    }

    #[test]
    fn assembled_view_preserves_association_sets() {
        let ingredients = vec![
            RecipeIngredientView {
                id: 3,
                name: String::from("flour"),
                measurement_unit: String::from("g"),
                amount: 200,
            },
            RecipeIngredientView {
                id: 4,
                name: String::from("milk"),
                measurement_unit: String::from("ml"),
                amount: 300,
            },
        ];
        let tags = vec![Tag {
            id: 2,
            name: String::from("Breakfast"),
            slug: String::from("breakfast"),
            color: String::from("#E26C2D"),
        }];

        let view = RecipeView::assemble(
            recipe(),
            author(),
            ingredients.clone(),
            tags.clone(),
            false,
            false,
        );

        assert_eq!(view.id, 7);
        assert_eq!(view.ingredients, ingredients);
        assert_eq!(view.tags, tags);
        assert!(!view.is_favorited);
        assert!(!view.is_in_shopping_cart);
    }
}
