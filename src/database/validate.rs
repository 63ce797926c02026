use std::collections::HashSet;

use crate::constants::{
    EMAIL_MAX_LENGTH, MINIMUM_AMOUNT, MINIMUM_COOKING_TIME, RESERVED_USERNAMES,
    USERNAME_MAX_LENGTH,
};

use super::error::Error;
use super::schema::{IngredientSpec, Uuid};

fn banned_chars(value: &str) -> String {
    let banned: HashSet<char> = value
        .chars()
        .filter(|c| !(c.is_alphanumeric() || matches!(c, '.' | '@' | '+' | '-' | '_')))
        .collect();

    banned
        .into_iter()
        .map(String::from)
        .collect::<Vec<String>>()
        .join(", ")
}

pub fn validate_username(value: &str) -> Result<(), Error> {
    if value.is_empty() || value.chars().count() > USERNAME_MAX_LENGTH {
        return Err(Error::Validation(String::from("Invalid username length")));
    }

    let banned = banned_chars(value);
    if !banned.is_empty() {
        return Err(Error::Validation(format!(
            "Invalid characters in username: {banned}"
        )));
    }

    if RESERVED_USERNAMES.contains(&value.to_lowercase().as_str()) {
        return Err(Error::Validation(format!("Username '{value}' is reserved")));
    }

    Ok(())
}

pub fn validate_email(value: &str) -> Result<(), Error> {
    if value.is_empty() || value.chars().count() > EMAIL_MAX_LENGTH {
        return Err(Error::Validation(String::from("Invalid email length")));
    }

    let banned = banned_chars(value);
    if !banned.is_empty() {
        return Err(Error::Validation(format!(
            "Invalid characters in email: {banned}"
        )));
    }

    if !value.contains('@') {
        return Err(Error::Validation(String::from("Invalid email address")));
    }

    Ok(())
}

/// Aggregate-level checks for a submitted recipe payload. Runs before any
/// mutating statement; a repeated ingredient or tag id is rejected outright,
/// never collapsed into an upsert.
pub fn validate_recipe_payload(
    ingredients: &[IngredientSpec],
    tags: &[Uuid],
    cooking_time: i32,
) -> Result<(), Error> {
    if ingredients.is_empty() {
        return Err(Error::Validation(String::from("Recipe has no ingredients")));
    }

    let mut seen: HashSet<Uuid> = HashSet::new();
    for spec in ingredients {
        if !seen.insert(spec.id) {
            return Err(Error::Validation(format!(
                "Ingredient {} is listed twice",
                spec.id
            )));
        }

        if spec.amount < MINIMUM_AMOUNT {
            return Err(Error::Validation(format!(
                "Amount for ingredient {} is below the minimum",
                spec.id
            )));
        }
    }

    if tags.is_empty() {
        return Err(Error::Validation(String::from("Recipe has no tags")));
    }

    let mut seen: HashSet<Uuid> = HashSet::new();
    for tag in tags {
        if !seen.insert(*tag) {
            return Err(Error::Validation(format!("Tag {tag} is listed twice")));
        }
    }

    if cooking_time < MINIMUM_COOKING_TIME {
        return Err(Error::Validation(String::from(
            "Cooking time is below the minimum",
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(id: Uuid, amount: i32) -> IngredientSpec {
        IngredientSpec { id, amount }
    }

    #[test]
    fn username_rules() {
        assert!(validate_username("kim.cook_01").is_ok());
        assert!(validate_username("").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username("semi;colon").is_err());
        assert!(validate_username("me").is_err());
        assert!(validate_username("Me").is_err());
    }

    #[test]
    fn email_rules() {
        assert!(validate_email("cook@example.org").is_ok());
        assert!(validate_email("cook example.org").is_err());
        assert!(validate_email("cook.example.org").is_err());
        assert!(validate_email("").is_err());
    }

    #[test]
    fn empty_ingredient_list_is_rejected() {
        assert!(validate_recipe_payload(&[], &[1], 10).is_err());
    }

    #[test]
    fn duplicate_ingredient_is_rejected_regardless_of_amount() {
        let payload = [spec(1, 100), spec(2, 50), spec(1, 100)];
        assert!(validate_recipe_payload(&payload, &[1], 10).is_err());

        let payload = [spec(1, 100), spec(1, 999)];
        assert!(validate_recipe_payload(&payload, &[1], 10).is_err());
    }

    #[test]
    fn minimums_are_enforced() {
        assert!(validate_recipe_payload(&[spec(1, 0)], &[1], 10).is_err());
        assert!(validate_recipe_payload(&[spec(1, -5)], &[1], 10).is_err());
        assert!(validate_recipe_payload(&[spec(1, 1)], &[1], 0).is_err());
        assert!(validate_recipe_payload(&[spec(1, 1)], &[1], 1).is_ok());
    }

    #[test]
    fn tag_set_rules() {
        assert!(validate_recipe_payload(&[spec(1, 1)], &[], 10).is_err());
        assert!(validate_recipe_payload(&[spec(1, 1)], &[2, 2], 10).is_err());
        assert!(validate_recipe_payload(&[spec(1, 1)], &[2, 3], 10).is_ok());
    }
}
