use std::collections::HashMap;

use sqlx::{Pool, Postgres};

use crate::{
    error::{Error, QueryError},
    schema::{CartLine, ShoppingListRow, Uuid},
};

/// Every ingredient line contributed by the recipes currently in the user's
/// shopping cart, joined with the catalog entry.
pub async fn fetch_cart_lines(
    user_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<Vec<CartLine>, Error> {
    let rows: Vec<CartLine> = sqlx::query_as("
        SELECT ri.ingredient_id AS ingredient_id, i.name AS name, i.measurement_unit AS measurement_unit, ri.amount AS amount
        FROM shopping_cart sc
        INNER JOIN recipe_ingredients ri ON ri.recipe_id = sc.recipe_id
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE sc.user_id = $1
    ")
    .bind(user_id)
    .fetch_all(pool).await.map_err(|e| QueryError::from(e).into())?;

    Ok(rows)
}

/// Consolidates raw cart lines into one row per distinct ingredient, summing
/// amounts across recipes. The measurement unit is a property of the
/// ingredient, so every contributing line carries the same one. Output is
/// ingredient-id ascending.
pub fn merge_cart_lines(lines: Vec<CartLine>) -> Vec<ShoppingListRow> {
    let mut totals: HashMap<Uuid, (String, String, i64)> = HashMap::new();

    lines
        .into_iter()
        .for_each(|line| match totals.get_mut(&line.ingredient_id) {
            Some(entry) => entry.2 += line.amount as i64,
            None => {
                totals.insert(
                    line.ingredient_id,
                    (line.name, line.measurement_unit, line.amount as i64),
                );
            }
        });

    let mut totals: Vec<(Uuid, (String, String, i64))> = totals.into_iter().collect();
    totals.sort_by_key(|(id, _)| *id);

    totals
        .into_iter()
        .map(
            |(_, (ingredient_name, measurement_unit, total_amount))| ShoppingListRow {
                ingredient_name,
                measurement_unit,
                total_amount,
            },
        )
        .collect()
}

/// The consolidated shopping list for a user, ready to hand to the rendering
/// sink.
pub async fn build_shopping_list(
    user_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<Vec<ShoppingListRow>, Error> {
    let lines = fetch_cart_lines(user_id, pool).await?;
    Ok(merge_cart_lines(lines))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(ingredient_id: Uuid, name: &str, unit: &str, amount: i32) -> CartLine {
        CartLine {
            ingredient_id,
            name: String::from(name),
            measurement_unit: String::from(unit),
            amount,
        }
    }

    #[test]
    fn amounts_merge_by_ingredient_identity() {
        // Cart holds two recipes: {flour: 200} and {flour: 100, sugar: 50}.
        let lines = vec![
            line(1, "flour", "g", 200),
            line(1, "flour", "g", 100),
            line(2, "sugar", "g", 50),
        ];

        let rows = merge_cart_lines(lines);
        assert_eq!(
            rows,
            vec![
                ShoppingListRow {
                    ingredient_name: String::from("flour"),
                    measurement_unit: String::from("g"),
                    total_amount: 300,
                },
                ShoppingListRow {
                    ingredient_name: String::from("sugar"),
                    measurement_unit: String::from("g"),
                    total_amount: 50,
                },
            ]
        );
    }

    #[test]
    fn output_is_id_ordered_not_insertion_ordered() {
        let lines = vec![
            line(9, "salt", "g", 5),
            line(3, "milk", "ml", 200),
            line(9, "salt", "g", 2),
        ];

        let rows = merge_cart_lines(lines);
        assert_eq!(rows[0].ingredient_name, "milk");
        assert_eq!(rows[1].ingredient_name, "salt");
        assert_eq!(rows[1].total_amount, 7);
    }

    #[test]
    fn empty_cart_yields_empty_list() {
        assert!(merge_cart_lines(vec![]).is_empty());
    }
}
