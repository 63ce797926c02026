use std::{collections::HashMap, str::FromStr};

use serde_json::Value;

use super::error::{Error, TypeError};

pub type FormData = HashMap<String, Value>;

/// Loosely-typed request payload as the consuming server hands it over.
pub struct Form {
    inner: HashMap<String, Value>,
}

impl Form {
    pub fn from_data(data: FormData) -> Self {
        Self { inner: data }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    pub fn get_value<T>(&self, key: &str) -> Result<T, Error>
    where
        T: TryFrom<Value>,
    {
        match self.inner.get(key) {
            Some(value) => value
                .to_owned()
                .try_into()
                .map_err(|_e| TypeError::new("Invalid type conversion").into()),
            None => Err(TypeError::new("Invalid key").into()),
        }
    }

    pub fn get_number<T>(&self, key: &str) -> Result<T, Error>
    where
        T: FromStr,
    {
        match self.inner.get(key) {
            Some(value) => match value.as_str() {
                Some(v) => v
                    .to_owned()
                    .parse()
                    .map_err(|_e| TypeError::new("Invalid type conversion").into()),
                None => Err(TypeError::new("Failed to parse value as str").into()),
            },
            None => Err(TypeError::new("Invalid key").into()),
        }
    }

    /// Integer access accepting both JSON numbers and numeric strings.
    pub fn get_int(&self, key: &str) -> Result<i64, Error> {
        match self.inner.get(key) {
            Some(Value::Number(n)) => n
                .as_i64()
                .ok_or_else(|| TypeError::new("Invalid integer").into()),
            Some(Value::String(s)) => s
                .parse()
                .map_err(|_e| TypeError::new("Invalid integer").into()),
            Some(_) => Err(TypeError::new("Invalid integer").into()),
            None => Err(TypeError::new("Invalid key").into()),
        }
    }

    pub fn get_str(&self, key: &str) -> Result<String, TypeError> {
        match self.inner.get(key) {
            Some(value) => match value.as_str() {
                Some(v) => Ok(v.to_string()),
                None => Err(TypeError::new("Invalid key")),
            },
            None => Err(TypeError::new("Invalid key")),
        }
    }

    pub fn get_opt_str(&self, key: &str) -> Option<String> {
        self.inner
            .get(key)
            .and_then(|value| value.as_str())
            .map(|v| v.to_string())
    }

    /// Typed access to an array of objects, e.g. ingredient specs.
    pub fn get_list<T>(&self, key: &str) -> Result<Vec<T>, Error>
    where
        T: TryFrom<Value, Error = TypeError>,
    {
        match self.inner.get(key) {
            Some(Value::Array(values)) => values
                .iter()
                .map(|value| T::try_from(value.to_owned()).map_err(|e| e.into()))
                .collect(),
            Some(_) => Err(TypeError::new("Expected a list").into()),
            None => Err(TypeError::new("Invalid key").into()),
        }
    }

    /// Typed access to an array of integer ids.
    pub fn get_id_list(&self, key: &str) -> Result<Vec<i32>, Error> {
        match self.inner.get(key) {
            Some(Value::Array(values)) => values
                .iter()
                .map(|value| {
                    value
                        .as_i64()
                        .map(|id| id as i32)
                        .ok_or_else(|| TypeError::new("Invalid id").into())
                })
                .collect(),
            Some(_) => Err(TypeError::new("Expected a list").into()),
            None => Err(TypeError::new("Invalid key").into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::IngredientSpec;
    use serde_json::json;

    fn form(value: Value) -> Form {
        let data: FormData = serde_json::from_value(value).unwrap();
        Form::from_data(data)
    }

    #[test]
    fn int_access_accepts_numbers_and_numeric_strings() {
        let form = form(json!({"a": 5, "b": "7", "c": "x"}));
        assert_eq!(form.get_int("a").unwrap(), 5);
        assert_eq!(form.get_int("b").unwrap(), 7);
        assert!(form.get_int("c").is_err());
        assert!(form.get_int("missing").is_err());
    }

    #[test]
    fn list_access_parses_ingredient_specs() {
        let form = form(json!({
            "ingredients": [{"id": 1, "amount": 200}, {"id": 2, "amount": 50}],
            "tags": [3, 4]
        }));

        let specs: Vec<IngredientSpec> = form.get_list("ingredients").unwrap();
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0], IngredientSpec { id: 1, amount: 200 });
        assert_eq!(form.get_id_list("tags").unwrap(), vec![3, 4]);
    }

    #[test]
    fn malformed_lists_are_rejected() {
        let form = form(json!({"tags": "3,4", "ingredients": [{"id": 1}]}));
        assert!(form.get_id_list("tags").is_err());
        assert!(form.get_list::<IngredientSpec>("ingredients").is_err());
    }
}
