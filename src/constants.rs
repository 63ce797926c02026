pub const RECIPE_COUNT_PER_PAGE: i64 = 10;
pub const INGREDIENT_COUNT_PER_PAGE: i64 = 100;
pub const SUBSCRIPTION_RECIPE_PREVIEW: i64 = 3;

pub const MINIMUM_AMOUNT: i32 = 1;
pub const MINIMUM_COOKING_TIME: i32 = 1;

pub const EMAIL_MAX_LENGTH: usize = 254;
pub const USERNAME_MAX_LENGTH: usize = 150;
pub const FIRST_NAME_MAX_LENGTH: usize = 150;
pub const LAST_NAME_MAX_LENGTH: usize = 150;

/* usernames that shadow routes on the consuming server */
pub const RESERVED_USERNAMES: &[&str] = &["me"];

pub const SESSION_COOKIE: &str = "session";
pub const SESSION_SECRET_ENV: &str = "SESSION_SECRET";
