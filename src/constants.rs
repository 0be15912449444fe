pub const DEFAULT_PAGE_SIZE: i64 = 6;
pub const MAX_PAGE_SIZE: i64 = 100;
pub const DEFAULT_RECIPES_LIMIT: i64 = 5;

pub const RECIPE_NAME_MAX_LENGTH: usize = 200;
pub const USER_FIELD_MAX_LENGTH: usize = 150;
pub const EMAIL_MAX_LENGTH: usize = 254;
pub const PASSWORD_MIN_LENGTH: usize = 8;

pub const RECIPE_IMAGE_DIR: &str = "recipes/images";
pub const MAX_UPLOAD_SIZE: u64 = 10 * 1024 * 1024;

pub const SHOPPING_LIST_FILENAME: &str = "shopping_list.txt";

pub const TRUTHY_VALUES: &[&str] = &["1", "true", "True"];
