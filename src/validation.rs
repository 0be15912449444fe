use std::collections::HashSet;

use crate::{
    codec::{DecodedImage, ImageInput},
    constants::{
        EMAIL_MAX_LENGTH, PASSWORD_MIN_LENGTH, RECIPE_NAME_MAX_LENGTH, USER_FIELD_MAX_LENGTH,
    },
    error::{ApiError, FieldErrors},
    schema::{Id, IngredientAmount, IngredientAmountPayload, RecipePayload, RegisterPayload},
    store::Store,
};

pub const REQUIRED: &str = "This field is required.";
pub const BLANK: &str = "This field may not be blank.";

fn too_long(max: usize) -> String {
    format!("Ensure this field has no more than {max} characters.")
}

/// How much of a recipe a write must carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// POST: every field including the image.
    Create,
    /// PUT: every field except the image, which is kept when omitted.
    Replace,
    /// PATCH: any subset.
    Patch,
}

impl WriteMode {
    fn requires(&self, field: &str) -> bool {
        match self {
            WriteMode::Create => true,
            WriteMode::Replace => field != "image",
            WriteMode::Patch => false,
        }
    }
}

/// Recipe fields that passed validation; `None` means "not supplied".
#[derive(Debug, Clone, Default)]
pub struct ValidatedRecipe {
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i32>,
    pub image: Option<DecodedImage>,
    pub tags: Option<Vec<Id>>,
    pub ingredients: Option<Vec<IngredientAmount>>,
}

fn check_text(
    errors: &mut FieldErrors,
    field: &str,
    value: Option<String>,
    max: Option<usize>,
) -> Option<String> {
    let value = value?;
    if value.trim().is_empty() {
        errors.add(field, BLANK);
        return None;
    }
    if let Some(max) = max {
        if value.chars().count() > max {
            errors.add(field, too_long(max));
            return None;
        }
    }

    Some(value)
}

fn check_cooking_time(errors: &mut FieldErrors, value: Option<i64>) -> Option<i32> {
    let value = value?;
    if value < 1 {
        errors.add("cooking_time", "Ensure this value is greater than or equal to 1.");
        return None;
    }

    match i32::try_from(value) {
        Ok(value) => Some(value),
        Err(_) => {
            errors.add(
                "cooking_time",
                format!("Ensure this value is less than or equal to {}.", i32::MAX),
            );
            None
        }
    }
}

fn check_image(errors: &mut FieldErrors, value: Option<ImageInput>) -> Option<DecodedImage> {
    match DecodedImage::decode(value?) {
        Ok(image) => Some(image),
        Err(message) => {
            errors.add("image", message);
            None
        }
    }
}

/// Shape checks on the ingredient list; existence is checked against the store.
pub fn check_ingredients(
    errors: &mut FieldErrors,
    value: Vec<IngredientAmountPayload>,
) -> Option<Vec<IngredientAmount>> {
    if value.is_empty() {
        errors.add("ingredients", "At least one ingredient is required.");
        return None;
    }

    let mut seen = HashSet::new();
    let mut parts = Vec::with_capacity(value.len());
    let mut valid = true;

    for item in value {
        if !seen.insert(item.id) {
            errors.add("ingredients", "Duplicate ingredient.");
            valid = false;
            continue;
        }

        match i32::try_from(item.amount) {
            Ok(amount) if amount >= 1 => parts.push(IngredientAmount {
                id: item.id,
                amount,
            }),
            _ => {
                errors.add("ingredients", "Ingredient amount must be greater than 0.");
                valid = false;
            }
        }
    }

    valid.then_some(parts)
}

pub fn check_tags(errors: &mut FieldErrors, value: Vec<Id>) -> Option<Vec<Id>> {
    let mut seen = HashSet::new();
    if value.iter().any(|id| !seen.insert(*id)) {
        errors.add("tags", "Duplicate tag.");
        return None;
    }

    Some(value)
}

/// Runs every recipe field check and collects all failures before returning.
pub async fn validate_recipe(
    payload: RecipePayload,
    mode: WriteMode,
    store: &dyn Store,
) -> Result<ValidatedRecipe, ApiError> {
    let mut errors = FieldErrors::new();

    let required = [
        ("name", payload.name.is_some()),
        ("text", payload.text.is_some()),
        ("cooking_time", payload.cooking_time.is_some()),
        ("image", payload.image.is_some()),
        ("tags", payload.tags.is_some()),
        ("ingredients", payload.ingredients.is_some()),
    ];
    for (field, present) in required {
        if mode.requires(field) && !present {
            errors.add(field, REQUIRED);
        }
    }

    let name = check_text(
        &mut errors,
        "name",
        payload.name,
        Some(RECIPE_NAME_MAX_LENGTH),
    );
    let text = check_text(&mut errors, "text", payload.text, None);
    let cooking_time = check_cooking_time(&mut errors, payload.cooking_time);
    let image = check_image(&mut errors, payload.image);
    let tags = payload.tags.and_then(|tags| check_tags(&mut errors, tags));
    let ingredients = payload
        .ingredients
        .and_then(|ingredients| check_ingredients(&mut errors, ingredients));

    if let Some(tags) = &tags {
        let existing = store.existing_tag_ids(tags).await?;
        for id in tags.iter().filter(|id| !existing.contains(*id)) {
            errors.add("tags", format!("Tag {id} does not exist."));
        }
    }

    if let Some(parts) = &ingredients {
        let ids: Vec<Id> = parts.iter().map(|part| part.id).collect();
        let existing = store.existing_ingredient_ids(&ids).await?;
        for id in ids.iter().filter(|id| !existing.contains(*id)) {
            errors.add("ingredients", format!("Ingredient {id} does not exist."));
        }
    }

    errors.into_result()?;

    Ok(ValidatedRecipe {
        name,
        text,
        cooking_time,
        image,
        tags,
        ingredients,
    })
}

/// Registration fields that passed validation. The password is still plain.
#[derive(Debug, Clone)]
pub struct Registration {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

pub fn is_valid_username(username: &str) -> bool {
    username
        .chars()
        .all(|c| c.is_alphanumeric() || "@.+-_".contains(c))
}

/// Messages for every password rule `password` breaks.
pub fn check_password(password: &str, username: &str, email: &str) -> Vec<String> {
    let mut messages = vec![];

    if password.chars().count() < PASSWORD_MIN_LENGTH {
        messages.push(format!(
            "This password is too short. It must contain at least {PASSWORD_MIN_LENGTH} characters."
        ));
    }
    if !password.is_empty() && password.chars().all(|c| c.is_ascii_digit()) {
        messages.push(String::from("This password is entirely numeric."));
    }
    if !username.is_empty() && password.eq_ignore_ascii_case(username) {
        messages.push(String::from("The password is too similar to the username."));
    }
    let local_part = email.split('@').next().unwrap_or_default();
    if !email.is_empty()
        && (password.eq_ignore_ascii_case(email) || password.eq_ignore_ascii_case(local_part))
    {
        messages.push(String::from("The password is too similar to the email address."));
    }

    messages
}

pub fn validate_registration(payload: RegisterPayload) -> Result<Registration, ApiError> {
    let mut errors = FieldErrors::new();

    let mut take = |field: &str, value: Option<String>, max: usize| -> String {
        match value {
            None => {
                errors.add(field, REQUIRED);
                String::new()
            }
            Some(value) => check_text(&mut errors, field, Some(value), Some(max))
                .unwrap_or_default(),
        }
    };

    let email = take("email", payload.email.map(|e| e.trim().to_string()), EMAIL_MAX_LENGTH);
    let username = take("username", payload.username, USER_FIELD_MAX_LENGTH);
    let first_name = take("first_name", payload.first_name, USER_FIELD_MAX_LENGTH);
    let last_name = take("last_name", payload.last_name, USER_FIELD_MAX_LENGTH);

    if !email.is_empty() && !is_valid_email(&email) {
        errors.add("email", "Enter a valid email address.");
    }
    if !username.is_empty() && !is_valid_username(&username) {
        errors.add(
            "username",
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        );
    }

    let password = match payload.password {
        None => {
            errors.add("password", REQUIRED);
            String::new()
        }
        Some(password) if password.is_empty() => {
            errors.add("password", BLANK);
            String::new()
        }
        Some(password) => {
            for message in check_password(&password, &username, &email) {
                errors.add("password", message);
            }
            password
        }
    };

    errors.into_result()?;

    Ok(Registration {
        email,
        username,
        first_name,
        last_name,
        password,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::schema::NewIngredient;
    use crate::store::IngredientStore;

    const PIXEL_PNG: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

    fn payload() -> RecipePayload {
        RecipePayload {
            name: Some(String::from("Soup")),
            text: Some(String::from("Boil.")),
            cooking_time: Some(10),
            image: Some(ImageInput::Encoded(format!("data:image/png;base64,{PIXEL_PNG}"))),
            tags: Some(vec![]),
            ingredients: Some(vec![IngredientAmountPayload { id: 1, amount: 2 }]),
        }
    }

    async fn store_with_ingredient() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .insert_ingredient(NewIngredient {
                name: String::from("salt"),
                measurement_unit: String::from("g"),
                amount: 1,
            })
            .await
            .unwrap();
        store
    }

    fn field_errors(result: Result<ValidatedRecipe, ApiError>) -> FieldErrors {
        match result {
            Err(ApiError::Validation(errors)) => errors,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn valid_recipe_passes() {
        let store = store_with_ingredient().await;
        let recipe = validate_recipe(payload(), WriteMode::Create, &store)
            .await
            .unwrap();

        assert_eq!(recipe.cooking_time, Some(10));
        assert_eq!(recipe.image.map(|i| i.extension), Some("png"));
    }

    #[tokio::test]
    async fn zero_cooking_time_and_empty_ingredients_fail() {
        let store = store_with_ingredient().await;
        let mut bad = payload();
        bad.cooking_time = Some(0);
        bad.ingredients = Some(vec![]);

        let errors = field_errors(validate_recipe(bad, WriteMode::Create, &store).await);
        assert!(errors.contains("cooking_time"));
        assert_eq!(
            errors.get("ingredients"),
            Some(&[String::from("At least one ingredient is required.")][..])
        );
    }

    #[tokio::test]
    async fn duplicate_and_unknown_ingredients_fail() {
        let store = store_with_ingredient().await;

        let mut duplicated = payload();
        duplicated.ingredients = Some(vec![
            IngredientAmountPayload { id: 1, amount: 2 },
            IngredientAmountPayload { id: 1, amount: 3 },
        ]);
        let errors = field_errors(validate_recipe(duplicated, WriteMode::Create, &store).await);
        assert_eq!(
            errors.get("ingredients"),
            Some(&[String::from("Duplicate ingredient.")][..])
        );

        let mut unknown = payload();
        unknown.ingredients = Some(vec![IngredientAmountPayload { id: 42, amount: 1 }]);
        let errors = field_errors(validate_recipe(unknown, WriteMode::Create, &store).await);
        assert_eq!(
            errors.get("ingredients"),
            Some(&[String::from("Ingredient 42 does not exist.")][..])
        );
    }

    #[tokio::test]
    async fn create_requires_every_field_but_patch_does_not() {
        let store = store_with_ingredient().await;

        let errors = field_errors(
            validate_recipe(RecipePayload::default(), WriteMode::Create, &store).await,
        );
        for field in ["name", "text", "cooking_time", "image", "tags", "ingredients"] {
            assert!(errors.contains(field), "{field} should be required");
        }

        let errors = field_errors(
            validate_recipe(RecipePayload::default(), WriteMode::Replace, &store).await,
        );
        assert!(!errors.contains("image"));

        let patch = validate_recipe(RecipePayload::default(), WriteMode::Patch, &store)
            .await
            .unwrap();
        assert!(patch.name.is_none());
    }

    #[tokio::test]
    async fn malformed_image_is_an_image_error() {
        let store = store_with_ingredient().await;
        let mut bad = payload();
        bad.image = Some(ImageInput::Encoded(String::from("data:image/png;base64,@@@")));

        let errors = field_errors(validate_recipe(bad, WriteMode::Create, &store).await);
        assert_eq!(errors.get("image"), Some(&[String::from("Upload a valid image.")][..]));
    }

    #[test]
    fn password_policy() {
        assert!(check_password("Sup3r-secret", "cook", "cook@example.com").is_empty());
        assert_eq!(check_password("12345678", "cook", "cook@example.com").len(), 1);
        assert_eq!(check_password("short", "cook", "cook@example.com").len(), 1);
        assert!(!check_password("Cookbook1", "cookbook1", "x@example.com").is_empty());
        assert!(!check_password("chef@mail.com", "cook", "chef@mail.com").is_empty());
    }

    #[test]
    fn registration_collects_field_errors() {
        let result = validate_registration(RegisterPayload {
            email: Some(String::from("not-an-email")),
            username: Some(String::from("bad name!")),
            first_name: None,
            last_name: Some(String::from("Cook")),
            password: Some(String::from("123")),
        });

        match result {
            Err(ApiError::Validation(errors)) => {
                for field in ["email", "username", "first_name", "password"] {
                    assert!(errors.contains(field), "{field} should fail");
                }
                assert!(!errors.contains("last_name"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn email_and_username_rules() {
        assert!(is_valid_email("cook@example.com"));
        assert!(!is_valid_email("cook@example"));
        assert!(!is_valid_email("@example.com"));
        assert!(is_valid_username("cook.book+1@home_-"));
        assert!(!is_valid_username("cook book"));
    }
}
