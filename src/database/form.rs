use std::str::FromStr;

use crate::{constants::TRUTHY_VALUES, error::ApiError};

pub type FormData = Vec<(String, String)>;

/// Decoded query string. Keeps every pair so repeated keys such as
/// `tags=a&tags=b` survive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Form {
    inner: FormData,
}

impl Form {
    pub fn from_data(data: FormData) -> Self {
        Self { inner: data }
    }

    pub fn from_query(raw: &str) -> Result<Self, ApiError> {
        let data: FormData = serde_urlencoded::from_str(raw)
            .map_err(|_| ApiError::validation("query", "Malformed query string."))?;

        Ok(Self::from_data(data))
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.inner
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn get_all(&self, key: &str) -> Vec<String> {
        self.inner
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.to_owned())
            .collect()
    }

    /// `None` when the key is absent, `Some(Err(()))` when it does not parse.
    pub fn get_number<T>(&self, key: &str) -> Option<Result<T, ()>>
    where
        T: FromStr,
    {
        self.get_str(key)
            .map(|value| value.trim().parse::<T>().map_err(|_| ()))
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.get_str(key)
            .map(|value| TRUTHY_VALUES.contains(&value))
            .unwrap_or(false)
    }

    /// Re-encodes the form with `key` replaced by `value` (or dropped for `None`).
    pub fn with_value(&self, key: &str, value: Option<String>) -> String {
        let mut data: FormData = self
            .inner
            .iter()
            .filter(|(k, _)| k != key)
            .cloned()
            .collect();

        if let Some(value) = value {
            data.push((key.to_string(), value));
        }

        serde_urlencoded::to_string(&data).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_repeated_keys() {
        let form = Form::from_query("tags=breakfast&tags=lunch&author=3").unwrap();
        assert_eq!(form.get_all("tags"), vec!["breakfast", "lunch"]);
        assert_eq!(form.get_number::<i32>("author"), Some(Ok(3)));
    }

    #[test]
    fn parses_booleans_leniently() {
        let form = Form::from_query("is_favorited=1&is_in_shopping_cart=0").unwrap();
        assert!(form.get_bool("is_favorited"));
        assert!(!form.get_bool("is_in_shopping_cart"));
        assert!(!form.get_bool("missing"));
    }

    #[test]
    fn replaces_single_key() {
        let form = Form::from_query("limit=2&page=1&tags=a").unwrap();
        assert_eq!(form.with_value("page", Some(String::from("2"))), "limit=2&tags=a&page=2");
        assert_eq!(form.with_value("page", None), "limit=2&tags=a");
    }

    #[test]
    fn invalid_numbers_are_reported() {
        let form = Form::from_query("author=abc").unwrap();
        assert_eq!(form.get_number::<i32>("author"), Some(Err(())));
    }
}
