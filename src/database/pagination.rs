use serde::{Deserialize, Serialize};

use crate::{constants::MAX_PAGE_SIZE, error::ApiError, form::Form};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl PageRequest {
    pub fn new(page: i64, limit: i64) -> Self {
        Self { page, limit }
    }

    /// Reads `page` and `limit`. A bad `page` is an error, a bad `limit`
    /// falls back to the default size. Pages whose offset does not fit in
    /// an `i64` are invalid.
    pub fn from_form(form: &Form, default_limit: i64) -> Result<Self, ApiError> {
        let page = match form.get_number::<i64>("page") {
            None => 1,
            Some(Ok(page)) if page >= 1 => page,
            Some(_) => return Err(ApiError::InvalidPage),
        };

        let limit = match form.get_number::<i64>("limit") {
            Some(Ok(limit)) if limit >= 1 => limit.min(MAX_PAGE_SIZE),
            _ => default_limit,
        };

        if (page - 1).checked_mul(limit).is_none() {
            return Err(ApiError::InvalidPage);
        }

        Ok(Self { page, limit })
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.limit
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct PageContext<T> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> PageContext<T> {
    pub fn from_rows(
        rows: Vec<T>,
        total_rows: i64,
        request: PageRequest,
        path: &str,
        form: &Form,
    ) -> Result<Self, ApiError> {
        if rows.is_empty() && request.page > 1 {
            return Err(ApiError::InvalidPage);
        }

        let link = |page: i64| {
            let value = if page == 1 { None } else { Some(page.to_string()) };
            let query = form.with_value("page", value);
            if query.is_empty() {
                path.to_string()
            } else {
                format!("{path}?{query}")
            }
        };

        let seen = request.page.checked_mul(request.limit);
        let next = if seen.map_or(false, |seen| seen < total_rows) {
            Some(link(request.page + 1))
        } else {
            None
        };
        let previous = if request.page > 1 {
            Some(link(request.page - 1))
        } else {
            None
        };

        Ok(Self {
            count: total_rows,
            next,
            previous,
            results: rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_caps_limit() {
        let form = Form::from_query("limit=1000").unwrap();
        let request = PageRequest::from_form(&form, 6).unwrap();
        assert_eq!(request, PageRequest::new(1, MAX_PAGE_SIZE));

        let form = Form::from_query("limit=abc&page=3").unwrap();
        let request = PageRequest::from_form(&form, 6).unwrap();
        assert_eq!(request, PageRequest::new(3, 6));
        assert_eq!(request.offset(), 12);
    }

    #[test]
    fn rejects_bad_page() {
        let form = Form::from_query("page=0").unwrap();
        assert!(matches!(
            PageRequest::from_form(&form, 6),
            Err(ApiError::InvalidPage)
        ));
    }

    #[test]
    fn rejects_pages_past_the_offset_range() {
        let form = Form::from_query("page=9223372036854775807&limit=100").unwrap();
        assert!(matches!(
            PageRequest::from_form(&form, 6),
            Err(ApiError::InvalidPage)
        ));

        let form = Form::from_query("page=9223372036854775807&limit=1").unwrap();
        let request = PageRequest::from_form(&form, 6).unwrap();
        assert_eq!(request.offset(), i64::MAX - 1);
        let page = PageContext::from_rows(vec![1], 3, PageRequest::new(i64::MAX / 2 + 1, 2), "/", &form)
            .unwrap();
        assert!(page.next.is_none());
    }

    #[test]
    fn links_keep_other_parameters() {
        let form = Form::from_query("page=2&limit=2&author=1").unwrap();
        let request = PageRequest::from_form(&form, 6).unwrap();
        let page =
            PageContext::from_rows(vec![3, 4], 5, request, "/api/recipes/", &form).unwrap();

        assert_eq!(page.count, 5);
        assert_eq!(
            page.next.as_deref(),
            Some("/api/recipes/?limit=2&author=1&page=3")
        );
        assert_eq!(page.previous.as_deref(), Some("/api/recipes/?limit=2&author=1"));
    }

    #[test]
    fn empty_page_past_the_end_is_invalid() {
        let form = Form::from_query("page=4").unwrap();
        let request = PageRequest::from_form(&form, 6).unwrap();
        let page = PageContext::<i32>::from_rows(vec![], 3, request, "/api/users/", &form);
        assert!(matches!(page, Err(ApiError::InvalidPage)));
    }

    #[test]
    fn single_page_has_no_links() {
        let form = Form::default();
        let page = PageContext::from_rows(vec![1], 1, PageRequest::new(1, 6), "/api/users/", &form)
            .unwrap();
        assert!(page.next.is_none());
        assert!(page.previous.is_none());
    }
}
