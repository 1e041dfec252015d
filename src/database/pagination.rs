use serde::{Deserialize, Serialize};

use crate::{config::Config, error::Error};

/// `?page=&limit=` query parameters.
#[derive(Deserialize, Debug, Default, Clone, Copy)]
pub struct PageParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: i64,
    pub limit: i64,
}

impl PageParams {
    pub fn window(&self, config: &Config) -> Result<PageWindow, Error> {
        let page = self.page.unwrap_or(1);
        if page < 1 {
            return Err(Error::validation("Page number must be at least 1"));
        }

        let limit = self.limit.unwrap_or(config.page_size);
        if limit < 1 || limit > config.max_page_size {
            return Err(Error::validation(format!(
                "Limit must be between 1 and {}",
                config.max_page_size
            )));
        }

        if page.checked_mul(limit).is_none() {
            return Err(Error::validation("Page number is out of range"));
        }

        Ok(PageWindow { page, limit })
    }
}

impl PageWindow {
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct Page<T> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    /// Builds a page from the rows of one window; `total_rows` is the size of the
    /// whole result set. An empty page past the first one is an error.
    pub fn from_rows(
        results: Vec<T>,
        total_rows: i64,
        window: PageWindow,
        path: &str,
    ) -> Result<Self, Error> {
        if results.is_empty() && window.page > 1 {
            return Err(Error::not_found("Invalid page."));
        }

        let link = |page: i64| format!("{path}?page={page}&limit={}", window.limit);

        let next = if window.page.saturating_mul(window.limit) < total_rows {
            Some(link(window.page + 1))
        } else {
            None
        };
        let previous = if window.page > 1 {
            Some(link(window.page - 1))
        } else {
            None
        };

        Ok(Self {
            count: total_rows,
            next,
            previous,
            results,
        })
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            count: self.count,
            next: self.next,
            previous: self.previous,
            results: self.results.into_iter().map(f).collect(),
        }
    }
}
