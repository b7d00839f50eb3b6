use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaginationError {
    #[error("page '{0}' must be greater than 0")]
    InvalidPage(u64),
    #[error("size '{0}' must be greater than 0")]
    InvalidSize(u64),
    #[error("invalid number '{0}' in pagination")]
    InvalidNumber(String),
}

/// One-based page number and page size, written `$page:2$size:50`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    page: u64,
    size: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: Self::DEFAULT_PAGE,
            size: Self::DEFAULT_SIZE,
        }
    }
}

impl Pagination {
    pub const DEFAULT_PAGE: u64 = 1;
    pub const DEFAULT_SIZE: u64 = 20;
    pub const QUERY_PARAM: &'static str = "pagination";

    pub fn new(page: u64, size: u64) -> Result<Self, PaginationError> {
        if page == 0 {
            return Err(PaginationError::InvalidPage(page));
        }
        if size == 0 {
            return Err(PaginationError::InvalidSize(size));
        }
        Ok(Self { page, size })
    }

    /// Reads every `$page:N` and `$size:N` in `input`; anything else is ignored.
    /// Missing keys keep their defaults and the last occurrence wins.
    pub fn parse(input: &str) -> Result<Self, PaginationError> {
        let mut page = Self::DEFAULT_PAGE;
        let mut size = Self::DEFAULT_SIZE;

        for (key, target) in [("$page:", &mut page), ("$size:", &mut size)] {
            let mut rest = input;
            while let Some(at) = rest.find(key) {
                rest = &rest[at + key.len()..];
                let end = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
                if end == 0 {
                    continue;
                }
                *target = rest[..end]
                    .parse()
                    .map_err(|_| PaginationError::InvalidNumber(rest[..end].to_string()))?;
            }
        }

        Self::new(page, size)
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn start_index(&self) -> u64 {
        (self.page - 1) * self.size
    }

    pub fn offset(&self) -> u64 {
        self.start_index()
    }

    pub fn end_index(&self) -> u64 {
        self.start_index() + self.size
    }

    pub fn as_string(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Pagination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "$page:{}$size:{}", self.page, self.size)
    }
}
