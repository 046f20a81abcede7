//! Request-shape validation that runs before any upstream call.
//!
//! Every caller-supplied id list, page size, and concurrency limit passes
//! through [`RateLimitGuard`] first, so an oversized or malformed request
//! is rejected cheaply instead of burning API quota.

use adscope_core::EngineSettings;

use crate::error::ValidationError;

const MAX_CUSTOMER_ID_DIGITS: usize = 20;

/// Hard caps applied to every request the engine issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitGuard {
    pub max_ids_per_request: usize,
    pub max_page_size: u32,
    pub max_concurrency: usize,
}

impl Default for RateLimitGuard {
    fn default() -> Self {
        Self::from(&EngineSettings::default())
    }
}

impl From<&EngineSettings> for RateLimitGuard {
    fn from(settings: &EngineSettings) -> Self {
        Self {
            max_ids_per_request: settings.max_ids_per_request,
            max_page_size: settings.max_page_size,
            max_concurrency: settings.max_concurrency,
        }
    }
}

impl RateLimitGuard {
    /// Normalizes a customer id (`"123-456-7890"` → `"1234567890"`).
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::CustomerId`] unless the id is 1–20 digits
    /// after removing dashes and surrounding whitespace.
    pub fn validate_customer_id(&self, customer_id: &str) -> Result<String, ValidationError> {
        let digits: String = customer_id.trim().chars().filter(|c| *c != '-').collect();
        if digits.is_empty()
            || digits.len() > MAX_CUSTOMER_ID_DIGITS
            || !digits.chars().all(|c| c.is_ascii_digit())
        {
            return Err(ValidationError::CustomerId(customer_id.to_owned()));
        }
        Ok(digits)
    }

    /// Checks a caller-supplied id list.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::EmptyIdList`] if the list is empty.
    /// - [`ValidationError::TooManyIds`] if the list exceeds `max_ids_per_request`.
    /// - [`ValidationError::EmptyId`] / [`ValidationError::MalformedId`] for
    ///   blank or non-numeric entries.
    pub fn validate_ids(&self, field: &str, ids: &[String]) -> Result<(), ValidationError> {
        if ids.is_empty() {
            return Err(ValidationError::EmptyIdList {
                field: field.to_owned(),
            });
        }
        if ids.len() > self.max_ids_per_request {
            return Err(ValidationError::TooManyIds {
                field: field.to_owned(),
                len: ids.len(),
                max: self.max_ids_per_request,
            });
        }
        for id in ids {
            if id.trim().is_empty() {
                return Err(ValidationError::EmptyId {
                    field: field.to_owned(),
                });
            }
            if !id.chars().all(|c| c.is_ascii_digit()) {
                return Err(ValidationError::MalformedId {
                    field: field.to_owned(),
                    id: id.clone(),
                });
            }
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`ValidationError::PageSize`] unless `1 <= page_size <= max_page_size`.
    pub fn validate_page_size(&self, page_size: u32) -> Result<(), ValidationError> {
        if page_size == 0 || page_size > self.max_page_size {
            return Err(ValidationError::PageSize {
                page_size,
                max: self.max_page_size,
            });
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`ValidationError::Concurrency`] unless `1 <= limit <= max_concurrency`.
    pub fn validate_concurrency(&self, limit: usize) -> Result<(), ValidationError> {
        if limit == 0 || limit > self.max_concurrency {
            return Err(ValidationError::Concurrency {
                limit,
                max: self.max_concurrency,
            });
        }
        Ok(())
    }

    /// Splits an engine-derived id list into request-sized batches.
    #[must_use]
    pub fn chunk_ids<'a>(&self, ids: &'a [String]) -> Vec<&'a [String]> {
        ids.chunks(self.max_ids_per_request.max(1)).collect()
    }
}
