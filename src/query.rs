//! Request parameter resolution for the Query Service.
//!
//! Raw query strings are turned into a [`ProductQuery`] (filter, sort and
//! page window). Numeric parameters go through [`ParamPolicy::clamp_or_default`]:
//! the lenient policy falls back to defaults on bad input, the strict policy
//! reports a [`ParamError`] instead.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ApiConfig;
use crate::models::Product;

/// How malformed numeric parameters are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamPolicy {
    /// Fall back to the default (or clamp) on invalid input.
    #[default]
    Lenient,
    /// Reject invalid input with a client error.
    Strict,
}

/// What to do with a parsed value below 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BelowMinimum {
    Clamp,
    UseDefault,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamError {
    #[error("{name} must be an integer, got '{value}'")]
    NotAnInteger { name: &'static str, value: String },
    #[error("{name} must be >= 1, got {value}")]
    OutOfRange { name: &'static str, value: i64 },
    #[error("{name} is too large, got {value}")]
    TooLarge { name: &'static str, value: i64 },
}

impl ParamPolicy {
    pub fn clamp_or_default(
        self,
        name: &'static str,
        raw: Option<&str>,
        default: i64,
        below_minimum: BelowMinimum,
    ) -> Result<i64, ParamError> {
        let raw = match raw.map(str::trim) {
            Some(r) if !r.is_empty() => r,
            _ => return Ok(default),
        };

        let value = match raw.parse::<i64>() {
            Ok(v) => v,
            Err(_) => {
                return match self {
                    ParamPolicy::Lenient => Ok(default),
                    ParamPolicy::Strict => Err(ParamError::NotAnInteger {
                        name,
                        value: raw.to_string(),
                    }),
                }
            }
        };

        if value >= 1 {
            return Ok(value);
        }

        match (self, below_minimum) {
            (ParamPolicy::Strict, _) => Err(ParamError::OutOfRange { name, value }),
            (ParamPolicy::Lenient, BelowMinimum::Clamp) => Ok(1),
            (ParamPolicy::Lenient, BelowMinimum::UseDefault) => Ok(default),
        }
    }
}

/// Result ordering for product listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Ascending by name.
    #[default]
    Name,
    /// Descending by creation time.
    Newest,
}

impl SortOrder {
    pub fn from_param(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") | Some("name") | Some("nom") => SortOrder::Name,
            Some(_) => SortOrder::Newest,
        }
    }
}

/// Conjunctive product filter. `None` fields do not narrow the result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    /// Substring matched against name, brand or category.
    pub q: Option<String>,
    /// Uppercased grade letter.
    pub nutriscore: Option<String>,
    pub brand: Option<String>,
    pub category: Option<String>,
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

impl ProductFilter {
    pub fn matches(&self, product: &Product) -> bool {
        let categories = product.category_string();

        if let Some(q) = &self.q {
            if !(contains_ci(&product.name, q)
                || contains_ci(&product.brand, q)
                || contains_ci(&categories, q))
            {
                return false;
            }
        }
        if let Some(grade) = &self.nutriscore {
            match product.nutriscore {
                Some(g) if g.as_str() == grade => {}
                _ => return false,
            }
        }
        if let Some(brand) = &self.brand {
            if !contains_ci(&product.brand, brand) {
                return false;
            }
        }
        if let Some(category) = &self.category {
            if !contains_ci(&categories, category) {
                return false;
            }
        }
        true
    }
}

/// A resolved list request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductQuery {
    pub filter: ProductFilter,
    pub sort: SortOrder,
    pub page: i64,
    pub limit: i64,
}

impl ProductQuery {
    /// Rows to skip before this page. Saturates, so a page far past the end
    /// is simply empty.
    pub fn skip(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

/// Raw query parameters of `GET /api/products`.
///
/// Also used by the client to build requests, hence `Serialize`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nutri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
}

fn non_empty(raw: &Option<String>) -> Option<String> {
    raw.as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

impl ListParams {
    pub fn resolve(&self, api: &ApiConfig) -> Result<ProductQuery, ParamError> {
        let policy = api.param_policy;
        let page = policy.clamp_or_default("page", self.page.as_deref(), 1, BelowMinimum::Clamp)?;
        let limit = policy.clamp_or_default(
            "limit",
            self.limit.as_deref(),
            api.default_limit,
            BelowMinimum::Clamp,
        )?;

        if policy == ParamPolicy::Strict && (page - 1).checked_mul(limit).is_none() {
            return Err(ParamError::TooLarge { name: "page", value: page });
        }

        Ok(ProductQuery {
            filter: ProductFilter {
                q: non_empty(&self.q),
                nutriscore: non_empty(&self.nutri).map(|g| g.to_uppercase()),
                brand: non_empty(&self.brand),
                category: non_empty(&self.category),
            },
            sort: SortOrder::from_param(self.sort.as_deref()),
            page,
            limit,
        })
    }
}

/// Raw query parameters of `GET /api/stats/categories`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TopParams {
    pub top: Option<String>,
}

impl TopParams {
    pub fn resolve(&self, api: &ApiConfig) -> Result<i64, ParamError> {
        api.param_policy.clamp_or_default(
            "top",
            self.top.as_deref(),
            api.default_top,
            BelowMinimum::UseDefault,
        )
    }
}
