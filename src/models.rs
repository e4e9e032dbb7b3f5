//! Core data models: products, nutrition grades and tag lists.
//!
//! Category and label lists are stored as ordered tag sequences. On the
//! wire they stay single `", "`-joined strings (`categorie`, `labels`) so
//! existing clients keep working; [`category_list`] and [`tag_list`]
//! handle the conversion.
//!
//! Categories split on `", "` only and keep every token, so the category
//! tally counts exactly what the stored string holds. Labels are looser:
//! `,` or `|`, trimmed and de-duplicated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Separator used when a tag list is rendered as a single string.
pub const TAG_JOIN: &str = ", ";

/// Nutri-Score grade, `A` (best) through `E` (worst).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    E,
}

impl Grade {
    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::E => "E",
        }
    }

    /// Lenient parse used at ingestion: trims, ignores case, and maps
    /// empty or unrecognized input to `None`.
    pub fn parse_lenient(raw: &str) -> Option<Grade> {
        raw.trim().parse().ok()
    }
}

impl FromStr for Grade {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "A" => Ok(Grade::A),
            "B" => Ok(Grade::B),
            "C" => Ok(Grade::C),
            "D" => Ok(Grade::D),
            "E" => Ok(Grade::E),
            other => Err(format!("invalid nutrition grade: '{}'", other)),
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which tag list a tag row belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    Category,
    Label,
}

impl TagKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TagKind::Category => "category",
            TagKind::Label => "label",
        }
    }
}

/// Split a delimited tag string into an ordered, de-duplicated list.
///
/// Accepts both `,` and `|` as separators; surrounding whitespace is
/// trimmed and empty tokens are dropped.
pub fn split_tags(raw: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for token in raw.split([',', '|']) {
        let token = token.trim();
        if token.is_empty() || tags.iter().any(|t| t == token) {
            continue;
        }
        tags.push(token.to_string());
    }
    tags
}

/// Split a `categorie` string on `", "`, keeping tokens verbatim.
///
/// Only empty or blank tokens are dropped; repeated tokens are kept.
pub fn split_categories(raw: &str) -> Vec<String> {
    raw.trim()
        .split(TAG_JOIN)
        .filter(|token| !token.trim().is_empty())
        .map(str::to_string)
        .collect()
}

pub fn join_tags(tags: &[String]) -> String {
    tags.join(TAG_JOIN)
}

/// Serde adapter mapping a `Vec<String>` tag list to its joined string form.
pub mod tag_list {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(tags: &[String], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::join_tags(tags))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        Ok(raw.as_deref().map(super::split_tags).unwrap_or_default())
    }
}

/// Serde adapter for the `categorie` list, split with [`split_categories`].
pub mod category_list {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(tags: &[String], serializer: S) -> Result<S::Ok, S::Error> {
        super::tag_list::serialize(tags, serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        Ok(raw.as_deref().map(super::split_categories).unwrap_or_default())
    }
}

/// A product as served by the Query Service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub barcode: String,
    #[serde(rename = "nom")]
    pub name: String,
    #[serde(rename = "marque")]
    pub brand: String,
    #[serde(rename = "categorie", with = "category_list")]
    pub categories: Vec<String>,
    pub nutriscore: Option<Grade>,
    #[serde(with = "tag_list")]
    pub labels: Vec<String>,
    pub source_url: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn category_string(&self) -> String {
        join_tags(&self.categories)
    }
}

/// A cleaned product ready to be written to the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub barcode: String,
    pub name: String,
    pub brand: String,
    pub categories: Vec<String>,
    pub nutriscore: Option<Grade>,
    pub labels: Vec<String>,
    pub source_url: String,
}

impl NewProduct {
    /// Materialize the stored form with store-maintained timestamps.
    pub fn into_product(self, created_at: DateTime<Utc>, updated_at: DateTime<Utc>) -> Product {
        Product {
            barcode: self.barcode,
            name: self.name,
            brand: self.brand,
            categories: self.categories,
            nutriscore: self.nutriscore,
            labels: self.labels,
            source_url: self.source_url,
            created_at,
            updated_at,
        }
    }
}

/// Raw product record as found in an import file.
///
/// Every field is optional and tolerant of `null`; barcodes may be given
/// as JSON numbers.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductRecord {
    #[serde(default, deserialize_with = "string_or_number")]
    pub barcode: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub nom: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub marque: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub categorie: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub nutriscore: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub labels: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub source_url: String,
}

impl ProductRecord {
    /// Clean the record into a [`NewProduct`].
    ///
    /// Returns `None` when the barcode is missing, since it is the lookup key.
    pub fn clean(self) -> Option<NewProduct> {
        let barcode = self.barcode.trim().to_string();
        if barcode.is_empty() {
            return None;
        }

        Some(NewProduct {
            barcode,
            name: self.nom.trim().to_string(),
            brand: self.marque.trim().to_string(),
            categories: split_categories(&self.categorie),
            nutriscore: Grade::parse_lenient(&self.nutriscore),
            labels: split_tags(&self.labels),
            source_url: self.source_url.trim().to_string(),
        })
    }
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    })
}
