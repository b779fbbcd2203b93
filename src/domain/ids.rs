//! Domain identifier types with validation
//!
//! Newtype wrappers for the identifiers that flow through the pipeline. Each
//! type validates its format on construction, so a value that exists is a
//! value that is well formed.

use serde::{Deserialize, Serialize};
use std::borrow::{Borrow, Cow};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Language tag newtype wrapper
///
/// Holds a normalized (lowercase) language code such as `en`, `es` or `pt-br`.
/// Implements `Borrow<str>` so maps keyed by `Language` can be indexed with
/// plain string slices.
///
/// # Examples
///
/// ```
/// use pii_process::domain::ids::Language;
///
/// let lang = Language::new("EN").unwrap();
/// assert_eq!(lang.as_str(), "en");
/// assert!(Language::new("").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Language(String);

impl Language {
    /// Creates a new Language from a string
    ///
    /// # Returns
    ///
    /// Returns `Err` if the tag is empty or holds characters other than ASCII
    /// letters, digits, `-` and `_`
    pub fn new(lang: impl Into<String>) -> Result<Self, String> {
        let lang = lang.into().trim().to_ascii_lowercase();
        if lang.is_empty() {
            return Err("Language tag cannot be empty".to_string());
        }
        if !lang
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(format!("Invalid language tag '{lang}'"));
        }
        Ok(Self(lang))
    }

    /// Returns the language tag as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Base language without region, e.g. `pt` for `pt-br`
    pub fn base(&self) -> &str {
        self.0.split(['-', '_']).next().unwrap_or(&self.0)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Language {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Language> for String {
    fn from(lang: Language) -> Self {
        lang.0
    }
}

impl AsRef<str> for Language {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Language {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Chunk identifier newtype wrapper
///
/// Fresh identifiers are random UUIDs; identifiers loaded from a document are
/// kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChunkId(String);

impl ChunkId {
    /// Generates a fresh unique chunk identifier
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Creates a ChunkId from an existing identifier
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err("Chunk ID cannot be empty".to_string());
        }
        Ok(Self(id))
    }

    /// Returns the chunk ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Detection task identifier newtype wrapper
///
/// Task ids are lowercase snake-case names such as `email_address`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaskId(String);

impl TaskId {
    /// Creates a new TaskId from a string
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into().trim().to_string();
        if id.is_empty() {
            return Err("Task ID cannot be empty".to_string());
        }
        if !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
        {
            return Err(format!("Invalid task ID '{id}'"));
        }
        Ok(Self(id))
    }

    /// Returns the task ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TaskId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for TaskId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TaskId> for String {
    fn from(id: TaskId) -> Self {
        id.0
    }
}

impl Borrow<str> for TaskId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// PII type tag
///
/// Taxonomy tags are uppercase (`PERSON`, `EMAIL_ADDRESS`, ...). The common
/// tags are available as constants; any other tag can be built with
/// [`PiiType::new`].
///
/// # Examples
///
/// ```
/// use pii_process::domain::ids::PiiType;
///
/// let t = PiiType::new("person").unwrap();
/// assert_eq!(t, PiiType::PERSON);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PiiType(Cow<'static, str>);

impl PiiType {
    /// Person names
    pub const PERSON: PiiType = PiiType(Cow::Borrowed("PERSON"));
    /// Geographic locations and addresses
    pub const LOCATION: PiiType = PiiType(Cow::Borrowed("LOCATION"));
    /// Organizations
    pub const ORGANIZATION: PiiType = PiiType(Cow::Borrowed("ORGANIZATION"));
    /// Email addresses
    pub const EMAIL_ADDRESS: PiiType = PiiType(Cow::Borrowed("EMAIL_ADDRESS"));
    /// Telephone numbers
    pub const PHONE_NUMBER: PiiType = PiiType(Cow::Borrowed("PHONE_NUMBER"));
    /// Payment card numbers
    pub const CREDIT_CARD: PiiType = PiiType(Cow::Borrowed("CREDIT_CARD"));
    /// Government-issued identifiers (SSN, DNI, ...)
    pub const GOV_ID: PiiType = PiiType(Cow::Borrowed("GOV_ID"));
    /// IBAN and bank account numbers
    pub const BANK_ACCOUNT: PiiType = PiiType(Cow::Borrowed("BANK_ACCOUNT"));
    /// IP addresses
    pub const IP_ADDRESS: PiiType = PiiType(Cow::Borrowed("IP_ADDRESS"));
    /// Web URLs
    pub const URL: PiiType = PiiType(Cow::Borrowed("URL"));
    /// Calendar dates
    pub const DATE: PiiType = PiiType(Cow::Borrowed("DATE"));

    /// Creates a PII type tag, normalizing it to uppercase
    pub fn new(tag: impl Into<String>) -> Result<Self, String> {
        let tag = tag.into().trim().to_ascii_uppercase();
        if tag.is_empty() {
            return Err("PII type cannot be empty".to_string());
        }
        if !tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(format!("Invalid PII type '{tag}'"));
        }
        Ok(Self(Cow::Owned(tag)))
    }

    /// Returns the tag as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PiiType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PiiType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for PiiType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PiiType> for String {
    fn from(t: PiiType) -> Self {
        t.0.into_owned()
    }
}

impl Borrow<str> for PiiType {
    fn borrow(&self) -> &str {
        &self.0
    }
}
