//! Data model for documented configuration options.

use indexmap::IndexMap;
use serde::Serialize;
use std::hash::{Hash, Hasher};

/// Placeholder shown for options with an empty value.
pub const EMPTY_VALUE: &str = "<None>";

/// Placeholder description for options no `#:` comment documented.
pub const UNDOCUMENTED: &str = "Undocumented Option, please fix!";

/// Identity of a documented option: later items with the same key override
/// earlier ones.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocKey {
    pub subthing: String,
    pub option: String,
}

/// One documented configuration option.
///
/// Equality and hashing only consider `subthing` and `option`.
#[derive(Debug, Clone, Serialize)]
pub struct DocItem {
    subthing: String,
    option: String,
    desc: String,
    value: String,
}

impl DocItem {
    pub fn new(
        subthing: impl Into<String>,
        option: impl Into<String>,
        desc: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        let mut value = value.into();
        if value.is_empty() {
            value = EMPTY_VALUE.to_string();
        }
        Self {
            subthing: subthing.into(),
            option: option.into(),
            desc: desc.into(),
            value,
        }
    }

    /// Section name the option belongs to.
    pub fn subthing(&self) -> &str {
        &self.subthing
    }

    pub fn option(&self) -> &str {
        &self.option
    }

    pub fn desc(&self) -> &str {
        &self.desc
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn is_documented(&self) -> bool {
        self.desc != UNDOCUMENTED
    }

    pub fn key(&self) -> DocKey {
        DocKey {
            subthing: self.subthing.clone(),
            option: self.option.clone(),
        }
    }

    /// Field name → value view, in declaration order.
    pub fn as_mapping(&self) -> IndexMap<String, String> {
        IndexMap::from([
            ("subthing".to_string(), self.subthing.clone()),
            ("option".to_string(), self.option.clone()),
            ("desc".to_string(), self.desc.clone()),
            ("value".to_string(), self.value.clone()),
        ])
    }
}

impl PartialEq for DocItem {
    fn eq(&self, other: &Self) -> bool {
        self.subthing == other.subthing && self.option == other.option
    }
}

impl Eq for DocItem {}

impl Hash for DocItem {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.subthing.hash(state);
        self.option.hash(state);
    }
}
