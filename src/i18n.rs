//! Interface language preference

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;
use crate::storage::{CredentialStore, LANGUAGE_KEY};

/// Languages the interface ships translations for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Id,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::En, Language::Id];

    /// Two-letter code, as persisted
    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Id => "id",
        }
    }

    /// Name shown in the language switcher
    pub fn name(&self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Id => "Bahasa Indonesia",
        }
    }

    /// Parse a code such as `id` or `en-US`; unknown codes yield `None`
    pub fn from_code(code: &str) -> Option<Self> {
        let primary = code.split(['-', '_']).next().unwrap_or(code);
        match primary.to_ascii_lowercase().as_str() {
            "en" => Some(Language::En),
            "id" => Some(Language::Id),
            _ => None,
        }
    }

    /// The persisted preference, falling back to English
    pub async fn load(store: &dyn CredentialStore) -> Result<Self> {
        Ok(store
            .get(LANGUAGE_KEY)
            .await?
            .and_then(|code| Language::from_code(&code))
            .unwrap_or_default())
    }

    pub async fn save(self, store: &dyn CredentialStore) -> Result<()> {
        store.set(LANGUAGE_KEY, self.code()).await
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
