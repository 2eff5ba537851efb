//! Types for digital assets

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// A collectible earned by completing missions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Nft {
    /// Asset id; the backend sends numbers for database rows and strings for
    /// canister-issued tokens, both are kept as text
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub rarity: Rarity,

    #[serde(default)]
    pub status: NftStatus,

    #[serde(default)]
    pub points: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claimed_at: Option<DateTime<Utc>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Nft {
    pub fn is_claimed(&self) -> bool {
        self.status == NftStatus::Claimed
    }
}

fn id_as_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(id) => Ok(id),
        Value::Number(id) => Ok(id.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a string or number id, got {}",
            other
        ))),
    }
}

macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident, default = $default:ident, { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(from = "String", into = "String")]
        pub enum $name {
            $($variant,)+
            /// A value this client does not know; kept verbatim
            Other(String),
        }

        impl $name {
            pub fn as_str(&self) -> &str {
                match self {
                    $($name::$variant => $text,)+
                    $name::Other(raw) => raw,
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name::$default
            }
        }

        impl From<String> for $name {
            fn from(raw: String) -> Self {
                match raw.as_str() {
                    $($text => $name::$variant,)+
                    _ => $name::Other(raw),
                }
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.as_str().to_string()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

string_enum!(
    /// Whether an asset has been claimed
    NftStatus, default = Unclaimed, {
        Unclaimed => "unclaimed",
        Claimed => "claimed",
    }
);

string_enum!(
    /// Rarity tier
    Rarity, default = Common, {
        Common => "common",
        Rare => "rare",
        Epic => "epic",
        Legendary => "legendary",
    }
);

/// The user NFT listing comes either bare or wrapped in `{"nfts": [...]}`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum NftList {
    Bare(Vec<Nft>),
    Wrapped { nfts: Vec<Nft> },
}

impl From<NftList> for Vec<Nft> {
    fn from(list: NftList) -> Self {
        match list {
            NftList::Bare(nfts) | NftList::Wrapped { nfts } => nfts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numeric_and_string_ids_are_accepted() {
        let numeric: Nft = serde_json::from_value(json!({ "id": 12, "name": "Mangrove" })).unwrap();
        let text: Nft = serde_json::from_value(json!({ "id": "tok-12", "name": "Mangrove" })).unwrap();

        assert_eq!(numeric.id, "12");
        assert_eq!(text.id, "tok-12");
        assert_eq!(numeric.status, NftStatus::Unclaimed);
        assert_eq!(numeric.rarity, Rarity::Common);
    }

    #[test]
    fn listing_accepts_both_shapes() {
        let bare: NftList = serde_json::from_value(json!([{ "id": 1, "rarity": "epic" }])).unwrap();
        let wrapped: NftList =
            serde_json::from_value(json!({ "nfts": [{ "id": 2, "status": "owned" }] })).unwrap();

        let bare: Vec<Nft> = bare.into();
        let wrapped: Vec<Nft> = wrapped.into();
        assert_eq!(bare[0].rarity, Rarity::Epic);
        assert_eq!(wrapped[0].status, NftStatus::Other("owned".to_string()));
    }
}
