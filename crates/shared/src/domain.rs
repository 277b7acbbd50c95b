use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub i64);
    };
}

macro_rules! public_id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

id_newtype!(UserId);
public_id_newtype!(RequestPublicId);
public_id_newtype!(BidPublicId);

/// Which side of the marketplace an account operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    Buyer,
    Seller,
    Both,
}

/// A dashboard dataset. Also used as the dashboard tab selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetKind {
    Buyer,
    Seller,
}

impl DatasetKind {
    pub const ALL: [DatasetKind; 2] = [DatasetKind::Buyer, DatasetKind::Seller];

    pub fn as_str(self) -> &'static str {
        match self {
            DatasetKind::Buyer => "buyer",
            DatasetKind::Seller => "seller",
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Role {
    /// The only tab a single-sided role may show, `None` for dual-role accounts.
    pub fn pinned_tab(self) -> Option<DatasetKind> {
        match self {
            Role::Buyer => Some(DatasetKind::Buyer),
            Role::Seller => Some(DatasetKind::Seller),
            Role::Both => None,
        }
    }

    pub fn default_tab(self) -> DatasetKind {
        match self {
            Role::Seller => DatasetKind::Seller,
            Role::Buyer | Role::Both => DatasetKind::Buyer,
        }
    }

    /// Maps a requested tab onto one this role may actually display.
    pub fn admit(self, requested: DatasetKind) -> DatasetKind {
        self.pinned_tab().unwrap_or(requested)
    }
}

/// Monetary value as sent by the backend.
///
/// The API emits decimals either as strings (`"150.00"`) or as JSON numbers
/// depending on the endpoint; both are kept as their decimal text so no
/// floating point rounding happens on the client.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Amount(String);

impl Amount {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawAmount {
            Text(String),
            Number(serde_json::Number),
        }

        Ok(match RawAmount::deserialize(deserializer)? {
            RawAmount::Text(text) => Amount(text),
            RawAmount::Number(number) => Amount(number.to_string()),
        })
    }
}
