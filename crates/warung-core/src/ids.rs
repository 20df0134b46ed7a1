//! Identifier types for the storefront.
//!
//! User ids come from the chat platform as stable numeric identifiers.
//! Product ids are ULIDs for time-ordering. Reference ids are the globally
//! unique transaction identifiers exchanged with the payment gateway, in the
//! format `{TYPE}-{userId}-{creationEpochMillis}`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

/// A chat-platform user identifier.
///
/// Signed because some platforms hand out negative ids for special peers;
/// buyers are always positive in practice.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(i64);

impl UserId {
    /// Wrap a raw platform id.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Return the raw numeric id.
    #[must_use]
    pub const fn as_i64(self) -> i64 {
        self.0
    }

    /// Big-endian byte encoding, used as the store key.
    #[must_use]
    pub fn to_be_bytes(self) -> [u8; 8] {
        self.0.to_be_bytes()
    }
}

impl FromStr for UserId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<i64>().map(Self).map_err(|_| IdError::InvalidUserId)
    }
}

impl fmt::Debug for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserId({})", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// A product identifier using ULID for time-ordering.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProductId(Ulid);

impl ProductId {
    /// Generate a new `ProductId` with the current timestamp.
    #[must_use]
    pub fn generate() -> Self {
        Self(Ulid::new())
    }

    /// Return the bytes of the ULID (16 bytes).
    #[must_use]
    pub fn to_bytes(&self) -> [u8; 16] {
        self.0.to_bytes()
    }

    /// Create a `ProductId` from bytes.
    #[must_use]
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Ulid::from_bytes(bytes))
    }
}

impl FromStr for ProductId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ulid = Ulid::from_string(s).map_err(|_| IdError::InvalidUlid)?;
        Ok(Self(ulid))
    }
}

impl fmt::Debug for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProductId({})", self.0)
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for ProductId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ProductId> for String {
    fn from(id: ProductId) -> Self {
        id.0.to_string()
    }
}

/// The kind of transaction a reference id identifies.
///
/// The prefix is embedded in the reference id; the gateway webhook only
/// accepts the `PROD` and `TOPUP` prefixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefKind {
    /// A product purchase paid through the gateway.
    Product,
    /// A balance top-up paid through the gateway.
    TopUp,
    /// A purchase settled against the internal balance ledger.
    Balance,
}

impl RefKind {
    /// The reference-id prefix for this kind.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Product => "PROD",
            Self::TopUp => "TOPUP",
            Self::Balance => "BAL",
        }
    }

    /// Whether the gateway webhook is allowed to settle this kind.
    #[must_use]
    pub const fn settles_via_gateway(self) -> bool {
        matches!(self, Self::Product | Self::TopUp)
    }
}

/// A globally unique transaction reference id.
///
/// Format: `{TYPE}-{userId}-{creationEpochMillis}`. Uniqueness is structural
/// (buyer id plus high-resolution timestamp); the store's unique index is the
/// enforcement backstop.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RefId(String);

impl RefId {
    /// Generate a reference id for the given kind and buyer.
    #[must_use]
    pub fn generate(kind: RefKind, user_id: UserId) -> Self {
        let millis = chrono::Utc::now().timestamp_millis();
        Self(format!("{}-{}-{millis}", kind.prefix(), user_id.as_i64()))
    }

    /// Parse and validate a reference id received from outside.
    ///
    /// # Errors
    ///
    /// Returns [`IdError::InvalidRefId`] if the prefix is not one of the
    /// known kinds or the id does not follow the `{TYPE}-{user}-{millis}`
    /// shape.
    pub fn parse(s: &str) -> Result<(Self, RefKind), IdError> {
        let kind = Self::kind_of(s).ok_or(IdError::InvalidRefId)?;
        let rest = &s[kind.prefix().len() + 1..];
        let mut parts = rest.splitn(2, '-');
        let user_ok = parts.next().is_some_and(|p| p.parse::<u64>().is_ok());
        let millis_ok = parts.next().is_some_and(|p| p.parse::<i64>().is_ok());
        if user_ok && millis_ok {
            Ok((Self(s.to_string()), kind))
        } else {
            Err(IdError::InvalidRefId)
        }
    }

    /// Determine the kind from the prefix alone, if recognized.
    #[must_use]
    pub fn kind_of(s: &str) -> Option<RefKind> {
        for kind in [RefKind::TopUp, RefKind::Product, RefKind::Balance] {
            if let Some(rest) = s.strip_prefix(kind.prefix()) {
                if rest.starts_with('-') {
                    return Some(kind);
                }
            }
        }
        None
    }

    /// The id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for RefId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RefId({})", self.0)
    }
}

impl fmt::Display for RefId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<RefId> for String {
    fn from(id: RefId) -> Self {
        id.0
    }
}

impl AsRef<str> for RefId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Errors that can occur when parsing identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    /// The input is not a numeric user id.
    #[error("invalid user id")]
    InvalidUserId,

    /// The input is not a valid ULID.
    #[error("invalid ULID format")]
    InvalidUlid,

    /// The input does not follow the reference-id scheme.
    #[error("invalid reference id format")]
    InvalidRefId,
}
