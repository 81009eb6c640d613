//! Newtype IDs for type-safe entity references.
//!
//! The Kisan Setu backend is not consistent about identifier shapes: products
//! and orders come back as integers from the marketplace routes, users as
//! string object ids from the auth routes, and the offline fallbacks mint
//! their own. IDs therefore keep whatever representation they arrived with
//! and serialize it back unchanged.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Wire representation of an identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawId {
    /// Numeric identifier (e.g. `1`).
    Number(i64),
    /// Textual identifier (e.g. `"65a1f0c2..."`).
    Text(String),
}

impl fmt::Display for RawId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Macro to define a type-safe ID wrapper.
///
/// Creates a newtype wrapper around [`RawId`] with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - `From<i64>`, `From<&str>` and `From<String>` implementations
/// - `Display` that renders the bare value
///
/// # Example
///
/// ```rust
/// # use kisan_setu_core::define_id;
/// define_id!(CropId);
/// define_id!(FieldId);
///
/// let crop = CropId::from(7);
/// let field = FieldId::from("north-plot");
///
/// assert_eq!(crop.to_string(), "7");
/// assert_eq!(field.to_string(), "north-plot");
/// // These are different types, so this won't compile:
/// // let _: CropId = field;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name($crate::types::id::RawId);

        impl $name {
            /// Create an ID from its wire representation.
            #[must_use]
            pub const fn new(raw: $crate::types::id::RawId) -> Self {
                Self(raw)
            }

            /// Get the underlying wire representation.
            #[must_use]
            pub const fn raw(&self) -> &$crate::types::id::RawId {
                &self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                ::core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self($crate::types::id::RawId::Number(id))
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self($crate::types::id::RawId::Text(id.to_owned()))
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self($crate::types::id::RawId::Text(id))
            }
        }
    };
}

define_id!(UserId);
define_id!(ProductId);
define_id!(OrderId);
