//! Newtype IDs for catalog, user and cart entities.
//!
//! The remote API uses 64-bit integer keys everywhere. Wrapping them keeps a
//! product ID from being passed where a cart item ID is expected.

/// Macro to define a type-safe ID wrapper around `i64`.
///
/// The generated type serializes as a bare JSON number and can be parsed
/// from a string, which is how IDs arrive from the command line.
///
/// # Example
///
/// ```rust
/// # use greencart_core::define_id;
/// define_id!(OrderId);
/// define_id!(ReviewId);
///
/// let order = OrderId::new(7);
/// assert_eq!(order.as_i64(), 7);
/// assert_eq!("7".parse::<OrderId>().unwrap(), order);
///
/// // Different types, so this won't compile:
/// // let _: ReviewId = order;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wrap a raw ID.
            #[must_use]
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// The raw ID as sent on the wire.
            #[must_use]
            pub const fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                ::core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = ::core::num::ParseIntError;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                s.trim().parse::<i64>().map(Self)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id!(ProductId);
define_id!(UserId);
define_id!(CartItemId);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_id_serializes_as_number() {
        let id = ProductId::new(42);
        assert_eq!(serde_json::to_string(&id).unwrap(), "42");

        let parsed: ProductId = serde_json::from_str("42").unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_id_from_str_trims() {
        assert_eq!(" 9 ".parse::<UserId>().unwrap(), UserId::new(9));
        assert!("nine".parse::<UserId>().is_err());
    }

    #[test]
    fn test_id_display() {
        assert_eq!(CartItemId::new(301).to_string(), "301");
    }
}
