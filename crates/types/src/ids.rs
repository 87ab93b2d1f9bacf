use serde::{Deserialize, Serialize};

/// Produces a string newtype with the trait surface the rest of the engine
/// expects: transparent serde, `Display`, `as_str`, and `Borrow<str>` so the
/// newtype can key maps that are looked up by plain strings.
macro_rules! str_newtype {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(
            Serialize,
            Deserialize,
            Clone,
            Debug,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            derive_more::Display,
        )]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                self.0.as_str()
            }
        }

        impl std::ops::Deref for $name {
            type Target = str;
            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

str_newtype!(
    ListKey,
    "The unique key identifying a configured list, e.g. `User`."
);
str_newtype!(
    FieldPath,
    "The path of a field within its owning list, unique per list."
);
str_newtype!(
    ItemId,
    "An adapter-assigned item identifier. Opaque to the engine."
);
str_newtype!(
    SchemaVariant,
    "A named schema variant, e.g. `public` or `internal`. Access rules are \
     resolved per variant."
);

impl Default for SchemaVariant {
    fn default() -> Self {
        Self("public".to_string())
    }
}
