//! Newtype wrappers for string identifiers, providing compile-time type safety.
//!
//! All newtypes serialize/deserialize as plain strings so they drop straight
//! into template and manifest documents.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;

macro_rules! string_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new instance from a string.
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            /// Return the inner string as a slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume self and return the inner `String`.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl Deref for $name {
            type Target = str;
            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }

        impl PartialEq<String> for $name {
            fn eq(&self, other: &String) -> bool {
                self.0 == *other
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }
    };
}

string_newtype!(
    /// Canonical, identifier-safe tag for one interpreter version, e.g. `Python39`.
    RuntimeTag
);

string_newtype!(
    /// Key of a resource inside a template's `Resources` section.
    LogicalId
);

impl RuntimeTag {
    /// Whether this tag belongs to the given interpreter family (`Python`, ...).
    pub fn is_family(&self, family: &str) -> bool {
        self.0.starts_with(family)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_tag_display_and_as_ref() {
        let tag = RuntimeTag::new("Python39");
        assert_eq!(tag.to_string(), "Python39");
        assert_eq!(tag.as_str(), "Python39");
        assert_eq!(AsRef::<str>::as_ref(&tag), "Python39");
    }

    #[test]
    fn logical_id_serializes_as_plain_string() {
        let id = LogicalId::new("Python39DependenciesLayer");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"Python39DependenciesLayer\"");
        let back: LogicalId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn runtime_tag_family_prefix() {
        assert!(RuntimeTag::from("Python38").is_family("Python"));
        assert!(!RuntimeTag::from("Nodejs14x").is_family("Python"));
    }

    #[test]
    fn tags_order_lexically() {
        let mut tags = vec![RuntimeTag::from("Python39"), RuntimeTag::from("Python38")];
        tags.sort();
        assert_eq!(tags[0], "Python38");
    }
}
