//! Code for handling IDs
use serde::Serialize;
use serde::de::DeserializeOwned;

/// A trait alias for ID types
pub trait IDLike:
    Eq
    + std::hash::Hash
    + std::borrow::Borrow<str>
    + Clone
    + std::fmt::Display
    + std::fmt::Debug
    + From<String>
    + for<'a> From<&'a str>
    + Serialize
    + DeserializeOwned
{
}
impl<T> IDLike for T where
    T: Eq
        + std::hash::Hash
        + std::borrow::Borrow<str>
        + Clone
        + std::fmt::Display
        + std::fmt::Debug
        + From<String>
        + for<'a> From<&'a str>
        + Serialize
        + DeserializeOwned
{
}

macro_rules! define_id_type {
    ($name:ident) => {
        #[derive(
            Clone, std::hash::Hash, PartialEq, Eq, serde::Deserialize, Debug, serde::Serialize,
        )]
        /// An ID type (e.g. `BusID`, `GeneratorID`, etc.)
        pub struct $name(pub std::rc::Rc<str>);

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                $name(std::rc::Rc::from(s))
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                $name(std::rc::Rc::from(s))
            }
        }

        impl $name {
            /// Create a new ID from a string slice
            pub fn new(id: &str) -> Self {
                $name(std::rc::Rc::from(id))
            }

            /// The ID as a string slice
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }
    };
}
pub(crate) use define_id_type;

#[cfg(test)]
define_id_type!(GenericID);

/// Indicates that the struct has an ID field
pub trait HasID<ID: IDLike> {
    /// Get the struct's ID
    fn get_id(&self) -> &ID;
}

/// Implement the `HasID` trait for the given type, assuming it has a field called `name`
macro_rules! define_id_getter {
    ($t:ty, $id_ty:ty) => {
        impl crate::id::HasID<$id_ty> for $t {
            fn get_id(&self) -> &$id_ty {
                &self.name
            }
        }
    };
}
pub(crate) use define_id_getter;

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Borrow;

    #[test]
    fn test_id_type() {
        let id = GenericID::from(String::from("bus_A"));
        assert_eq!(id, GenericID::new("bus_A"));
        assert_eq!(id.as_str(), "bus_A");
        assert_eq!(id.to_string(), "bus_A");
        assert_eq!(<GenericID as Borrow<str>>::borrow(&id), "bus_A");
    }
}
