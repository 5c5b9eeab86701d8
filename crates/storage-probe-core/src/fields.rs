//! # Field Accessors
//!
//! Typed references to string fields of configuration objects.
//!
//! A [`FieldAccessor`] pairs a getter with the field name captured when the
//! accessor is declared. Reading goes through the getter, so it is checked
//! by the compiler. Writing goes through [`SecretFields::set_field`], the one
//! place where a field is addressed by name.
//!
//! ```rust
//! use storage_probe_core::{field_accessor, secret_fields};
//!
//! #[derive(Debug, Clone, Default)]
//! struct DatabaseOptions {
//!     connection_string: String,
//!     display_name: String,
//! }
//!
//! // Only `connection_string` accepts writes
//! secret_fields!(DatabaseOptions { connection_string });
//!
//! let accessor = field_accessor!(DatabaseOptions, connection_string);
//! assert_eq!(accessor.name(), "connection_string");
//! assert!(accessor.validate().is_ok());
//!
//! let display = field_accessor!(DatabaseOptions, display_name);
//! assert!(display.validate().is_err());
//! ```

use crate::ConfigError;
use std::fmt;

/// Configuration types whose string fields can be rewritten by name
///
/// Implement with the [`secret_fields!`](crate::secret_fields) macro, which
/// lists the fields that accept writes.
pub trait SecretFields: Send + Sync + 'static {
    /// Name of the type, used in error messages
    fn type_name() -> &'static str;

    /// Names of the fields that accept writes through [`Self::set_field`]
    fn settable_fields() -> &'static [&'static str];

    /// Write `value` into the field called `name`
    ///
    /// Returns `false` if no settable field has that name.
    fn set_field(&mut self, name: &str, value: String) -> bool;

    /// Check whether a field accepts writes
    fn is_settable(name: &str) -> bool {
        Self::settable_fields().iter().any(|field| *field == name)
    }
}

/// Declared reference to one string field of `T`
pub struct FieldAccessor<T> {
    name: &'static str,
    read: fn(&T) -> &str,
}

impl<T> FieldAccessor<T> {
    /// Create accessor from a field name and its getter
    ///
    /// Prefer [`field_accessor!`](crate::field_accessor), which derives both
    /// from the field itself.
    pub const fn new(name: &'static str, read: fn(&T) -> &str) -> Self {
        Self { name, read }
    }

    /// Name of the field
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Read the field's current value
    pub fn read<'a>(&self, target: &'a T) -> &'a str {
        (self.read)(target)
    }
}

impl<T: SecretFields> FieldAccessor<T> {
    /// Check that the accessor names one field that accepts writes on `T`
    ///
    /// # Errors
    /// - `ConfigError::InvalidAccessor` - name is not a single field identifier
    /// - `ConfigError::FieldNotSettable` - `T` has no setter for the field
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_field_identifier(self.name) {
            return Err(ConfigError::InvalidAccessor {
                type_name: T::type_name(),
                field: self.name.to_string(),
                reason: "accessor must read a single field directly".to_string(),
            });
        }

        if !T::is_settable(self.name) {
            return Err(ConfigError::FieldNotSettable {
                type_name: T::type_name(),
                field: self.name.to_string(),
            });
        }

        Ok(())
    }
}

impl<T> Clone for FieldAccessor<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for FieldAccessor<T> {}

impl<T> fmt::Debug for FieldAccessor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldAccessor")
            .field("name", &self.name)
            .finish()
    }
}

fn is_field_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    name != "_" && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Declare an accessor for a `String` field
///
/// `field_accessor!(Type, field)` expands to a [`FieldAccessor<Type>`] whose
/// name is `"field"` and whose getter borrows `Type::field` as `&str`.
#[macro_export]
macro_rules! field_accessor {
    ($ty:ty, $field:ident) => {{
        fn read(target: &$ty) -> &str {
            &target.$field
        }
        $crate::fields::FieldAccessor::<$ty>::new(::core::stringify!($field), read)
    }};
}

/// Implement [`SecretFields`] for a type, listing its settable `String` fields
///
/// Fields not listed are read-only as far as secret rewriting is concerned.
#[macro_export]
macro_rules! secret_fields {
    ($ty:ident { $($field:ident),* $(,)? }) => {
        impl $crate::fields::SecretFields for $ty {
            fn type_name() -> &'static str {
                ::core::stringify!($ty)
            }

            fn settable_fields() -> &'static [&'static str] {
                &[$(::core::stringify!($field)),*]
            }

            #[allow(unused_variables)]
            fn set_field(&mut self, name: &str, value: ::std::string::String) -> bool {
                $(
                    if name == ::core::stringify!($field) {
                        self.$field = value;
                        return true;
                    }
                )*
                false
            }
        }
    };
}

#[cfg(test)]
#[path = "fields_tests.rs"]
mod tests;
