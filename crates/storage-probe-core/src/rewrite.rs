//! # Secret Rewriting
//!
//! Applies secret resolution to the declared fields of a configuration
//! object.
//!
//! Accessors are validated once, when the rewriter is built. Each pass then
//! reads every declared field, resolves it and writes the result back when it
//! differs from the configured value. Fields are written one at a time in
//! declaration order: if a later field fails to resolve, earlier fields keep
//! their resolved values on the object that was passed in.

use crate::fields::{FieldAccessor, SecretFields};
use crate::resolver::SecretResolver;
use crate::ConfigError;
use std::sync::Arc;
use tracing::{debug, info_span, Instrument};

/// Outcome of one rewrite pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteSummary {
    /// Fields whose value was replaced, in declaration order
    pub rewritten: Vec<&'static str>,

    /// Fields whose value was left as configured
    pub unchanged: Vec<&'static str>,
}

impl RewriteSummary {
    /// Check whether the pass changed anything
    pub fn is_unchanged(&self) -> bool {
        self.rewritten.is_empty()
    }
}

/// Rewrites declared string fields of `T` with their resolved values
pub struct SecretRewriter<T> {
    resolver: Arc<SecretResolver>,
    accessors: Vec<FieldAccessor<T>>,
}

impl<T: SecretFields> SecretRewriter<T> {
    /// Create rewriter over the declared accessors
    ///
    /// # Errors
    /// Returns the first accessor that does not read a single settable field
    /// (`ConfigError::InvalidAccessor` or `ConfigError::FieldNotSettable`).
    pub fn new(
        resolver: Arc<SecretResolver>,
        accessors: Vec<FieldAccessor<T>>,
    ) -> Result<Self, ConfigError> {
        for accessor in &accessors {
            accessor.validate()?;
        }

        debug!(
            type_name = T::type_name(),
            fields = ?accessors.iter().map(FieldAccessor::name).collect::<Vec<_>>(),
            "Declared secret-resolved fields"
        );

        Ok(Self {
            resolver,
            accessors,
        })
    }

    /// Names of the declared fields
    pub fn field_names(&self) -> Vec<&'static str> {
        self.accessors.iter().map(FieldAccessor::name).collect()
    }

    /// Run one resolution pass over `target`
    ///
    /// # Errors
    /// `ConfigError::SecretResolution` for the first field whose reference
    /// could not be fetched. Fields before it have already been rewritten.
    pub async fn rewrite(&self, target: &mut T) -> Result<RewriteSummary, ConfigError> {
        let mut summary = RewriteSummary::default();

        for accessor in &self.accessors {
            let field = accessor.name();
            let current = accessor.read(target).to_owned();

            let resolved = self
                .resolver
                .resolve(&current)
                .instrument(info_span!("resolve_field", type_name = T::type_name(), field))
                .await
                .map_err(|source| ConfigError::SecretResolution {
                    type_name: T::type_name(),
                    field,
                    source,
                })?;

            if resolved == current {
                summary.unchanged.push(field);
                continue;
            }

            if !target.set_field(field, resolved) {
                return Err(ConfigError::FieldNotSettable {
                    type_name: T::type_name(),
                    field: field.to_string(),
                });
            }
            summary.rewritten.push(field);
        }

        Ok(summary)
    }
}

impl<T> std::fmt::Debug for SecretRewriter<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretRewriter")
            .field("accessors", &self.accessors)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "rewrite_tests.rs"]
mod tests;
