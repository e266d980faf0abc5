//! Error types for the policy resolver.

use thiserror::Error;

use crate::resource::{Classification, ResourceKey};

/// Errors raised while registering or resolving policies.
///
/// None of these are recovered from inside the resolver. Callers decide
/// whether a [`PolicyResolverError::MissingPolicy`] means "deny" or is
/// propagated further.
#[derive(Debug, Error)]
pub enum PolicyResolverError {
    /// A registration referenced a resource type, policy class, instance or
    /// factory that does not exist, or the configuration was malformed.
    #[error("invalid policy configuration: {0}")]
    InvalidConfiguration(String),

    /// The value passed for resolution is not a resource.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// No policy is registered for the resource.
    ///
    /// `resource` is the type of the value that was resolved, `key` the type
    /// the policy was looked up under. They differ for queries, which are
    /// looked up under their repository.
    #[error("policy for `{resource}` has not been defined (looked up as `{key}`)")]
    MissingPolicy {
        resource: ResourceKey,
        key: ResourceKey,
    },
}

impl PolicyResolverError {
    #[must_use]
    pub fn is_missing_policy(&self) -> bool {
        matches!(self, Self::MissingPolicy { .. })
    }

    /// Missing-policy error for a classified resource.
    #[must_use]
    pub fn missing(classification: &Classification) -> Self {
        Self::MissingPolicy {
            resource: classification.resource,
            key: classification.key,
        }
    }
}

/// Result type for policy resolver operations.
pub type Result<T> = std::result::Result<T, PolicyResolverError>;
