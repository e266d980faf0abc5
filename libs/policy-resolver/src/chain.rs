//! Ordered combination of resolvers.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use policy_resolver_sdk::{PolicyRef, PolicyResolverError, Resolver, Resource, Result, classify};

use crate::catalog::{ResourceViews, TypeCatalog};
use crate::config::PolicyResolverConfig;
use crate::convention::ConventionResolver;
use crate::resolver::PolicyResolver;

/// Tries resolvers in order and returns the first policy found.
///
/// A [`PolicyResolverError::MissingPolicy`] from one resolver moves on to the
/// next; any other error ends the lookup.
#[derive(Clone, Default)]
pub struct ResolverChain {
    resolvers: Vec<Arc<dyn Resolver>>,
    views: ResourceViews,
}

impl ResolverChain {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a resolver.
    #[must_use]
    pub fn with(mut self, resolver: impl Resolver + 'static) -> Self {
        self.push(Arc::new(resolver));
        self
    }

    pub fn push(&mut self, resolver: Arc<dyn Resolver>) -> &mut Self {
        self.resolvers.push(resolver);
        self
    }

    /// Let [`resolve_any`](Self::resolve_any) recognize values of type `R`.
    pub fn accept<R: Resource>(&mut self) -> &mut Self {
        self.views.accept::<R>();
        self
    }

    /// Select the policy for a dynamically typed value.
    ///
    /// # Errors
    ///
    /// - [`PolicyResolverError::InvalidArgument`] if the value's type was
    ///   never accepted as a resource
    /// - [`PolicyResolverError::MissingPolicy`] if no resolver in the chain
    ///   has a policy for it
    pub fn resolve_any(&self, value: &(dyn Any + 'static)) -> Result<PolicyRef> {
        self.policy_for(self.views.recover(value)?)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }
}

impl Resolver for ResolverChain {
    fn policy_for(&self, resource: &dyn Resource) -> Result<PolicyRef> {
        for resolver in &self.resolvers {
            match resolver.policy_for(resource) {
                Err(e) if e.is_missing_policy() => {}
                found => return found,
            }
        }
        Err(PolicyResolverError::missing(&classify(resource)))
    }
}

impl fmt::Debug for ResolverChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolverChain")
            .field("len", &self.resolvers.len())
            .finish_non_exhaustive()
    }
}

/// Build the resolver described by `config`: the configured map first, then
/// the naming-convention fallback when enabled. Every catalog resource type is
/// accepted by [`ResolverChain::resolve_any`].
///
/// # Errors
///
/// - [`PolicyResolverError::InvalidConfiguration`] as for
///   [`PolicyResolver::from_config`]
pub fn build_resolver(
    catalog: Arc<TypeCatalog>,
    config: &PolicyResolverConfig,
) -> Result<ResolverChain> {
    let map = PolicyResolver::from_config(&catalog, config)?;
    let mut chain = ResolverChain::new().with(map);
    chain.views.extend_from(&catalog);

    if config.conventions.enabled {
        tracing::info!(suffix = %config.conventions.suffix, "Convention fallback enabled");
        let suffix = config.conventions.suffix.clone();
        chain.push(Arc::new(ConventionResolver::new(catalog, suffix)));
    }

    Ok(chain)
}
