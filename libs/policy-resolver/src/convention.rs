//! Naming-convention fallback resolver.
//!
//! Resources without an explicit mapping get the policy class named after
//! their lookup key: `Article` → `ArticlePolicy`, a query over `ArticlesTable`
//! → `ArticlesTablePolicy`. Only classes present in the catalog are eligible.

use std::sync::Arc;

use policy_resolver_sdk::{
    PolicyRef, PolicyResolverError, Resolver, Resource, ResourceKey, Result, classify,
};
use tracing::{debug, trace};

use crate::catalog::TypeCatalog;

/// Resolves a policy class by name from the resource's short type name.
#[derive(Debug, Clone)]
pub struct ConventionResolver {
    catalog: Arc<TypeCatalog>,
    suffix: String,
}

impl ConventionResolver {
    #[must_use]
    pub fn new(catalog: Arc<TypeCatalog>, suffix: impl Into<String>) -> Self {
        Self {
            catalog,
            suffix: suffix.into(),
        }
    }

    /// Policy class name expected for resources looked up under `key`.
    #[must_use]
    pub fn policy_name(&self, key: &ResourceKey) -> String {
        format!("{}{}", key.short_name(), self.suffix)
    }
}

impl Resolver for ConventionResolver {
    fn policy_for(&self, resource: &dyn Resource) -> Result<PolicyRef> {
        let classification = classify(resource);
        let name = self.policy_name(&classification.key);

        if let Some(class) = self.catalog.policy_class(&name) {
            trace!(key = %classification.key, policy = %name, "Resolved policy by convention");
            Ok(class.instantiate())
        } else {
            debug!(key = %classification.key, policy = %name, "No policy class by convention");
            Err(PolicyResolverError::missing(&classification))
        }
    }
}
