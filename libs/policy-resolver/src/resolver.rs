//! Map-based policy resolver.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;

use policy_resolver_sdk::{
    PolicyRef, PolicyResolverError, Resolver, Resource, ResourceKey, Result, classify,
};
use tracing::{debug, info, trace, warn};

use crate::catalog::{ResourceViews, TypeCatalog};
use crate::config::{PolicyResolverConfig, PolicySpec};
use crate::descriptor::PolicyDescriptor;

/// Registry from resource type to policy descriptor.
///
/// Built once during setup, then only read. Registration takes `&mut self`,
/// so sharing a resolver across threads (`Arc<PolicyResolver>`) freezes it;
/// a host that needs to register after sharing must add its own lock.
///
/// ```ignore
/// let mut resolver = PolicyResolver::new();
/// resolver
///     .register::<Article>(PolicyDescriptor::class::<ArticlePolicy>())
///     .register::<CommentsTable>(PolicyDescriptor::instance(CommentsPolicy::default()))
///     .register::<Upload>(PolicyDescriptor::factory(|upload, _| pick_upload_policy(upload)));
///
/// let policy = resolver.resolve(&article)?;
/// ```
#[derive(Default, Clone)]
pub struct PolicyResolver {
    policies: HashMap<ResourceKey, PolicyDescriptor>,
    /// Resource types `resolve_any` can recognize.
    views: ResourceViews,
}

impl PolicyResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a resolver from configuration, resolving names through `catalog`.
    ///
    /// Entries are registered in key order. Every catalog resource type is
    /// accepted by [`resolve_any`](Self::resolve_any), including queries that
    /// have no entry of their own.
    ///
    /// # Errors
    ///
    /// - [`PolicyResolverError::InvalidConfiguration`] for the first entry
    ///   naming an unknown resource type or policy
    pub fn from_config(catalog: &TypeCatalog, config: &PolicyResolverConfig) -> Result<Self> {
        let mut resolver = Self::new();

        resolver.views.extend_from(catalog);

        for (resource, spec) in &config.policies {
            resolver.register_named(catalog, resource, spec)?;
        }

        info!(policies = resolver.len(), "Built policy resolver from configuration");
        Ok(resolver)
    }

    /// Map resource type `R` to `descriptor`, replacing any earlier mapping.
    pub fn register<R: Resource>(&mut self, descriptor: PolicyDescriptor) -> &mut Self {
        self.accept::<R>();
        self.register_key(ResourceKey::of::<R>(), descriptor)
    }

    /// Consuming form of [`register`](Self::register).
    #[must_use]
    pub fn with<R: Resource>(mut self, descriptor: PolicyDescriptor) -> Self {
        self.register::<R>(descriptor);
        self
    }

    /// Map the resource type identified by `key` to `descriptor`, replacing
    /// any earlier mapping.
    ///
    /// A key carries no way back from `dyn Any` to the resource, so values of
    /// this type reach [`resolve_any`](Self::resolve_any) only once the type is
    /// also [accepted](Self::accept). [`resolve`](Self::resolve) is unaffected.
    pub fn register_key(&mut self, key: ResourceKey, descriptor: PolicyDescriptor) -> &mut Self {
        let variant = descriptor.variant();
        if let Some(previous) = self.policies.insert(key, descriptor) {
            warn!(
                resource = %key,
                previous = previous.variant(),
                replacement = variant,
                "Replacing registered policy"
            );
        } else {
            debug!(resource = %key, descriptor = variant, "Registered policy");
        }
        self
    }

    /// Register by name: `resource` is looked up among the catalog's resource
    /// types, `spec` among its policies.
    ///
    /// # Errors
    ///
    /// - [`PolicyResolverError::InvalidConfiguration`] if the catalog has no
    ///   resource type `resource`, or no class, instance or factory matching
    ///   `spec`
    pub fn register_named(
        &mut self,
        catalog: &TypeCatalog,
        resource: &str,
        spec: &PolicySpec,
    ) -> Result<&mut Self> {
        let found = catalog.resource(resource).ok_or_else(|| {
            PolicyResolverError::InvalidConfiguration(format!(
                "unknown resource type '{resource}'"
            ))
        })?;
        let descriptor = catalog.descriptor(spec)?;

        self.views.insert(found);
        Ok(self.register_key(found.key(), descriptor))
    }

    /// Let [`resolve_any`](Self::resolve_any) recognize values of type `R`
    /// without registering a policy for `R` itself. Typically used for query
    /// types, which resolve through their repository.
    pub fn accept<R: Resource>(&mut self) -> &mut Self {
        self.views.accept::<R>();
        self
    }

    /// Select the policy for `resource`.
    ///
    /// The lookup key is derived by [`classify`]: the resource's own concrete
    /// type, or for queries the concrete type of their repository. Class
    /// descriptors construct a new policy and factories are called on every
    /// resolution; instance descriptors always return the same shared policy.
    ///
    /// # Errors
    ///
    /// - [`PolicyResolverError::MissingPolicy`] if nothing is registered for
    ///   the derived key
    pub fn resolve(&self, resource: &dyn Resource) -> Result<PolicyRef> {
        let classification = classify(resource);

        let Some(descriptor) = self.policies.get(&classification.key) else {
            debug!(
                resource = %classification.resource,
                key = %classification.key,
                kind = %classification.kind,
                "No policy registered"
            );
            return Err(PolicyResolverError::missing(&classification));
        };

        trace!(
            key = %classification.key,
            kind = %classification.kind,
            descriptor = descriptor.variant(),
            "Resolving policy"
        );
        Ok(descriptor.materialize(resource, self))
    }

    /// Select the policy for a dynamically typed value.
    ///
    /// Pass the value itself, not a `Box<dyn Any>` holding it: a box is a
    /// value of its own type.
    ///
    /// # Errors
    ///
    /// - [`PolicyResolverError::InvalidArgument`] if the value's type was
    ///   never registered or accepted as a resource
    /// - [`PolicyResolverError::MissingPolicy`] as for [`resolve`](Self::resolve)
    pub fn resolve_any(&self, value: &(dyn Any + 'static)) -> Result<PolicyRef> {
        self.resolve(self.views.recover(value)?)
    }

    #[must_use]
    pub fn contains(&self, key: &ResourceKey) -> bool {
        self.policies.contains_key(key)
    }

    #[must_use]
    pub fn is_registered<R: Resource>(&self) -> bool {
        self.contains(&ResourceKey::of::<R>())
    }

    /// Number of registered resource types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.policies.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}

impl Resolver for PolicyResolver {
    fn policy_for(&self, resource: &dyn Resource) -> Result<PolicyRef> {
        self.resolve(resource)
    }
}

impl fmt::Debug for PolicyResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicyResolver")
            .field("policies", &self.policies)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::sync::Arc;

    use super::*;
    use policy_resolver_sdk::{Entity, Policy, Query, Repository, ResourceKind};
    use tracing_test::traced_test;

    struct Article {
        author: &'static str,
    }

    impl Resource for Article {
        fn as_entity(&self) -> Option<&dyn Entity> {
            Some(self)
        }
    }

    impl Entity for Article {}

    struct ArticlesTable;

    impl Resource for ArticlesTable {
        fn as_repository(&self) -> Option<&dyn Repository> {
            Some(self)
        }
    }

    impl Repository for ArticlesTable {}

    struct ArticlesQuery {
        table: ArticlesTable,
    }

    impl Resource for ArticlesQuery {
        fn as_query(&self) -> Option<&dyn Query> {
            Some(self)
        }
    }

    impl Query for ArticlesQuery {
        fn repository(&self) -> &dyn Repository {
            &self.table
        }
    }

    #[derive(Default)]
    struct ArticlePolicy;

    impl Policy for ArticlePolicy {}

    #[derive(Default)]
    struct TablePolicy;

    impl Policy for TablePolicy {}

    struct AuthorPolicy {
        author: &'static str,
    }

    impl Policy for AuthorPolicy {}

    fn article() -> Article {
        Article { author: "ann" }
    }

    #[test]
    fn class_descriptor_constructs_a_new_policy_each_time() {
        let resolver =
            PolicyResolver::new().with::<Article>(PolicyDescriptor::class::<ArticlePolicy>());

        let first = resolver.resolve(&article()).unwrap();
        let second = resolver.resolve(&article()).unwrap();

        assert!(first.is::<ArticlePolicy>());
        assert!(second.is::<ArticlePolicy>());
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn instance_descriptor_returns_the_shared_policy() {
        let shared: PolicyRef = Arc::new(TablePolicy);
        let resolver =
            PolicyResolver::new().with::<Article>(PolicyDescriptor::shared(Arc::clone(&shared)));

        let first = resolver.resolve(&article()).unwrap();
        let second = resolver.resolve(&Article { author: "bob" }).unwrap();

        assert!(Arc::ptr_eq(&first, &shared));
        assert!(Arc::ptr_eq(&second, &shared));
    }

    #[test]
    fn factory_receives_the_resource_and_resolver() {
        let resolver = PolicyResolver::new()
            .with::<ArticlesTable>(PolicyDescriptor::class::<TablePolicy>())
            .with::<Article>(PolicyDescriptor::factory(|resource, resolver| {
                assert!(resolver.is_registered::<ArticlesTable>());
                let author = resource
                    .as_any()
                    .downcast_ref::<Article>()
                    .map_or("", |a| a.author);
                Arc::new(AuthorPolicy { author })
            }));

        let policy = resolver.resolve(&Article { author: "cid" }).unwrap();
        assert_eq!(
            policy.downcast_ref::<AuthorPolicy>().map(|p| p.author),
            Some("cid")
        );
    }

    #[test]
    fn query_resolves_through_its_repository() {
        let resolver =
            PolicyResolver::new().with::<ArticlesTable>(PolicyDescriptor::class::<TablePolicy>());

        let query = ArticlesQuery {
            table: ArticlesTable,
        };
        assert_eq!(classify(&query).kind, ResourceKind::Query);

        let via_query = resolver.resolve(&query).unwrap();
        let via_table = resolver.resolve(&ArticlesTable).unwrap();
        assert!(via_query.is::<TablePolicy>());
        assert!(via_table.is::<TablePolicy>());
    }

    #[test]
    fn query_type_is_never_a_key_of_its_own() {
        let resolver =
            PolicyResolver::new().with::<ArticlesQuery>(PolicyDescriptor::class::<ArticlePolicy>());

        let query = ArticlesQuery {
            table: ArticlesTable,
        };
        let Err(err) = resolver.resolve(&query) else {
            panic!("query must not resolve through its own type");
        };
        match err {
            PolicyResolverError::MissingPolicy { resource, key } => {
                assert_eq!(resource, ResourceKey::of::<ArticlesQuery>());
                assert_eq!(key, ResourceKey::of::<ArticlesTable>());
            }
            other => panic!("expected MissingPolicy, got: {other}"),
        }
    }

    #[test]
    fn unregistered_resource_is_missing_policy() {
        let Err(err) = PolicyResolver::new().resolve(&article()) else {
            panic!("empty resolver must not resolve");
        };
        assert!(err.is_missing_policy());
        assert!(err.to_string().contains("Article"));
    }

    #[test]
    #[traced_test]
    fn later_registration_replaces_earlier_one() {
        let mut resolver = PolicyResolver::new();
        assert!(resolver.is_empty());
        resolver
            .register::<Article>(PolicyDescriptor::class::<ArticlePolicy>())
            .register::<Article>(PolicyDescriptor::class::<TablePolicy>());

        assert_eq!(resolver.len(), 1);
        assert!(resolver.contains(&ResourceKey::of::<Article>()));
        assert!(resolver.resolve(&article()).unwrap().is::<TablePolicy>());
        assert!(logs_contain("Replacing registered policy"));
    }

    #[test]
    fn resolve_any_rejects_non_resources() {
        let resolver =
            PolicyResolver::new().with::<Article>(PolicyDescriptor::class::<ArticlePolicy>());

        let owned = String::from("article");
        let values: [&(dyn Any + 'static); 4] = [&42_i32, &"article", &owned, &true];
        for value in values {
            assert!(matches!(
                resolver.resolve_any(value),
                Err(PolicyResolverError::InvalidArgument(_))
            ));
        }

        assert!(resolver.resolve_any(&article()).unwrap().is::<ArticlePolicy>());
    }

    #[test]
    fn resolve_any_needs_accept_for_query_types() {
        let mut resolver =
            PolicyResolver::new().with::<ArticlesTable>(PolicyDescriptor::class::<TablePolicy>());
        let query = ArticlesQuery {
            table: ArticlesTable,
        };

        assert!(matches!(
            resolver.resolve_any(&query),
            Err(PolicyResolverError::InvalidArgument(_))
        ));

        resolver.accept::<ArticlesQuery>();
        assert!(resolver.resolve_any(&query).unwrap().is::<TablePolicy>());
        assert!(!resolver.is_registered::<ArticlesQuery>());
    }

    #[test]
    fn key_registration_resolves_but_needs_accept_for_any() {
        let mut resolver = PolicyResolver::new();
        resolver.register_key(
            ResourceKey::of::<Article>(),
            PolicyDescriptor::class::<ArticlePolicy>(),
        );

        assert!(resolver.resolve(&article()).unwrap().is::<ArticlePolicy>());
        assert!(matches!(
            resolver.resolve_any(&article()),
            Err(PolicyResolverError::InvalidArgument(_))
        ));

        resolver.accept::<Article>();
        assert!(resolver.resolve_any(&article()).unwrap().is::<ArticlePolicy>());
    }
}
