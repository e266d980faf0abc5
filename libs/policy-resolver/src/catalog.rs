//! Named types available to configuration-driven registration.
//!
//! Configuration refers to resources and policies by name. The catalog is the
//! table those names are looked up in: only types the application put into it
//! can be referenced, so an unknown name is rejected at registration instead
//! of surfacing at the first resolution.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::sync::Arc;

use policy_resolver_sdk::{Policy, PolicyRef, PolicyResolverError, Resource, ResourceKey, Result};

use crate::config::{FactorySpec, InstanceSpec, PolicySpec};
use crate::descriptor::{ClassRef, PolicyDescriptor, PolicyFactory};
use crate::resolver::PolicyResolver;

/// Recovers a `&dyn Resource` from a value of one specific resource type.
type ResourceView = for<'a> fn(&'a (dyn Any + 'static)) -> Option<&'a dyn Resource>;

fn view<'a, R: Resource>(value: &'a (dyn Any + 'static)) -> Option<&'a dyn Resource> {
    value.downcast_ref::<R>().map(|r| r as &dyn Resource)
}

/// Resource types a dynamically typed value may be recognized as.
#[derive(Default, Clone)]
pub(crate) struct ResourceViews(HashMap<TypeId, ResourceView>);

impl ResourceViews {
    pub(crate) fn accept<R: Resource>(&mut self) {
        self.0.insert(TypeId::of::<R>(), view::<R>);
    }

    pub(crate) fn insert(&mut self, resource: &CatalogResource) {
        self.0.insert(resource.key.type_id(), resource.view);
    }

    pub(crate) fn extend_from(&mut self, catalog: &TypeCatalog) {
        for resource in catalog.resources() {
            self.insert(resource);
        }
    }

    /// # Errors
    ///
    /// - [`PolicyResolverError::InvalidArgument`] if the value's type is not
    ///   one of the accepted resource types
    pub(crate) fn recover<'a>(
        &self,
        value: &'a (dyn Any + 'static),
    ) -> Result<&'a dyn Resource> {
        self.0
            .get(&value.type_id())
            .and_then(|recover| recover(value))
            .ok_or_else(|| {
                PolicyResolverError::InvalidArgument(
                    "value is not of a registered resource type".to_owned(),
                )
            })
    }
}

/// A resource type known to the catalog.
#[derive(Clone, Copy)]
pub struct CatalogResource {
    key: ResourceKey,
    view: ResourceView,
}

impl CatalogResource {
    fn of<R: Resource>() -> Self {
        Self {
            key: ResourceKey::of::<R>(),
            view: view::<R>,
        }
    }

    #[must_use]
    pub fn key(&self) -> ResourceKey {
        self.key
    }

}

impl fmt::Debug for CatalogResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CatalogResource").field(&self.key).finish()
    }
}

/// Name-to-type table for resources, policy classes, shared policy instances
/// and policy factories.
///
/// Names are matched ASCII case-insensitively.
#[derive(Default, Clone)]
pub struct TypeCatalog {
    resources: HashMap<String, CatalogResource>,
    classes: HashMap<String, ClassRef>,
    instances: HashMap<String, PolicyRef>,
    factories: HashMap<String, PolicyFactory>,
}

fn normalize(name: &str) -> String {
    name.to_ascii_lowercase()
}

fn insert_named<V>(table: &mut HashMap<String, V>, what: &str, name: &str, value: V) {
    match table.entry(normalize(name)) {
        Entry::Occupied(mut slot) => {
            tracing::warn!(kind = what, name, "Replacing catalog entry");
            slot.insert(value);
        }
        Entry::Vacant(slot) => {
            slot.insert(value);
        }
    }
}

impl TypeCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make resource type `R` available under `name`.
    #[must_use]
    pub fn with_resource<R: Resource>(mut self, name: &str) -> Self {
        insert_named(
            &mut self.resources,
            "resource",
            name,
            CatalogResource::of::<R>(),
        );
        self
    }

    /// Make policy class `P` available under `name`.
    #[must_use]
    pub fn with_policy_class<P: Policy + Default>(mut self, name: &str) -> Self {
        insert_named(&mut self.classes, "class", name, ClassRef::of::<P>());
        self
    }

    /// Make a shared policy instance available under `name`.
    #[must_use]
    pub fn with_policy_instance(mut self, name: &str, policy: PolicyRef) -> Self {
        insert_named(&mut self.instances, "instance", name, policy);
        self
    }

    /// Make a policy factory available under `name`.
    #[must_use]
    pub fn with_policy_factory<F>(mut self, name: &str, factory: F) -> Self
    where
        F: Fn(&dyn Resource, &PolicyResolver) -> PolicyRef + Send + Sync + 'static,
    {
        let factory: PolicyFactory = Arc::new(factory);
        insert_named(&mut self.factories, "factory", name, factory);
        self
    }

    #[must_use]
    pub fn resource(&self, name: &str) -> Option<&CatalogResource> {
        self.resources.get(&normalize(name))
    }

    /// All resource types in the catalog, in no particular order.
    pub fn resources(&self) -> impl Iterator<Item = &CatalogResource> {
        self.resources.values()
    }

    #[must_use]
    pub fn policy_class(&self, name: &str) -> Option<ClassRef> {
        self.classes.get(&normalize(name)).copied()
    }

    /// Turn a configured policy spec into a descriptor.
    ///
    /// # Errors
    ///
    /// - [`PolicyResolverError::InvalidConfiguration`] if the spec names a
    ///   class, instance or factory that is not in the catalog
    pub fn descriptor(&self, spec: &PolicySpec) -> Result<PolicyDescriptor> {
        let found = match spec {
            PolicySpec::Class(name) => self.policy_class(name).map(PolicyDescriptor::Class),
            PolicySpec::Instance(InstanceSpec { instance }) => self
                .instances
                .get(&normalize(instance))
                .cloned()
                .map(PolicyDescriptor::Instance),
            PolicySpec::Factory(FactorySpec { factory }) => self
                .factories
                .get(&normalize(factory))
                .cloned()
                .map(PolicyDescriptor::Factory),
        };

        found.ok_or_else(|| {
            let (kind, name) = match spec {
                PolicySpec::Class(name) => ("policy class", name),
                PolicySpec::Instance(InstanceSpec { instance }) => ("policy instance", instance),
                PolicySpec::Factory(FactorySpec { factory }) => ("policy factory", factory),
            };
            PolicyResolverError::InvalidConfiguration(format!("unknown {kind} '{name}'"))
        })
    }
}

impl fmt::Debug for TypeCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeCatalog")
            .field("resources", &self.resources)
            .field("classes", &self.classes)
            .field("instances", &self.instances.keys().collect::<Vec<_>>())
            .field("factories", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}
