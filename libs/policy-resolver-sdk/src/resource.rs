//! Resource capabilities consumed by the policy resolver.
//!
//! A [`Resource`] is any domain object an authorization decision may be
//! requested for. The host data-access layer may additionally expose one of
//! three capabilities on it:
//!
//! - [`Entity`] - a single domain record
//! - [`Repository`] - a collection/table abstraction
//! - [`Query`] - a lazy request bound to exactly one [`Repository`]
//!
//! The resolver only tests capability membership and, for queries, asks for
//! the bound repository. Everything else about these objects is opaque here.

use std::any::{Any, TypeId, type_name};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Runtime identity of a concrete resource type.
///
/// Equality and hashing use only the [`TypeId`]; the type name is carried for
/// diagnostics.
#[derive(Clone, Copy)]
pub struct ResourceKey {
    id: TypeId,
    name: &'static str,
}

impl ResourceKey {
    /// Key of the concrete type `T`.
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.id
    }

    /// Fully qualified type name, e.g. `app::model::Article`.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Last path segment of the type name with generic arguments stripped.
    ///
    /// `app::model::Article` becomes `Article`, `app::Paged<app::Article>`
    /// becomes `Paged`.
    #[must_use]
    pub fn short_name(&self) -> &'static str {
        let base = self.name.split('<').next().unwrap_or(self.name);
        base.rsplit("::").next().unwrap_or(base)
    }
}

impl PartialEq for ResourceKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ResourceKey {}

impl Hash for ResourceKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ResourceKey").field(&self.name).finish()
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Runtime identity of a value, implemented for every `'static` type.
///
/// The blanket impl cannot be overridden, so the key reported through a
/// `&dyn Resource` is always the most-derived type of the value behind it.
pub trait ResourceIdentity: Any {
    /// Key of the concrete type of `self`.
    fn resource_key(&self) -> ResourceKey;

    /// `self` as [`Any`], for downcasting to the concrete type.
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> ResourceIdentity for T {
    fn resource_key(&self) -> ResourceKey {
        ResourceKey::of::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Key of the value behind a trait object.
///
/// Dispatches through the vtable rather than method-call autoref, so the
/// answer is the concrete type and never the reference type.
#[must_use]
pub fn key_of(resource: &dyn Resource) -> ResourceKey {
    <dyn Resource as ResourceIdentity>::resource_key(resource)
}

/// Any domain object an authorization decision may be requested for.
///
/// Plain resources implement this trait with no methods. Objects coming from
/// the data-access layer expose exactly one capability view:
///
/// ```
/// use policy_resolver_sdk::{Entity, Resource};
///
/// struct Article {
///     title: String,
/// }
///
/// impl Resource for Article {
///     fn as_entity(&self) -> Option<&dyn Entity> {
///         Some(self)
///     }
/// }
///
/// impl Entity for Article {}
/// ```
pub trait Resource: ResourceIdentity {
    /// Entity capability view.
    #[must_use]
    fn as_entity(&self) -> Option<&dyn Entity> {
        None
    }

    /// Repository capability view.
    #[must_use]
    fn as_repository(&self) -> Option<&dyn Repository> {
        None
    }

    /// Query capability view.
    #[must_use]
    fn as_query(&self) -> Option<&dyn Query> {
        None
    }
}

/// A single domain record.
pub trait Entity: Resource {}

/// A collection/table abstraction.
pub trait Repository: Resource {
    /// Registry alias of the repository, e.g. `Articles`.
    ///
    /// Defaults to the short type name.
    #[must_use]
    fn alias(&self) -> &str {
        self.resource_key().short_name()
    }
}

/// A lazy, composable request bound to exactly one repository.
pub trait Query: Resource {
    /// The repository this query reads from.
    fn repository(&self) -> &dyn Repository;
}

/// Capability a resource was classified under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Entity,
    Repository,
    Query,
    Plain,
}

impl ResourceKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Entity => "entity",
            Self::Repository => "repository",
            Self::Query => "query",
            Self::Plain => "plain",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of [`classify`]: the capability and the policy lookup key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub kind: ResourceKind,
    /// Key the policy is looked up under.
    pub key: ResourceKey,
    /// Concrete type of the classified resource itself.
    pub resource: ResourceKey,
}

/// Derive the policy lookup key for a resource.
///
/// Capabilities are checked in the order entity, repository, query. Entities,
/// repositories and plain objects are keyed by their own concrete type. A
/// query is keyed by the concrete type of the repository it is bound to, so
/// queries always share their repository's policy.
#[must_use]
pub fn classify(resource: &dyn Resource) -> Classification {
    let own = key_of(resource);

    let (kind, key) = if resource.as_entity().is_some() {
        (ResourceKind::Entity, own)
    } else if resource.as_repository().is_some() {
        (ResourceKind::Repository, own)
    } else if let Some(query) = resource.as_query() {
        let repository = query.repository();
        (
            ResourceKind::Query,
            <dyn Repository as ResourceIdentity>::resource_key(repository),
        )
    } else {
        (ResourceKind::Plain, own)
    };

    Classification {
        kind,
        key,
        resource: own,
    }
}
