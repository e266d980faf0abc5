//! Policy descriptors: what a resource type is mapped to.

use std::any::type_name;
use std::fmt;
use std::sync::Arc;

use policy_resolver_sdk::{Policy, PolicyAny, PolicyRef, Resource};

use crate::resolver::PolicyResolver;

/// Callable invoked on every resolution with the resource and the resolver.
pub type PolicyFactory = Arc<dyn Fn(&dyn Resource, &PolicyResolver) -> PolicyRef + Send + Sync>;

/// A named, default-constructible policy type.
#[derive(Clone, Copy)]
pub struct ClassRef {
    name: &'static str,
    construct: fn() -> PolicyRef,
}

impl ClassRef {
    #[must_use]
    pub fn of<P: Policy + Default>() -> Self {
        Self {
            name: type_name::<P>(),
            construct: construct_default::<P>,
        }
    }

    /// Fully qualified name of the policy type.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Construct a fresh policy with its no-argument constructor.
    #[must_use]
    pub fn instantiate(&self) -> PolicyRef {
        (self.construct)()
    }
}

impl fmt::Debug for ClassRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ClassRef").field(&self.name).finish()
    }
}

fn construct_default<P: Policy + Default>() -> PolicyRef {
    Arc::new(P::default())
}

/// Policy registered for a resource type.
#[derive(Clone)]
pub enum PolicyDescriptor {
    /// Construct a new policy on every resolution.
    Class(ClassRef),
    /// Hand out the same shared policy on every resolution.
    Instance(PolicyRef),
    /// Call the factory on every resolution and return its result as-is.
    Factory(PolicyFactory),
}

impl PolicyDescriptor {
    #[must_use]
    pub fn class<P: Policy + Default>() -> Self {
        Self::Class(ClassRef::of::<P>())
    }

    #[must_use]
    pub fn instance<P: Policy>(policy: P) -> Self {
        Self::Instance(Arc::new(policy))
    }

    /// Share an already allocated policy. Every resolution returns a clone of
    /// `policy`, pointing at the same allocation.
    #[must_use]
    pub fn shared(policy: PolicyRef) -> Self {
        Self::Instance(policy)
    }

    #[must_use]
    pub fn factory<F>(factory: F) -> Self
    where
        F: Fn(&dyn Resource, &PolicyResolver) -> PolicyRef + Send + Sync + 'static,
    {
        Self::Factory(Arc::new(factory))
    }

    /// Variant name, for logs.
    #[must_use]
    pub fn variant(&self) -> &'static str {
        match self {
            Self::Class(_) => "class",
            Self::Instance(_) => "instance",
            Self::Factory(_) => "factory",
        }
    }

    pub(crate) fn materialize(
        &self,
        resource: &dyn Resource,
        resolver: &PolicyResolver,
    ) -> PolicyRef {
        match self {
            Self::Class(class) => class.instantiate(),
            Self::Instance(policy) => Arc::clone(policy),
            Self::Factory(factory) => factory(resource, resolver),
        }
    }
}

impl fmt::Debug for PolicyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Class(class) => f.debug_tuple("Class").field(&class.name).finish(),
            Self::Instance(policy) => f
                .debug_tuple("Instance")
                .field(&<dyn Policy as PolicyAny>::policy_name(&**policy))
                .finish(),
            Self::Factory(_) => f.write_str("Factory(..)"),
        }
    }
}
