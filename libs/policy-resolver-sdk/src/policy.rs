//! The policy capability produced by resolution.
//!
//! Policies are opaque to the resolver: whatever a descriptor yields is handed
//! back to the caller unexamined. Callers that know the concrete type get it
//! back with [`downcast_policy`] or `<dyn Policy>::downcast_ref`.

use std::any::{Any, type_name};
use std::sync::Arc;

/// Shared handle to a resolved policy.
pub type PolicyRef = Arc<dyn Policy>;

/// Object-safe access to the concrete policy type, implemented for every
/// `Send + Sync + 'static` type.
pub trait PolicyAny: Any + Send + Sync {
    fn policy_any(&self) -> &dyn Any;

    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;

    /// Fully qualified name of the concrete policy type.
    fn policy_name(&self) -> &'static str;
}

impl<T: Any + Send + Sync> PolicyAny for T {
    fn policy_any(&self) -> &dyn Any {
        self
    }

    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }

    fn policy_name(&self) -> &'static str {
        type_name::<T>()
    }
}

/// Permission-check object for a resource.
///
/// The permission-check operations themselves live on the concrete policy
/// types; this trait only makes them resolvable and shareable.
pub trait Policy: PolicyAny {}

impl dyn Policy {
    /// Whether the concrete policy type is `P`.
    #[must_use]
    pub fn is<P: Policy>(&self) -> bool {
        <Self as PolicyAny>::policy_any(self).is::<P>()
    }

    /// Borrow the concrete policy if it is a `P`.
    #[must_use]
    pub fn downcast_ref<P: Policy>(&self) -> Option<&P> {
        <Self as PolicyAny>::policy_any(self).downcast_ref::<P>()
    }
}

/// Convert a resolved policy into its concrete type.
///
/// # Errors
///
/// Returns the original handle if the policy is not a `P`.
pub fn downcast_policy<P: Policy>(policy: PolicyRef) -> Result<Arc<P>, PolicyRef> {
    if !policy.is::<P>() {
        return Err(policy);
    }
    <dyn Policy as PolicyAny>::into_any_arc(Arc::clone(&policy))
        .downcast::<P>()
        .map_err(|_| policy)
}
