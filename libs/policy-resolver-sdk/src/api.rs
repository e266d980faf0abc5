//! Public resolver API.

use crate::error::Result;
use crate::policy::PolicyRef;
use crate::resource::Resource;

/// Anything that can select a policy for a resource.
///
/// Implemented by the map-based resolver, the naming-convention resolver and
/// the chain that combines them, so consumers depend on this trait only:
///
/// ```ignore
/// let resolver: Arc<dyn Resolver> = Arc::new(build_resolver(catalog, &config)?);
///
/// let policy = resolver.policy_for(&article)?;
/// let policy = policy.downcast_ref::<ArticlePolicy>().ok_or(...)?;
/// ```
pub trait Resolver: Send + Sync {
    /// Select the policy for `resource`.
    ///
    /// # Errors
    ///
    /// - [`PolicyResolverError::MissingPolicy`](crate::PolicyResolverError::MissingPolicy)
    ///   if this resolver has no policy for the resource
    fn policy_for(&self, resource: &dyn Resource) -> Result<PolicyRef>;
}
