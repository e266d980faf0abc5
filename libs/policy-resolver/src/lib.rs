#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Policy Resolver
//!
//! Maps resources to the authorization policy that governs them.
//!
//! - [`PolicyResolver`] - registry from resource type to [`PolicyDescriptor`]
//! - [`TypeCatalog`] - named resource and policy types for configuration
//! - [`PolicyResolverConfig`], [`load_config`] - YAML/env configuration
//! - [`ConventionResolver`] - `Article` → `ArticlePolicy` fallback
//! - [`ResolverChain`], [`build_resolver`] - ordered combination of resolvers
//!
//! ## Configuration
//!
//! ```yaml
//! policies:
//!   Article: ArticlePolicy
//!   Comments:
//!     instance: shared_comments
//! conventions:
//!   enabled: true
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let catalog = Arc::new(
//!     TypeCatalog::new()
//!         .with_resource::<Article>("Article")
//!         .with_resource::<CommentsTable>("Comments")
//!         .with_policy_class::<ArticlePolicy>("ArticlePolicy")
//!         .with_policy_instance("shared_comments", Arc::new(CommentsPolicy::default())),
//! );
//!
//! let resolver = build_resolver(catalog, &load_config(Some(path))?)?;
//! let policy = resolver.policy_for(&article)?;
//! ```

pub mod catalog;
pub mod chain;
pub mod config;
pub mod convention;
pub mod descriptor;
pub mod resolver;

pub use catalog::{CatalogResource, TypeCatalog};
pub use chain::{ResolverChain, build_resolver};
pub use config::{
    ConventionConfig, ENV_PREFIX, FactorySpec, InstanceSpec, PolicyResolverConfig, PolicySpec,
    load_config, parse_config,
};
pub use convention::ConventionResolver;
pub use descriptor::{ClassRef, PolicyDescriptor, PolicyFactory};
pub use resolver::PolicyResolver;
