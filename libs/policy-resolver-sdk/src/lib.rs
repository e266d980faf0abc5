#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Policy Resolver SDK
//!
//! Shared vocabulary between resources, policies and resolvers:
//!
//! - [`Resource`], [`Entity`], [`Repository`], [`Query`] - capabilities a
//!   resource may expose
//! - [`classify`] - derives the policy lookup key for a resource
//! - [`Policy`], [`PolicyRef`] - the opaque policy handle produced by resolution
//! - [`Resolver`] - the lookup API
//! - [`PolicyResolverError`] - error taxonomy

pub mod api;
pub mod error;
pub mod policy;
pub mod resource;

pub use api::Resolver;
pub use error::{PolicyResolverError, Result};
pub use policy::{Policy, PolicyAny, PolicyRef, downcast_policy};
pub use resource::{
    Classification, Entity, Query, Repository, Resource, ResourceIdentity, ResourceKey,
    ResourceKind, classify, key_of,
};
