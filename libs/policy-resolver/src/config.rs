//! Configuration for the policy resolver.
//!
//! ```yaml
//! policies:
//!   Article: ArticlePolicy            # class, constructed per resolution
//!   Comments:
//!     instance: shared_comments       # shared instance from the catalog
//!   Users:
//!     factory: users_by_tenant        # factory from the catalog
//! conventions:
//!   enabled: true
//!   suffix: Policy
//! ```
//!
//! Every entry may be overridden from the environment, e.g.
//! `POLICY_RESOLVER__POLICIES__ARTICLE=ReadOnlyPolicy`. Environment keys are
//! lower-cased, which is why catalog names are matched case-insensitively.
//! An environment entry replaces the file entry for the same resource as a
//! whole, so it may change the shape of the spec.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use figment::Figment;
use figment::providers::{Env, Format, Yaml};
use policy_resolver_sdk::{PolicyResolverError, Result};
use serde::Deserialize;
use serde::de::{self, DeserializeOwned, Deserializer, MapAccess, Visitor};
use tracing::{debug, warn};

/// Prefix of environment variables merged over the configuration file.
pub const ENV_PREFIX: &str = "POLICY_RESOLVER__";

/// Configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PolicyResolverConfig {
    /// Resource name to policy. Applied in key order.
    pub policies: BTreeMap<String, PolicySpec>,

    /// Naming-convention fallback for resources without an explicit entry.
    pub conventions: ConventionConfig,
}

/// Naming-convention fallback settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConventionConfig {
    pub enabled: bool,

    /// Appended to the resource's short type name to form the policy name.
    pub suffix: String,
}

impl Default for ConventionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            suffix: "Policy".to_owned(),
        }
    }
}

/// Policy side of a configured entry.
///
/// A bare string names a policy class; a single-key map `{ instance: name }`
/// or `{ factory: name }` names a shared instance or a factory registered in
/// the catalog. Nothing else is accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicySpec {
    Class(String),
    Instance(InstanceSpec),
    Factory(FactorySpec),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceSpec {
    pub instance: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactorySpec {
    pub factory: String,
}

const SPEC_KEYS: &[&str] = &["instance", "factory"];

struct PolicySpecVisitor;

impl<'de> Visitor<'de> for PolicySpecVisitor {
    type Value = PolicySpec;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a policy class name, `{ instance: <name> }` or `{ factory: <name> }`")
    }

    fn visit_str<E: de::Error>(self, name: &str) -> std::result::Result<PolicySpec, E> {
        Ok(PolicySpec::class(name))
    }

    fn visit_map<A: MapAccess<'de>>(
        self,
        mut map: A,
    ) -> std::result::Result<PolicySpec, A::Error> {
        let Some((kind, name)) = map.next_entry::<String, String>()? else {
            return Err(de::Error::invalid_length(0, &self));
        };
        if let Some(extra) = map.next_key::<String>()? {
            return Err(de::Error::custom(format!(
                "`{extra}` given together with `{kind}`; expected exactly one"
            )));
        }

        match kind.as_str() {
            "instance" => Ok(PolicySpec::instance(name)),
            "factory" => Ok(PolicySpec::factory(name)),
            other => Err(de::Error::unknown_field(other, SPEC_KEYS)),
        }
    }
}

impl<'de> Deserialize<'de> for PolicySpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_any(PolicySpecVisitor)
    }
}

impl PolicySpec {
    #[must_use]
    pub fn class(name: impl Into<String>) -> Self {
        Self::Class(name.into())
    }

    #[must_use]
    pub fn instance(name: impl Into<String>) -> Self {
        Self::Instance(InstanceSpec {
            instance: name.into(),
        })
    }

    #[must_use]
    pub fn factory(name: impl Into<String>) -> Self {
        Self::Factory(FactorySpec {
            factory: name.into(),
        })
    }
}

/// Environment layer: every field optional, so only what is set overrides.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct EnvOverrides {
    policies: BTreeMap<String, PolicySpec>,
    conventions: ConventionOverrides,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConventionOverrides {
    enabled: Option<bool>,
    suffix: Option<String>,
}

fn extract<T: DeserializeOwned>(figment: &Figment) -> Result<T> {
    figment
        .extract()
        .map_err(|e| PolicyResolverError::InvalidConfiguration(e.to_string()))
}

fn lowercase_keys(policies: BTreeMap<String, PolicySpec>) -> BTreeMap<String, PolicySpec> {
    let mut lowered = BTreeMap::new();
    for (resource, spec) in policies {
        let key = resource.to_ascii_lowercase();
        if lowered.insert(key, spec).is_some() {
            warn!(
                resource = %resource,
                "Policy entry repeated with different case; last one wins"
            );
        }
    }
    lowered
}

impl PolicyResolverConfig {
    fn apply(&mut self, overrides: EnvOverrides) {
        for (resource, spec) in overrides.policies {
            debug!(resource = %resource, "Policy entry overridden from environment");
            self.policies.insert(resource.to_ascii_lowercase(), spec);
        }
        if let Some(enabled) = overrides.conventions.enabled {
            self.conventions.enabled = enabled;
        }
        if let Some(suffix) = overrides.conventions.suffix {
            self.conventions.suffix = suffix;
        }
    }
}

/// Load the configuration from an optional YAML file, with `POLICY_RESOLVER__*`
/// environment variables applied on top.
///
/// Policy keys come back lower-cased. Each environment entry replaces the
/// file entry for the same resource instead of merging into it.
///
/// # Errors
///
/// - [`PolicyResolverError::InvalidConfiguration`] if `path` is not a file,
///   or the file or the environment does not match [`PolicyResolverConfig`]
pub fn load_config(path: Option<&Path>) -> Result<PolicyResolverConfig> {
    let mut config = match path {
        Some(path) => {
            if !path.is_file() {
                return Err(PolicyResolverError::InvalidConfiguration(format!(
                    "configuration file '{}' not found",
                    path.display()
                )));
            }
            extract::<PolicyResolverConfig>(&Figment::from(Yaml::file(path)))?
        }
        None => PolicyResolverConfig::default(),
    };
    config.policies = lowercase_keys(config.policies);

    let overrides = extract(&Figment::from(Env::prefixed(ENV_PREFIX).split("__")))?;
    config.apply(overrides);
    Ok(config)
}

/// Parse a configuration from a YAML document, ignoring the environment.
/// Keys are kept as written.
///
/// # Errors
///
/// - [`PolicyResolverError::InvalidConfiguration`] if the document does not
///   match [`PolicyResolverConfig`]
pub fn parse_config(yaml: &str) -> Result<PolicyResolverConfig> {
    extract(&Figment::from(Yaml::string(yaml)))
}
