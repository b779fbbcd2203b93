//! Transformation policies
//!
//! A [`Policy`] decides what replaces a PII span. Policies are selected per
//! PII type through a [`PolicyMap`], falling back to a default policy.

use super::synthetic;
use crate::config::schema::TransformConfig;
use crate::config::secret::{secret_string, SecretString};
use crate::domain::ids::PiiType;
use crate::domain::pii::PiiInstance;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Names accepted by [`Policy::from_parts`]
pub const POLICY_NAMES: [&str; 9] = [
    "passthrough",
    "redact",
    "mask",
    "label",
    "annotate",
    "placeholder",
    "synthetic",
    "hash",
    "custom",
];

/// Replacement rule for a PII span
#[derive(Clone, Debug)]
pub enum Policy {
    /// Leave the value untouched
    Passthrough,
    /// Replace with a generic `<PII>` token
    Redact,
    /// Replace every non-whitespace character with `*`
    Mask,
    /// Replace with the type tag, e.g. `<PERSON>`
    Label,
    /// Keep the value, tagged with its type, e.g. `<PERSON:John>`
    Annotate,
    /// Replace with a fixed dummy value per type
    Placeholder,
    /// Replace with a generated value, stable per original value
    Synthetic,
    /// Replace with a keyed hash of the value
    Hash {
        /// HMAC-style key mixed into the digest
        key: SecretString,
    },
    /// Replace using a template with `{name}` and `{value}` fields
    Custom {
        /// Template text
        template: String,
    },
}

impl Policy {
    /// Builds a policy from its name and optional parameter
    ///
    /// The parameter is the key for `hash` and the template for `custom`; both
    /// are required for those policies and ignored for the rest.
    pub fn from_parts(name: &str, param: Option<String>) -> Result<Self, String> {
        let policy = match name.trim().to_ascii_lowercase().as_str() {
            "passthrough" => Policy::Passthrough,
            "redact" => Policy::Redact,
            "mask" => Policy::Mask,
            "label" => Policy::Label,
            "annotate" => Policy::Annotate,
            "placeholder" => Policy::Placeholder,
            "synthetic" => Policy::Synthetic,
            "hash" => match param {
                Some(key) if !key.is_empty() => Policy::Hash {
                    key: secret_string(key),
                },
                _ => return Err("policy 'hash' needs a key".to_string()),
            },
            "custom" => match param {
                Some(template) if !template.is_empty() => Policy::Custom { template },
                _ => return Err("policy 'custom' needs a template".to_string()),
            },
            other => {
                return Err(format!(
                    "Unknown policy '{other}'. Must be one of: {}",
                    POLICY_NAMES.join(", ")
                ))
            }
        };
        Ok(policy)
    }

    /// Policy name
    pub fn name(&self) -> &'static str {
        match self {
            Policy::Passthrough => "passthrough",
            Policy::Redact => "redact",
            Policy::Mask => "mask",
            Policy::Label => "label",
            Policy::Annotate => "annotate",
            Policy::Placeholder => "placeholder",
            Policy::Synthetic => "synthetic",
            Policy::Hash { .. } => "hash",
            Policy::Custom { .. } => "custom",
        }
    }

    /// Computes the replacement text for one instance
    pub fn apply(&self, instance: &PiiInstance, placeholder: Option<&str>) -> String {
        let tag = instance.pii_type.as_str();
        let value = instance.value.as_str();
        match self {
            Policy::Passthrough => value.to_string(),
            Policy::Redact => "<PII>".to_string(),
            Policy::Mask => value
                .chars()
                .map(|c| if c.is_whitespace() { c } else { '*' })
                .collect(),
            Policy::Label => format!("<{tag}>"),
            Policy::Annotate => format!("<{tag}:{value}>"),
            Policy::Placeholder => placeholder
                .map(str::to_string)
                .unwrap_or_else(|| default_placeholder(&instance.pii_type)),
            Policy::Synthetic => synthetic::synthesize(&instance.pii_type, value),
            Policy::Hash { key } => {
                let mut hasher = Sha256::new();
                hasher.update(key.expose_secret().as_str().as_bytes());
                hasher.update([0u8]);
                hasher.update(value.as_bytes());
                let digest = format!("{:x}", hasher.finalize());
                format!("{tag}_{}", &digest[..16])
            }
            Policy::Custom { template } => template.replace("{name}", tag).replace("{value}", value),
        }
    }
}

impl PartialEq for Policy {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Policy::Hash { key: a }, Policy::Hash { key: b }) => {
                a.expose_secret().as_str() == b.expose_secret().as_str()
            }
            (Policy::Custom { template: a }, Policy::Custom { template: b }) => a == b,
            (a, b) => a.name() == b.name(),
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Policy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_parts(s, None)
    }
}

/// Wire form of a policy: a bare name or an object with parameters
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum PolicyRepr {
    Name(String),
    Detailed {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        key: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        template: Option<String>,
    },
}

impl<'de> Deserialize<'de> for Policy {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let repr = PolicyRepr::deserialize(deserializer)?;
        let policy = match repr {
            PolicyRepr::Name(name) => Policy::from_parts(&name, None),
            PolicyRepr::Detailed {
                name,
                key,
                template,
            } => Policy::from_parts(&name, key.or(template)),
        };
        policy.map_err(serde::de::Error::custom)
    }
}

// Keys are never serialized.
impl Serialize for Policy {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let repr = match self {
            Policy::Custom { template } => PolicyRepr::Detailed {
                name: self.name().to_string(),
                key: None,
                template: Some(template.clone()),
            },
            _ => PolicyRepr::Name(self.name().to_string()),
        };
        repr.serialize(serializer)
    }
}

/// Dummy value used by the `placeholder` policy when none is configured
pub fn default_placeholder(pii_type: &PiiType) -> String {
    match pii_type.as_str() {
        "PERSON" => "Jane Doe".to_string(),
        "LOCATION" => "Springfield".to_string(),
        "ORGANIZATION" => "ACME Corp".to_string(),
        "EMAIL_ADDRESS" => "user@example.com".to_string(),
        "PHONE_NUMBER" => "555-0100".to_string(),
        "IP_ADDRESS" => "192.0.2.1".to_string(),
        "URL" => "https://example.com".to_string(),
        other => format!("[{other}]"),
    }
}

/// Effective per-type policy map
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyMap {
    default: Policy,
    overrides: BTreeMap<PiiType, Policy>,
    placeholders: BTreeMap<PiiType, String>,
}

impl PolicyMap {
    /// Creates a map applying `default` to every type
    pub fn new(default: Policy) -> Self {
        Self {
            default,
            overrides: BTreeMap::new(),
            placeholders: BTreeMap::new(),
        }
    }

    /// Resolves the map from the transform section
    ///
    /// An explicit default wins over `transform.default_policy`, which wins
    /// over `label`.
    pub fn resolve(config: &TransformConfig, explicit_default: Option<&Policy>) -> Self {
        let default = explicit_default
            .or(config.default_policy.as_ref())
            .cloned()
            .unwrap_or(Policy::Label);
        Self {
            default,
            overrides: config.policy.clone(),
            placeholders: config.placeholder.clone(),
        }
    }

    /// Adds a per-type override
    pub fn with_override(mut self, pii_type: PiiType, policy: Policy) -> Self {
        self.overrides.insert(pii_type, policy);
        self
    }

    /// Default policy
    pub fn default_policy(&self) -> &Policy {
        &self.default
    }

    /// Policy applied to `pii_type`
    pub fn policy_for(&self, pii_type: &PiiType) -> &Policy {
        self.overrides.get(pii_type).unwrap_or(&self.default)
    }

    /// Configured placeholder for `pii_type`
    pub fn placeholder_for(&self, pii_type: &PiiType) -> Option<&str> {
        self.placeholders.get(pii_type).map(String::as_str)
    }

    /// Replacement text for one instance
    pub fn replacement(&self, instance: &PiiInstance) -> String {
        self.policy_for(&instance.pii_type)
            .apply(instance, self.placeholder_for(&instance.pii_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ids::TaskId;
    use serde_json::json;
    use test_case::test_case;

    fn person(value: &str) -> PiiInstance {
        PiiInstance::new(
            PiiType::PERSON,
            value,
            0,
            value.len(),
            TaskId::new("test").unwrap(),
        )
    }

    #[test_case(Policy::Passthrough, "John Smith" ; "passthrough")]
    #[test_case(Policy::Redact, "<PII>" ; "redact")]
    #[test_case(Policy::Mask, "**** *****" ; "mask")]
    #[test_case(Policy::Label, "<PERSON>" ; "label")]
    #[test_case(Policy::Annotate, "<PERSON:John Smith>" ; "annotate")]
    #[test_case(Policy::Placeholder, "Jane Doe" ; "placeholder")]
    fn test_apply(policy: Policy, expected: &str) {
        assert_eq!(policy.apply(&person("John Smith"), None), expected);
    }

    #[test]
    fn test_custom_template() {
        let policy = Policy::from_parts("custom", Some("[{name}]".to_string())).unwrap();
        assert_eq!(policy.apply(&person("John"), None), "[PERSON]");
    }

    #[test]
    fn test_hash_is_keyed_and_stable() {
        let a = Policy::from_parts("hash", Some("k1".to_string())).unwrap();
        let b = Policy::from_parts("hash", Some("k2".to_string())).unwrap();
        let first = a.apply(&person("John"), None);
        assert_eq!(first, a.apply(&person("John"), None));
        assert_ne!(first, b.apply(&person("John"), None));
        assert!(first.starts_with("PERSON_"));
        assert_eq!(first.len(), "PERSON_".len() + 16);
    }

    #[test]
    fn test_parameter_required() {
        assert!(Policy::from_parts("hash", None).is_err());
        assert!(Policy::from_parts("custom", Some(String::new())).is_err());
        assert!(Policy::from_parts("shred", None).is_err());
    }

    #[test]
    fn test_deserialize_forms() {
        let p: Policy = serde_json::from_value(json!("MASK")).unwrap();
        assert_eq!(p, Policy::Mask);

        let p: Policy = serde_json::from_value(json!({"name": "custom", "template": "X"})).unwrap();
        assert_eq!(
            p,
            Policy::Custom {
                template: "X".to_string()
            }
        );

        assert!(serde_json::from_value::<Policy>(json!({"name": "hash"})).is_err());
    }

    #[test]
    fn test_hash_key_not_serialized() {
        let p = Policy::from_parts("hash", Some("topsecret".to_string())).unwrap();
        let out = serde_json::to_string(&p).unwrap();
        assert_eq!(out, "\"hash\"");
        assert!(!format!("{p:?}").contains("topsecret"));
    }

    #[test]
    fn test_policy_map_precedence() {
        let config: TransformConfig = serde_json::from_value(json!({
            "default_policy": "mask",
            "policy": {"email_address": "redact"},
            "placeholder": {"PERSON": "Someone"}
        }))
        .unwrap();

        let map = PolicyMap::resolve(&config, None);
        assert_eq!(map.default_policy(), &Policy::Mask);
        assert_eq!(map.policy_for(&PiiType::EMAIL_ADDRESS), &Policy::Redact);
        assert_eq!(map.placeholder_for(&PiiType::PERSON), Some("Someone"));

        let map = PolicyMap::resolve(&config, Some(&Policy::Annotate));
        assert_eq!(map.default_policy(), &Policy::Annotate);

        let map = PolicyMap::resolve(&TransformConfig::default(), None);
        assert_eq!(map.default_policy(), &Policy::Label);
    }
}
