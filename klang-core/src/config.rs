//! Backend configuration node.
//!
//! A control backend is described by a small config node with a `type` tag
//! and a `card` reference. Card names are resolved to indices by an external
//! [`CardResolver`]; this module never parses configuration syntax itself.

use crate::error::{CtlError, Result};
use serde::{Deserialize, Serialize};

/// Reference to a card, either by index or by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CardRef {
    Index(u32),
    Name(String),
}

/// Configuration node for the hardware control backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CtlConfig {
    /// Backend tag; must equal [`CtlConfig::BACKEND_TAG`].
    #[serde(rename = "type")]
    pub backend: String,
    /// Card to open.
    pub card: CardRef,
}

/// Resolves a card name to its numeric index.
pub trait CardResolver {
    fn resolve(&self, name: &str) -> Result<u32>;
}

impl CtlConfig {
    /// Tag identifying this backend in configuration trees.
    pub const BACKEND_TAG: &'static str = "hw";

    /// Validate the backend tag and resolve the card reference to an index.
    pub fn resolve_card(&self, resolver: &dyn CardResolver) -> Result<u32> {
        if self.backend != Self::BACKEND_TAG {
            return Err(CtlError::InvalidConfig {
                reason: format!("backend type '{}' is not '{}'", self.backend, Self::BACKEND_TAG),
            });
        }
        match &self.card {
            CardRef::Index(index) => Ok(*index),
            CardRef::Name(name) => resolver.resolve(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedResolver;

    impl CardResolver for FixedResolver {
        fn resolve(&self, name: &str) -> Result<u32> {
            match name {
                "Intel" => Ok(2),
                _ => Err(CtlError::InvalidConfig { reason: format!("unknown card '{}'", name) }),
            }
        }
    }

    #[test]
    fn test_numeric_card_accepted() {
        let config: CtlConfig = serde_json::from_str(r#"{"type": "hw", "card": 1}"#).unwrap();
        assert_eq!(config.card, CardRef::Index(1));
        assert_eq!(config.resolve_card(&FixedResolver).unwrap(), 1);
    }

    #[test]
    fn test_named_card_resolved() {
        let config: CtlConfig = serde_json::from_str(r#"{"type": "hw", "card": "Intel"}"#).unwrap();
        assert_eq!(config.resolve_card(&FixedResolver).unwrap(), 2);
    }

    #[test]
    fn test_unknown_card_name_rejected() {
        let config = CtlConfig { backend: "hw".into(), card: CardRef::Name("nope".into()) };
        assert!(matches!(
            config.resolve_card(&FixedResolver),
            Err(CtlError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_wrong_backend_tag_rejected() {
        let config = CtlConfig { backend: "shm".into(), card: CardRef::Index(0) };
        assert!(matches!(
            config.resolve_card(&FixedResolver),
            Err(CtlError::InvalidConfig { .. })
        ));
    }
}
