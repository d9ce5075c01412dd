use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Deterministic chat-room id: lowercase hex SHA-256 of the entity id.
pub fn generate_chat_id(entity_id: &str) -> String {
    hex::encode(Sha256::digest(entity_id.as_bytes()))
}

/// A chat-room id derived from an entity id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatId(String);

impl ChatId {
    pub fn for_entity(entity_id: &str) -> Self {
        Self(generate_chat_id(entity_id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_known_digest() {
        assert_eq!(
            generate_chat_id("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    proptest! {
        #[test]
        fn prop_deterministic_and_hex(id in ".*") {
            let a = generate_chat_id(&id);
            prop_assert_eq!(&a, &generate_chat_id(&id));
            prop_assert_eq!(a.len(), 64);
            prop_assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        }
    }
}
