//! Deterministic node IDs for user identities.

/// Map an external user id to its 128-bit node id.
///
/// BLAKE3 of the id string, truncated to the first 16 bytes. The same user id
/// always yields the same node id, across restarts and snapshot reloads.
pub fn user_node_id(user_id: &str) -> u128 {
    let hash = blake3::hash(user_id.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&hash.as_bytes()[..16]);
    u128::from_le_bytes(bytes)
}

#[cfg(test)]
mod id_gen_tests {
    use super::*;

    #[test]
    fn test_same_id_same_node() {
        assert_eq!(user_node_id("user-1"), user_node_id("user-1"));
    }

    #[test]
    fn test_different_ids_differ() {
        assert_ne!(user_node_id("user-1"), user_node_id("user-2"));
        assert_ne!(user_node_id(""), user_node_id(" "));
    }
}
