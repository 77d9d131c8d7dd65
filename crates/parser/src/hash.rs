use md5::Md5;
use sha2::{Digest, Sha256};

/// Content-addressable identity of a file's exact bytes (spec.md §3).
pub fn file_hash(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    hex_lower(&digest)
}

/// `player_hash = MD5(name : long_name)` (spec.md §3).
pub fn player_hash(name: &str, long_name: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(name.as_bytes());
    hasher.update(b":");
    hasher.update(long_name.as_bytes());
    hex_lower(&hasher.finalize())
}

fn hex_lower(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        s.push(HEX[(b >> 4) as usize] as char);
        s.push(HEX[(b & 0x0f) as usize] as char);
    }
    s
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// spec.md §8 property 1: file_hash is a pure function of the bytes.
        #[test]
        fn file_hash_is_deterministic_for_any_bytes(bytes: Vec<u8>) {
            prop_assert_eq!(file_hash(&bytes), file_hash(&bytes));
        }

        #[test]
        fn player_hash_is_deterministic_for_any_names(name: String, long_name: String) {
            prop_assert_eq!(player_hash(&name, &long_name), player_hash(&name, &long_name));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_hash_is_deterministic() {
        let a = file_hash(b"hello world");
        let b = file_hash(b"hello world");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn file_hash_is_independent_of_anything_but_bytes() {
        assert_eq!(file_hash(b"same"), file_hash(b"same"));
        assert_ne!(file_hash(b"same"), file_hash(b"different"));
    }

    #[test]
    fn player_hash_is_deterministic_and_order_sensitive() {
        let a = player_hash("Alice", "Alice Anderson");
        let b = player_hash("Alice", "Alice Anderson");
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
        assert_ne!(player_hash("Alice", "Bob"), player_hash("Bob", "Alice"));
    }
}
