//! Anonymous voter identity resolution.
//!
//! A voter is recognized without any account: the client IP and an optional
//! device identifier (browser ID header) are folded into a one-way, salted,
//! post-scoped hash. Two strategies exist behind one interface:
//!
//! - **Device-priority**: when a device identifier is present, the stored
//!   hash covers `(salt, ip, post, device)`, but "has this device voted"
//!   lookups use the `(post, device)` pair directly against vote rows, so
//!   the same device is recognized even after an IP change.
//! - **IP-only fallback**: without a device identifier, the hash covers
//!   `(salt, ip, post)` and is checked against the vote-lock table.
//!
//! Post-scoping means the same client hashes differently on every post,
//! preventing cross-post correlation of voters.

use sha2::{Digest, Sha256};

/// How "has this identity voted" must be answered for a resolved identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupStrategy {
    /// Check vote rows for this `(post_id, device_id)` pair.
    Device(String),
    /// Check the vote-lock table for this IP-only hash.
    IpHash(String),
}

/// A resolved per-post voter identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoterIdentity {
    /// Hash stored on the vote-lock row (device-aware when available).
    pub storage_hash: String,
    /// Strategy for answering "has this identity voted".
    pub lookup: LookupStrategy,
}

/// Resolves anonymous voter identities from IP and device identifiers.
#[derive(Debug, Clone)]
pub struct IdentityResolver {
    salt: String,
}

impl IdentityResolver {
    /// Create a resolver parameterized by the process-wide secret salt.
    #[must_use]
    pub fn new(salt: impl Into<String>) -> Self {
        Self { salt: salt.into() }
    }

    /// Resolve the identity for one `(client, post)` pair.
    #[must_use]
    pub fn resolve(&self, post_id: &str, ip: &str, device_id: Option<&str>) -> VoterIdentity {
        match device_id {
            Some(device) => VoterIdentity {
                storage_hash: self.digest(&[ip, post_id, device]),
                lookup: LookupStrategy::Device(device.to_string()),
            },
            None => {
                let hash = self.ip_hash(ip, post_id);
                VoterIdentity {
                    storage_hash: hash.clone(),
                    lookup: LookupStrategy::IpHash(hash),
                }
            }
        }
    }

    /// IP-only fallback hash for a post.
    #[must_use]
    pub fn ip_hash(&self, ip: &str, post_id: &str) -> String {
        self.digest(&[ip, post_id])
    }

    fn digest(&self, parts: &[&str]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.salt.as_bytes());
        for part in parts {
            hasher.update(b":");
            hasher.update(part.as_bytes());
        }
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> IdentityResolver {
        IdentityResolver::new("test-salt")
    }

    #[test]
    fn test_ip_hash_is_deterministic() {
        let r = resolver();
        assert_eq!(r.ip_hash("203.0.113.7", "p1"), r.ip_hash("203.0.113.7", "p1"));
    }

    #[test]
    fn test_hash_is_post_scoped() {
        let r = resolver();
        assert_ne!(r.ip_hash("203.0.113.7", "p1"), r.ip_hash("203.0.113.7", "p2"));
    }

    #[test]
    fn test_salt_changes_hash() {
        let a = IdentityResolver::new("salt-a").ip_hash("203.0.113.7", "p1");
        let b = IdentityResolver::new("salt-b").ip_hash("203.0.113.7", "p1");
        assert_ne!(a, b);
    }

    #[test]
    fn test_device_identity_uses_device_lookup() {
        let identity = resolver().resolve("p1", "203.0.113.7", Some("device-1"));
        assert_eq!(identity.lookup, LookupStrategy::Device("device-1".to_string()));
        // Device is folded into the storage hash
        let ip_only = resolver().resolve("p1", "203.0.113.7", None);
        assert_ne!(identity.storage_hash, ip_only.storage_hash);
    }

    #[test]
    fn test_ip_only_lookup_matches_storage_hash() {
        let identity = resolver().resolve("p1", "203.0.113.7", None);
        match identity.lookup {
            LookupStrategy::IpHash(ref hash) => assert_eq!(*hash, identity.storage_hash),
            LookupStrategy::Device(_) => panic!("expected IP-only strategy"),
        }
    }

    #[test]
    fn test_hash_is_hex_sha256() {
        let hash = resolver().ip_hash("203.0.113.7", "p1");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
