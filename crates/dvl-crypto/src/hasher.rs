use dvl_types::HashFunction;

/// Domain-separated BLAKE3 hasher for business keys and value strings.
///
/// Each hasher carries a domain tag (e.g., `"dvl-hub-v1"`, `"dvl-value-v1"`)
/// that is prepended to every hash computation. A hub key and a value hash
/// computed over identical strings therefore never collide.
///
/// Keys are lowercase hex, 64 characters long.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyHasher {
    domain: &'static str,
}

impl KeyHasher {
    /// Hasher for hub business keys.
    pub const HUB: Self = Self {
        domain: "dvl-hub-v1",
    };
    /// Hasher for link keys (concatenated related keys).
    pub const LINK: Self = Self {
        domain: "dvl-link-v1",
    };
    /// Hasher for satellite value strings.
    pub const VALUE: Self = Self {
        domain: "dvl-value-v1",
    };

    /// Create a hasher with a custom domain tag.
    pub const fn new(domain: &'static str) -> Self {
        Self { domain }
    }

    /// Hash a business-key or value string to its hex key.
    pub fn hash(&self, data: &str) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher.update(data.as_bytes());
        hasher.finalize().to_hex().to_string()
    }

    pub fn domain(&self) -> &str {
        self.domain
    }

    /// Wrap this hasher as the [`HashFunction`] a repository is wired with.
    pub fn function(self) -> HashFunction<String> {
        HashFunction::new(move |data: &str| self.hash(data))
    }
}
