// Reserved root-authority names (spec §4.4's root-authority reservation
// path gains this defensively, adapted from the teacher's TNS reserved-word
// list). A name on this list, or any single-character name, cannot be
// reserved as a root authority; sub-authorities are unaffected.

pub const RESERVED_NAMES: &[&str] = &[
    "admin",
    "administrator",
    "system",
    "root",
    "null",
    "undefined",
    "registry",
    "test",
    "example",
    "localhost",
    "postmaster",
    "webmaster",
    "hostmaster",
    "abuse",
    "support",
    "info",
    "contact",
    "validator",
    "node",
    "daemon",
    "rpc",
    "api",
    "bond",
    "auction",
    "governance",
    "treasury",
    "foundation",
    "network",
    "mainnet",
    "testnet",
    "devnet",
    "block",
    "transaction",
    "tx",
    "hash",
    "address",
    "official",
    "verified",
    "authentic",
    "anonymous",
    "unknown",
    "nobody",
    "anyone",
    "everyone",
    "all",
    "none",
    "default",
    "guest",
    "user",
];

/// Whether `name` is reserved (exact match) or too short to safely
/// reserve as a root authority.
pub fn is_reserved_root_name(name: &str) -> bool {
    name.chars().count() < 2 || RESERVED_NAMES.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_reserved_and_single_char() {
        assert!(is_reserved_root_name("admin"));
        assert!(is_reserved_root_name("a"));
        assert!(!is_reserved_root_name("alice"));
    }
}
