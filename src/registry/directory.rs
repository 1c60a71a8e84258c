//! ExecutorDirectory - the identifier to entry map owned by the registry actor

use std::collections::HashMap;

use semver::Version;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use slacker_api::executor::DEFAULT_DESCRIPTION;

/// Suffix shared by every executor delivery address
pub const ADDRESS_SUFFIX: &str = "slacker-executor";

/// Generate a fresh delivery address: 128 random bits as fixed-width hex
pub fn generate_address() -> String {
    format!("{:032x}.{}", rand::random::<u128>(), ADDRESS_SUFFIX)
}

/// Why a registration was refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    /// Identifier or version missing, or version is not a semantic version
    #[error("missing required fields")]
    InvalidRequest,

    /// Re-registration with a version older than the stored one
    #[error("incompatible version, found {found}, expected {expected} or greater")]
    IncompatibleVersion { found: String, expected: String },

    /// The registry actor is gone
    #[error("registry unavailable")]
    Unavailable,
}

/// One registered command
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutorEntry {
    pub identifier: String,
    pub version: String,
    pub description: String,
    pub address: String,
}

/// Stored entry plus its parsed version
#[derive(Debug)]
struct Slot {
    entry: ExecutorEntry,
    version: Version,
}

/// Semver precedence without build metadata
fn is_older(incoming: &Version, stored: &Version) -> bool {
    (incoming.major, incoming.minor, incoming.patch, &incoming.pre)
        < (stored.major, stored.minor, stored.patch, &stored.pre)
}

/// Identifier to entry map with the versioned-upsert rule.
///
/// Not synchronised; the registry actor is its only owner.
#[derive(Debug, Default)]
pub struct ExecutorDirectory {
    slots: HashMap<String, Slot>,
}

impl ExecutorDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `identifier` at `version`, returning its delivery address.
    ///
    /// The address of an existing entry is never rotated.
    pub fn register(
        &mut self,
        identifier: &str,
        version: &str,
        description: Option<&str>,
    ) -> Result<String, RegistrationError> {
        debug!(%identifier, %version, "ExecutorDirectory::register: called");
        if identifier.is_empty() || version.is_empty() {
            return Err(RegistrationError::InvalidRequest);
        }

        let parsed = Version::parse(version).map_err(|e| {
            debug!(%identifier, %version, error = %e, "Unparseable executor version");
            RegistrationError::InvalidRequest
        })?;

        let description = description
            .filter(|d| !d.is_empty())
            .unwrap_or(DEFAULT_DESCRIPTION)
            .to_string();

        if let Some(slot) = self.slots.get_mut(identifier) {
            if is_older(&parsed, &slot.version) {
                warn!(%identifier, found = %version, expected = %slot.entry.version, "Rejected version regression");
                return Err(RegistrationError::IncompatibleVersion {
                    found: version.to_string(),
                    expected: slot.entry.version.clone(),
                });
            }

            debug!(%identifier, from = %slot.entry.version, to = %version, "Updating executor entry");
            slot.entry.version = version.to_string();
            slot.entry.description = description;
            slot.version = parsed;
            return Ok(slot.entry.address.clone());
        }

        let address = generate_address();
        info!(%identifier, %version, %address, "Registered new executor");
        self.slots.insert(
            identifier.to_string(),
            Slot {
                entry: ExecutorEntry {
                    identifier: identifier.to_string(),
                    version: version.to_string(),
                    description,
                    address: address.clone(),
                },
                version: parsed,
            },
        );
        Ok(address)
    }

    pub fn lookup(&self, identifier: &str) -> Option<&str> {
        self.slots.get(identifier).map(|slot| slot.entry.address.as_str())
    }

    /// Copy of every entry, ordered by identifier
    pub fn snapshot(&self) -> Vec<ExecutorEntry> {
        let mut entries: Vec<ExecutorEntry> = self.slots.values().map(|slot| slot.entry.clone()).collect();
        entries.sort_by(|a, b| a.identifier.cmp(&b.identifier));
        entries
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_format() {
        let address = generate_address();
        let (hex, suffix) = address.split_once('.').unwrap();

        assert_eq!(hex.len(), 32);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(suffix, ADDRESS_SUFFIX);
        assert_ne!(address, generate_address());
    }

    #[test]
    fn test_register_new_entry() {
        let mut dir = ExecutorDirectory::new();
        let address = dir.register("echo", "1.0.0", Some("repeats")).unwrap();

        assert_eq!(dir.lookup("echo"), Some(address.as_str()));
        assert_eq!(
            dir.snapshot(),
            vec![ExecutorEntry {
                identifier: "echo".to_string(),
                version: "1.0.0".to_string(),
                description: "repeats".to_string(),
                address,
            }]
        );
    }

    #[test]
    fn test_register_same_version_is_idempotent() {
        let mut dir = ExecutorDirectory::new();
        let first = dir.register("echo", "1.0.0", None).unwrap();
        let second = dir.register("echo", "1.0.0", None).unwrap();

        assert_eq!(first, second);
        assert_eq!(dir.len(), 1);
    }

    #[test]
    fn test_version_regression_rejected() {
        let mut dir = ExecutorDirectory::new();
        let address = dir.register("x", "1.0.0", None).unwrap();

        let err = dir.register("x", "0.9.0", None).unwrap_err();
        assert_eq!(err.to_string(), "incompatible version, found 0.9.0, expected 1.0.0 or greater");
        assert_eq!(dir.snapshot()[0].version, "1.0.0");

        assert_eq!(dir.register("x", "1.1.0", None).unwrap(), address);
        assert_eq!(dir.snapshot()[0].version, "1.1.0");
    }

    #[test]
    fn test_newer_version_updates_description() {
        let mut dir = ExecutorDirectory::new();
        dir.register("x", "1.0.0", Some("old")).unwrap();
        dir.register("x", "2.0.0", Some("new")).unwrap();

        assert_eq!(dir.snapshot()[0].description, "new");
    }

    #[test]
    fn test_prerelease_is_older_than_release() {
        let mut dir = ExecutorDirectory::new();
        dir.register("x", "1.0.0", None).unwrap();

        assert!(matches!(
            dir.register("x", "1.0.0-rc.1", None),
            Err(RegistrationError::IncompatibleVersion { .. })
        ));
    }

    #[test]
    fn test_build_metadata_ignored() {
        let mut dir = ExecutorDirectory::new();
        let address = dir.register("x", "1.0.0+build.9", None).unwrap();

        assert_eq!(dir.register("x", "1.0.0+build.1", None).unwrap(), address);
    }

    #[test]
    fn test_invalid_requests() {
        let mut dir = ExecutorDirectory::new();

        assert_eq!(dir.register("", "1.0.0", None), Err(RegistrationError::InvalidRequest));
        assert_eq!(dir.register("x", "", None), Err(RegistrationError::InvalidRequest));
        assert_eq!(dir.register("x", "1.meh", None), Err(RegistrationError::InvalidRequest));
        assert_eq!(RegistrationError::InvalidRequest.to_string(), "missing required fields");
        assert!(dir.is_empty());
    }

    #[test]
    fn test_missing_description_defaults() {
        let mut dir = ExecutorDirectory::new();
        dir.register("a", "1.0.0", None).unwrap();
        dir.register("b", "1.0.0", Some("")).unwrap();

        for entry in dir.snapshot() {
            assert_eq!(entry.description, DEFAULT_DESCRIPTION);
        }
    }

    #[test]
    fn test_snapshot_sorted_and_detached() {
        let mut dir = ExecutorDirectory::new();
        dir.register("zeta", "1.0.0", None).unwrap();
        dir.register("alpha", "1.0.0", None).unwrap();

        let snapshot = dir.snapshot();
        dir.register("mid", "1.0.0", None).unwrap();

        let ids: Vec<_> = snapshot.iter().map(|e| e.identifier.as_str()).collect();
        assert_eq!(ids, vec!["alpha", "zeta"]);
        assert_eq!(dir.len(), 3);
    }

    #[test]
    fn test_lookup_unknown() {
        let dir = ExecutorDirectory::new();
        assert_eq!(dir.lookup("nope"), None);
    }
}
