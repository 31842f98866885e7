//! SDK identity.
//!
//! Every request carries a `pnsdk` parameter naming the client library and its
//! version, so the service can tell client generations apart.

use std::fmt;

/// Client library name reported to the service.
pub const SDK_NAME: &str = "Pulse-Rust";

/// Current SDK version.
pub const SDK_VERSION: Version = Version {
    major: 0,
    minor: 1,
    patch: 1,
};

/// SDK version information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Version {
    /// Major version - breaking changes increment this.
    pub major: u8,
    /// Minor version - backwards-compatible changes increment this.
    pub minor: u8,
    /// Patch version.
    pub patch: u8,
}

impl Version {
    /// Create a new version.
    #[must_use]
    pub const fn new(major: u8, minor: u8, patch: u8) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl Default for Version {
    fn default() -> Self {
        SDK_VERSION
    }
}

/// Value of the `pnsdk` query parameter.
#[must_use]
pub fn sdk_identifier() -> String {
    format!("{}/{}", SDK_NAME, SDK_VERSION)
}
