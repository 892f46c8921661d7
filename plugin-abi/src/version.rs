use std::fmt;

/// Fixed-size version record returned by the version getters
///
/// The getters hand back a pointer into plugin-owned memory that is only
/// valid for the duration of the call, so the record is `Copy` and must be
/// read by value immediately.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct NativeVersion {
    pub major: u16,
    pub minor: u16,
    pub build: u16,
    pub revision: u16,
}

impl NativeVersion {
    pub const fn new(major: u16, minor: u16, build: u16) -> Self {
        Self {
            major,
            minor,
            build,
            revision: 0,
        }
    }

    /// The semantic `major.minor.patch` view of this record
    ///
    /// The revision field carries no meaning for packaging and is dropped.
    pub fn to_semver(&self) -> semver::Version {
        semver::Version::new(
            u64::from(self.major),
            u64::from(self.minor),
            u64::from(self.build),
        )
    }
}

impl fmt::Display for NativeVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.build)
    }
}
