//! Disk-space guard
//!
//! Caching is skipped when writing an entry would leave the cache filesystem
//! too full. The check is a soft guard: concurrent writers can still race
//! past it between the measurement and the write.

use std::fs;
use std::io;
use std::path::Path;

use serde::Deserialize;

/// Default fraction of total capacity that must stay free
pub const DEFAULT_MIN_FREE_RATIO: f64 = 0.05;

/// Capacity of the filesystem containing a directory, in bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiskSpace {
    /// Total size of the filesystem
    pub total: u64,
    /// Bytes available to unprivileged writers
    pub available: u64,
}

/// Measures free space for a directory
pub trait SpaceProbe: Send + Sync {
    fn measure(&self, dir: &Path) -> io::Result<DiskSpace>;
}

/// `statvfs(3)` on the real path of the directory
///
/// The directory is canonicalized first so a symlinked cache root is
/// measured on the filesystem it points to.
#[derive(Debug, Default, Clone, Copy)]
pub struct StatvfsProbe;

impl SpaceProbe for StatvfsProbe {
    #[allow(clippy::unnecessary_cast)]
    fn measure(&self, dir: &Path) -> io::Result<DiskSpace> {
        let real = fs::canonicalize(dir)?;
        let stat = nix::sys::statvfs::statvfs(&real)?;
        let frsize = stat.fragment_size() as u64;
        Ok(DiskSpace {
            total: (stat.blocks() as u64).saturating_mul(frsize),
            available: (stat.blocks_available() as u64).saturating_mul(frsize),
        })
    }
}

/// Whether the headroom is measured before or after the prospective write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Accounting {
    /// Free space minus the entry size must exceed the threshold
    #[default]
    AfterWrite,
    /// Free space alone must exceed the threshold
    BeforeWrite,
}

impl std::str::FromStr for Accounting {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "after-write" => Ok(Accounting::AfterWrite),
            "before-write" => Ok(Accounting::BeforeWrite),
            other => Err(format!(
                "unknown accounting mode '{}', expected after-write or before-write",
                other
            )),
        }
    }
}

/// Minimum free-space headroom required before caching an entry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadroomPolicy {
    /// Fraction of total capacity that must remain free (0.0 - 1.0)
    pub min_free_ratio: f64,
    pub accounting: Accounting,
}

impl HeadroomPolicy {
    pub fn new(min_free_ratio: f64, accounting: Accounting) -> Self {
        Self {
            min_free_ratio: min_free_ratio.clamp(0.0, 1.0),
            accounting,
        }
    }

    /// Bytes that must stay free on a filesystem of `total` bytes
    pub fn threshold(&self, total: u64) -> u64 {
        (total as f64 * self.min_free_ratio).round() as u64
    }

    /// Whether an entry of `incoming` bytes may be written
    pub fn permits(&self, space: DiskSpace, incoming: u64) -> bool {
        let threshold = self.threshold(space.total);
        match self.accounting {
            Accounting::AfterWrite => match space.available.checked_sub(incoming) {
                Some(left) => left > threshold,
                None => false,
            },
            Accounting::BeforeWrite => space.available > threshold,
        }
    }
}

impl Default for HeadroomPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_FREE_RATIO, Accounting::AfterWrite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GB: u64 = 1024 * 1024 * 1024;

    fn space(total: u64, available: u64) -> DiskSpace {
        DiskSpace { total, available }
    }

    #[test]
    fn test_threshold_is_five_percent_by_default() {
        let policy = HeadroomPolicy::default();
        assert_eq!(policy.threshold(100 * GB), 5 * GB);
    }

    #[test]
    fn test_after_write_accounts_for_entry_size() {
        let policy = HeadroomPolicy::default();

        assert!(policy.permits(space(100 * GB, 10 * GB), GB));
        // 6 GB free, writing 1 GB leaves exactly 5 GB: not strictly above
        assert!(!policy.permits(space(100 * GB, 6 * GB), GB));
        assert!(!policy.permits(space(100 * GB, GB), 2 * GB));
    }

    #[test]
    fn test_before_write_ignores_entry_size() {
        let policy = HeadroomPolicy::new(0.05, Accounting::BeforeWrite);

        assert!(policy.permits(space(100 * GB, 6 * GB), GB));
        assert!(!policy.permits(space(100 * GB, 5 * GB), 1));
    }

    #[test]
    fn test_ratio_is_clamped() {
        let policy = HeadroomPolicy::new(3.0, Accounting::BeforeWrite);
        assert_eq!(policy.min_free_ratio, 1.0);
        assert!(!policy.permits(space(100, 100), 0));

        let policy = HeadroomPolicy::new(-1.0, Accounting::AfterWrite);
        assert!(policy.permits(space(100, 1), 0));
    }

    #[test]
    fn test_accounting_parse() {
        assert_eq!("after-write".parse::<Accounting>(), Ok(Accounting::AfterWrite));
        assert_eq!("before-write".parse::<Accounting>(), Ok(Accounting::BeforeWrite));
        assert!("sometimes".parse::<Accounting>().is_err());
    }

    #[test]
    fn test_statvfs_probe_measures_temp_dir() {
        let dir = tempfile::tempdir().unwrap();
        let measured = StatvfsProbe.measure(dir.path()).unwrap();
        assert!(measured.total > 0);
        assert!(measured.available <= measured.total);
    }

    #[cfg(unix)]
    #[test]
    fn test_statvfs_probe_follows_symlinked_root() {
        let dir = tempfile::tempdir().unwrap();
        let real = dir.path().join("real");
        fs::create_dir(&real).unwrap();
        let link = dir.path().join("link");
        std::os::unix::fs::symlink(&real, &link).unwrap();

        let via_link = StatvfsProbe.measure(&link).unwrap();
        let direct = StatvfsProbe.measure(&real).unwrap();
        assert_eq!(via_link.total, direct.total);
    }
}
