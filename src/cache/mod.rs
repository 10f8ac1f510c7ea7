//! Local disk cache
//!
//! One regular file per id directly under the cache root, written through a
//! temp file and an atomic rename so readers never see partial content.

pub mod file_cache;
pub mod key;
pub mod space;

pub use file_cache::{FileCache, HitHook};
pub use space::{Accounting, DiskSpace, HeadroomPolicy, SpaceProbe, StatvfsProbe};
