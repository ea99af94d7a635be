//! Collectors for kernel-exposed statistics.
//!
//! Currently this is the block device counter source behind the disk check.

pub mod diskstats;
