//! Device name resolution.
//!
//! `/proc/diskstats` names devices by their short kernel name (`sda`,
//! `nvme0n1p5`), while users usually pass a path such as
//! `/dev/disk/by-label/storage`. This module maps one onto the other.

use std::fs;
use tracing::trace;

const DEV_PREFIX: &str = "/dev/";

/// Resolves a user supplied device reference to its `/proc/diskstats` name.
///
/// If the reference is a symlink, its full chain is followed. Anything else
/// (a plain file or device node, a missing path, an unreadable one) is used
/// as given, so relative names are never turned into absolute paths. A
/// leading `/dev/` is then stripped.
///
/// Resolving an already resolved name returns it unchanged.
pub fn sanitize_disk_name(reference: &str) -> String {
    let resolved = match fs::symlink_metadata(reference) {
        Ok(meta) if meta.file_type().is_symlink() => match fs::canonicalize(reference) {
            Ok(path) => path.to_string_lossy().into_owned(),
            Err(e) => {
                trace!("Could not resolve {}: {} - using it verbatim", reference, e);
                reference.to_string()
            }
        },
        _ => reference.to_string(),
    };

    resolved
        .strip_prefix(DEV_PREFIX)
        .map(str::to_string)
        .unwrap_or(resolved)
}
