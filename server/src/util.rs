//! Shared utility functions

/// Format a byte count for user-facing messages, using binary units.
///
/// # Examples
///
/// ```
/// use warden_server::util::format_file_size;
///
/// assert_eq!(format_file_size(512), "512 bytes");
/// assert_eq!(format_file_size(64 * 1024), "64 KiB");
/// assert_eq!(format_file_size(2 * 1024 * 1024), "2.0 MiB");
/// ```
pub fn format_file_size(bytes: usize) -> String {
    const KIB: usize = 1024;
    const MIB: usize = KIB * 1024;

    match bytes {
        0..KIB => format!("{bytes} bytes"),
        KIB..MIB => format!("{} KiB", bytes / KIB),
        _ => format!("{:.1} MiB", bytes as f64 / MIB as f64),
    }
}
