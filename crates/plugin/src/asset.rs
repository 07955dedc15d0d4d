use std::fs::File;
use std::sync::Arc;

/// A materialized asset.
///
/// Implementations own an immutably-sized copy of the asset bytes. Consumers
/// either read through the buffer view or ask for a file-descriptor view,
/// which implementations may create lazily.
pub trait Asset: Send + Sync {
    /// Size of the asset in bytes. Constant for the asset's lifetime.
    fn size(&self) -> usize;

    /// Copy bytes starting at `offset` into `dst`.
    ///
    /// Returns the number of bytes copied: `min(dst.len(), size - offset)`,
    /// or 0 when `offset` is past the end or the asset is empty.
    fn read(&self, dst: &mut [u8], offset: usize) -> usize;

    /// Zero-copy shared view of the asset bytes.
    fn buffer(&self) -> Arc<[u8]>;

    /// A file-descriptor view of the asset.
    ///
    /// The returned offset is where this asset's bytes start within the
    /// file. Returns `None` when a file view cannot be provided.
    fn file_view(&self) -> Option<(&File, u64)>;
}
