//! In-memory asset buffer with a lazy temporary-file view.

use once_cell::sync::OnceCell;
use quarry_plugin::Asset;
use std::fs::File;
use std::io::Write;
use std::sync::Arc;
use tracing::warn;

/// A fetched asset: an immutably-sized byte buffer, shared between the cache
/// entry that produced it and any caller still holding a reference.
///
/// The file view is created at most once, on first request, and only its
/// own guard is held while doing so; materializing a file long after the
/// fetch never contends with ongoing database activity. The file is
/// anonymous and vanishes when the asset drops.
pub struct MemoryAsset {
    data: Arc<[u8]>,
    temp: OnceCell<File>,
}

impl MemoryAsset {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            data: bytes.into(),
            temp: OnceCell::new(),
        }
    }
}

impl Asset for MemoryAsset {
    fn size(&self) -> usize {
        self.data.len()
    }

    fn read(&self, dst: &mut [u8], offset: usize) -> usize {
        if self.data.is_empty() || offset >= self.data.len() {
            return 0;
        }
        let count = dst.len().min(self.data.len() - offset);
        dst[..count].copy_from_slice(&self.data[offset..offset + count]);
        count
    }

    fn buffer(&self) -> Arc<[u8]> {
        self.data.clone()
    }

    fn file_view(&self) -> Option<(&File, u64)> {
        let file = self.temp.get_or_try_init(|| {
            let mut file = tempfile::tempfile()?;
            file.write_all(&self.data)?;
            file.flush()?;
            Ok::<_, std::io::Error>(file)
        });
        match file {
            // The file holds only this asset's bytes, starting at 0.
            Ok(file) => Some((file, 0)),
            Err(e) => {
                warn!("failed to materialize asset to a temporary file: {e}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Seek, SeekFrom};

    #[test]
    fn read_respects_bounds() {
        let asset = MemoryAsset::new(vec![1, 2, 3, 4, 5]);
        assert_eq!(asset.size(), 5);

        let mut dst = [0u8; 3];
        assert_eq!(asset.read(&mut dst, 0), 3);
        assert_eq!(dst, [1, 2, 3]);

        assert_eq!(asset.read(&mut dst, 3), 2);
        assert_eq!(dst[..2], [4, 5]);

        assert_eq!(asset.read(&mut dst, 5), 0);
        assert_eq!(asset.read(&mut dst, 100), 0);
    }

    #[test]
    fn empty_buffer_is_legal() {
        let asset = MemoryAsset::new(Vec::new());
        assert_eq!(asset.size(), 0);
        let mut dst = [0u8; 4];
        assert_eq!(asset.read(&mut dst, 0), 0);
    }

    #[test]
    fn buffer_is_shared_not_copied() {
        let asset = MemoryAsset::new(vec![9; 16]);
        let a = asset.buffer();
        let b = asset.buffer();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn file_view_is_created_once_and_holds_the_bytes() {
        let asset = MemoryAsset::new(b"quarry".to_vec());

        let (first, offset) = asset.file_view().unwrap();
        assert_eq!(offset, 0);
        let (second, _) = asset.file_view().unwrap();
        assert!(std::ptr::eq(first, second));

        let mut handle = first;
        handle.seek(SeekFrom::Start(offset)).unwrap();
        let mut contents = Vec::new();
        handle.read_to_end(&mut contents).unwrap();
        assert_eq!(contents, b"quarry");
    }
}
