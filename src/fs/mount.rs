use alloc::vec::Vec;
use crate::error::KernelResult;
use super::dentry::Dirent;
use super::inode::Inode;

/// Back-end-private token returned by `open` and handed back on every
/// subsequent call against that handle. Opaque to the VFS core — each
/// back-end is free to interpret it however it likes (an index into its own
/// open-file table, a cluster number, ...).
pub type BackendHandle = u64;

/// Every concrete filesystem implements this. Paths passed in are already
/// mount-relative (the VFS core strips the mount prefix before calling).
pub trait FileSystem: Send + Sync {
    fn name(&self) -> &str;

    fn open(&self, path: &str) -> KernelResult<BackendHandle>;
    fn read(&self, handle: BackendHandle, offset: usize, buf: &mut [u8]) -> KernelResult<usize>;
    fn write(&self, handle: BackendHandle, offset: usize, data: &[u8]) -> KernelResult<usize>;
    fn close(&self, handle: BackendHandle) -> KernelResult<()>;

    fn create(&self, path: &str) -> KernelResult<Inode>;
    fn mkdir(&self, path: &str) -> KernelResult<Inode>;
    fn rmdir(&self, path: &str) -> KernelResult<()> {
        self.remove(path)
    }
    fn remove(&self, path: &str) -> KernelResult<()>;
    fn readdir(&self, path: &str) -> KernelResult<Vec<Dirent>>;
    fn stat(&self, path: &str) -> KernelResult<Inode>;

    /// Called when the mount is torn down. Default: nothing to flush.
    fn unmount(&self) -> KernelResult<()> {
        Ok(())
    }
}
