use alloc::string::String;
use super::inode::FileType;

/// `(name up to 63 bytes, type, size in bytes)` — §3 Dirent.
#[derive(Debug, Clone)]
pub struct Dirent {
    pub name: String,
    pub file_type: FileType,
    pub size: usize,
}
