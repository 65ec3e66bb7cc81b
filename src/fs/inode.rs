/// A filesystem node's metadata, as returned by `lookup`/`stat`.
#[derive(Debug, Clone, Copy)]
pub struct Inode {
    pub id: u64,
    pub file_type: FileType,
    pub size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    File,
    Directory,
}
