//! In-memory filesystem. Modelled as an arena of nodes addressed by index
//! (`NodeId`) rather than a path-keyed map or raw pointers, so the tree
//! survives rearrangement without invalidating references (§9 "Cyclic
//! graphs" — trees as `(arena, NodeId)`).

use alloc::string::{String, ToString};
use alloc::vec::Vec;
use lazy_static::lazy_static;
use spin::Mutex;

use crate::error::{KernelError, KernelResult};
use super::dentry::Dirent;
use super::inode::{FileType, Inode};
use super::mount::{BackendHandle, FileSystem};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct NodeId(u32);

const ROOT: NodeId = NodeId(0);

struct RamNode {
    name: String,
    file_type: FileType,
    data: Vec<u8>,
    children: Vec<NodeId>,
    /// Weak back-pointer: a lookup handle, not an ownership edge.
    parent: Option<NodeId>,
    open_count: u32,
}

impl RamNode {
    fn dir(name: &str, parent: Option<NodeId>) -> Self {
        RamNode { name: name.to_string(), file_type: FileType::Directory, data: Vec::new(), children: Vec::new(), parent, open_count: 0 }
    }
    fn file(name: &str, parent: Option<NodeId>) -> Self {
        RamNode { name: name.to_string(), file_type: FileType::File, data: Vec::new(), children: Vec::new(), parent, open_count: 0 }
    }
}

struct RamFsInner {
    /// `None` marks a freed slot available for reuse.
    nodes: Vec<Option<RamNode>>,
}

impl RamFsInner {
    fn new() -> Self {
        let mut nodes = Vec::new();
        nodes.push(Some(RamNode::dir("/", None)));
        RamFsInner { nodes }
    }

    fn get(&self, id: NodeId) -> KernelResult<&RamNode> {
        self.nodes.get(id.0 as usize).and_then(|n| n.as_ref()).ok_or(KernelError::NotFound)
    }

    fn get_mut(&mut self, id: NodeId) -> KernelResult<&mut RamNode> {
        self.nodes.get_mut(id.0 as usize).and_then(|n| n.as_mut()).ok_or(KernelError::NotFound)
    }

    fn alloc(&mut self, node: RamNode) -> NodeId {
        if let Some(slot) = self.nodes.iter().position(|n| n.is_none()) {
            self.nodes[slot] = Some(node);
            NodeId(slot as u32)
        } else {
            self.nodes.push(Some(node));
            NodeId((self.nodes.len() - 1) as u32)
        }
    }

    fn child_named(&self, dir: NodeId, name: &str) -> Option<NodeId> {
        self.get(dir).ok()?.children.iter().copied().find(|c| self.get(*c).map(|n| n.name == name).unwrap_or(false))
    }

    /// Resolve a normalised absolute path to a node.
    fn walk(&self, path: &str) -> KernelResult<NodeId> {
        let trimmed = path.trim_start_matches('/');
        if trimmed.is_empty() {
            return Ok(ROOT);
        }
        let mut current = ROOT;
        for segment in trimmed.split('/') {
            if self.get(current)?.file_type != FileType::Directory {
                return Err(KernelError::NotADirectory);
            }
            current = self.child_named(current, segment).ok_or(KernelError::NotFound)?;
        }
        Ok(current)
    }

    fn parent_path(path: &str) -> (&str, &str) {
        let path = path.trim_end_matches('/');
        match path.rfind('/') {
            Some(0) => ("/", &path[1..]),
            Some(i) => (&path[..i], &path[i + 1..]),
            None => ("/", path),
        }
    }

    fn insert(&mut self, path: &str, file_type: FileType) -> KernelResult<Inode> {
        let path = path.trim_end_matches('/');
        if path.is_empty() {
            return Err(KernelError::AlreadyExists); // root always exists
        }
        let (parent_path, name) = Self::parent_path(path);
        if name.is_empty() || name.len() > crate::config::MAX_NAME_LEN {
            return Err(KernelError::InvalidPath);
        }
        let parent = self.walk(parent_path)?;
        if self.get(parent)?.file_type != FileType::Directory {
            return Err(KernelError::NotADirectory);
        }
        if self.child_named(parent, name).is_some() {
            return Err(KernelError::AlreadyExists);
        }

        let node = match file_type {
            FileType::Directory => RamNode::dir(name, Some(parent)),
            FileType::File => RamNode::file(name, Some(parent)),
        };
        let id = self.alloc(node);
        self.get_mut(parent)?.children.push(id);

        Ok(Inode { id: id.0 as u64, file_type, size: 0 })
    }
}

pub struct RamFs {
    label: &'static str,
    inner: Mutex<RamFsInner>,
}

impl RamFs {
    pub fn new(label: &'static str) -> Self {
        RamFs { label, inner: Mutex::new(RamFsInner::new()) }
    }
}

impl FileSystem for RamFs {
    fn name(&self) -> &str {
        self.label
    }

    fn open(&self, path: &str) -> KernelResult<BackendHandle> {
        let mut inner = self.inner.lock();
        let id = inner.walk(path)?;
        if inner.get(id)?.file_type == FileType::Directory {
            return Err(KernelError::IsADirectory);
        }
        inner.get_mut(id)?.open_count += 1;
        Ok(id.0 as u64)
    }

    fn read(&self, handle: BackendHandle, offset: usize, buf: &mut [u8]) -> KernelResult<usize> {
        let inner = self.inner.lock();
        let node = inner.get(NodeId(handle as u32))?;
        if offset >= node.data.len() {
            return Ok(0);
        }
        let available = &node.data[offset..];
        let n = buf.len().min(available.len());
        buf[..n].copy_from_slice(&available[..n]);
        Ok(n)
    }

    fn write(&self, handle: BackendHandle, offset: usize, data: &[u8]) -> KernelResult<usize> {
        let mut inner = self.inner.lock();
        let node = inner.get_mut(NodeId(handle as u32))?;
        let end = offset + data.len();
        if end > node.data.len() {
            node.data.resize(end, 0);
        }
        node.data[offset..end].copy_from_slice(data);
        Ok(data.len())
    }

    fn close(&self, handle: BackendHandle) -> KernelResult<()> {
        let mut inner = self.inner.lock();
        if let Ok(node) = inner.get_mut(NodeId(handle as u32)) {
            node.open_count = node.open_count.saturating_sub(1);
        }
        Ok(())
    }

    fn create(&self, path: &str) -> KernelResult<Inode> {
        self.inner.lock().insert(path, FileType::File)
    }

    fn mkdir(&self, path: &str) -> KernelResult<Inode> {
        self.inner.lock().insert(path, FileType::Directory)
    }

    fn remove(&self, path: &str) -> KernelResult<()> {
        let path = path.trim_end_matches('/');
        if path.is_empty() {
            return Err(KernelError::InvalidPath); // root can't be removed
        }
        let mut inner = self.inner.lock();
        let id = inner.walk(path)?;
        let node_info = {
            let node = inner.get(id)?;
            (node.file_type, node.children.len(), node.open_count, node.parent)
        };
        let (file_type, child_count, open_count, parent) = node_info;

        if file_type == FileType::Directory && child_count > 0 {
            return Err(KernelError::NotEmpty);
        }
        if open_count > 0 {
            return Err(KernelError::Error);
        }

        if let Some(p) = parent {
            inner.get_mut(p)?.children.retain(|c| *c != id);
        }
        inner.nodes[id.0 as usize] = None;
        Ok(())
    }

    fn readdir(&self, path: &str) -> KernelResult<alloc::vec::Vec<Dirent>> {
        let inner = self.inner.lock();
        let id = inner.walk(path)?;
        let node = inner.get(id)?;
        if node.file_type != FileType::Directory {
            return Err(KernelError::NotADirectory);
        }
        let mut out = Vec::new();
        for child in &node.children {
            let c = inner.get(*child)?;
            out.push(Dirent { name: c.name.clone(), file_type: c.file_type, size: c.data.len() });
        }
        Ok(out)
    }

    fn stat(&self, path: &str) -> KernelResult<Inode> {
        let inner = self.inner.lock();
        let id = inner.walk(path)?;
        let node = inner.get(id)?;
        Ok(Inode { id: id.0 as u64, file_type: node.file_type, size: node.data.len() })
    }
}

lazy_static! {
    pub static ref RAMFS_INSTANCE: RamFs = RamFs::new("ramfs");
    pub static ref TMPFS_INSTANCE: RamFs = RamFs::new("tmpfs");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let fs = RamFs::new("test");
        fs.create("/a").unwrap();
        let h = fs.open("/a").unwrap();
        fs.write(h, 0, b"hello").unwrap();
        fs.close(h).unwrap();

        let h = fs.open("/a").unwrap();
        let mut buf = [0u8; 5];
        let n = fs.read(h, 0, &mut buf).unwrap();
        fs.close(h).unwrap();
        assert_eq!(n, 5);
        assert_eq!(&buf, b"hello");
        assert_eq!(fs.stat("/a").unwrap().size, 5);

        fs.remove("/a").unwrap();
        assert_eq!(fs.open("/a").unwrap_err(), KernelError::NotFound);
    }

    #[test]
    fn rmdir_requires_empty() {
        let fs = RamFs::new("test");
        fs.mkdir("/d").unwrap();
        fs.create("/d/f").unwrap();
        assert_eq!(fs.remove("/d").unwrap_err(), KernelError::NotEmpty);
        fs.remove("/d/f").unwrap();
        fs.remove("/d").unwrap();
    }
}
