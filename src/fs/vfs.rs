use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::config::{MAX_MOUNTS, MAX_OPEN_FILES, MAX_PATH_LEN};
use crate::error::{KernelError, KernelResult};

use super::dentry::Dirent;
use super::inode::{FileType, Inode};
use super::mount::{BackendHandle, FileSystem};

struct Mount {
    path: String,
    fs: &'static dyn FileSystem,
}

#[derive(Clone, Copy)]
struct OpenHandle {
    mount_idx: usize,
    backend: BackendHandle,
    position: usize,
}

/// The Virtual File System: path normalisation, mount table, and the global
/// handle table. Every back-end is reached only through here.
pub struct Vfs {
    mounts: Vec<Mount>,
    handles: [Option<OpenHandle>; MAX_OPEN_FILES],
    cwd: String,
}

impl Vfs {
    pub fn new() -> Self {
        Vfs {
            mounts: Vec::new(),
            handles: [None; MAX_OPEN_FILES],
            cwd: String::from("/"),
        }
    }

    // ---- Mount table -----------------------------------------------

    pub fn mount(&mut self, path: &str, fs: &'static dyn FileSystem) -> KernelResult<()> {
        let path = normalize_path(path, "/")?;
        if self.mounts.iter().any(|m| m.path == path) {
            return Err(KernelError::AlreadyMounted);
        }
        if self.mounts.len() >= MAX_MOUNTS {
            return Err(KernelError::NoSpace);
        }
        self.mounts.push(Mount { path, fs });
        // Longest prefix first so resolve() finds the most specific mount.
        self.mounts.sort_by(|a, b| b.path.len().cmp(&a.path.len()));
        Ok(())
    }

    pub fn unmount(&mut self, path: &str) -> KernelResult<()> {
        let path = normalize_path(path, "/")?;
        let idx = self
            .mounts
            .iter()
            .position(|m| m.path == path)
            .ok_or(KernelError::NotFound)?;

        // Force-close every handle bound to this mount.
        for slot in self.handles.iter_mut() {
            if let Some(h) = slot {
                if h.mount_idx == idx {
                    let _ = self.mounts[idx].fs.close(h.backend);
                    *slot = None;
                }
            }
        }

        self.mounts[idx].fs.unmount()?;
        self.mounts.remove(idx);
        Ok(())
    }

    /// Resolve an absolute, normalised path to its owning mount and the
    /// mount-relative remainder ("/" if the path equals the mount point).
    fn resolve(&self, abs_path: &str) -> KernelResult<(&'static dyn FileSystem, String)> {
        for mp in &self.mounts {
            let is_match = if mp.path == "/" {
                true
            } else {
                abs_path == mp.path || abs_path.starts_with(&alloc::format!("{}/", mp.path))
            };
            if !is_match {
                continue;
            }
            let relative = if mp.path == "/" {
                abs_path.to_string()
            } else {
                let stripped = &abs_path[mp.path.len()..];
                if stripped.is_empty() {
                    String::from("/")
                } else {
                    stripped.to_string()
                }
            };
            return Ok((mp.fs, relative));
        }
        Err(KernelError::NotMounted)
    }

    fn resolve_abs(&self, path: &str) -> KernelResult<(&'static dyn FileSystem, String)> {
        let abs = normalize_path(path, &self.cwd)?;
        self.resolve(&abs)
    }

    // ---- Handle table -------------------------------------------------

    fn alloc_handle_slot(&mut self) -> KernelResult<usize> {
        self.handles
            .iter()
            .position(|h| h.is_none())
            .ok_or(KernelError::NoSpace)
    }

    pub fn open(&mut self, path: &str) -> KernelResult<usize> {
        let abs = normalize_path(path, &self.cwd)?;
        let (fs, relative) = self.resolve(&abs)?;
        let mount_idx = self
            .mounts
            .iter()
            .position(|m| core::ptr::eq(m.fs, fs))
            .ok_or(KernelError::NotMounted)?;

        let slot = self.alloc_handle_slot()?;
        match fs.open(&relative) {
            Ok(backend) => {
                self.handles[slot] = Some(OpenHandle { mount_idx, backend, position: 0 });
                Ok(slot)
            }
            Err(e) => Err(e),
        }
    }

    pub fn read(&mut self, handle_id: usize, buf: &mut [u8]) -> KernelResult<usize> {
        let handle = self.handles.get(handle_id).and_then(|h| *h).ok_or(KernelError::NotFound)?;
        let fs = self.mounts[handle.mount_idx].fs;
        let n = fs.read(handle.backend, handle.position, buf)?;
        if let Some(h) = &mut self.handles[handle_id] {
            h.position += n;
        }
        Ok(n)
    }

    pub fn write(&mut self, handle_id: usize, data: &[u8]) -> KernelResult<usize> {
        let handle = self.handles.get(handle_id).and_then(|h| *h).ok_or(KernelError::NotFound)?;
        let fs = self.mounts[handle.mount_idx].fs;
        let n = fs.write(handle.backend, handle.position, data)?;
        if let Some(h) = &mut self.handles[handle_id] {
            h.position += n;
        }
        Ok(n)
    }

    pub fn seek(&mut self, handle_id: usize, pos: usize) -> KernelResult<usize> {
        let h = self.handles.get_mut(handle_id).and_then(|h| h.as_mut()).ok_or(KernelError::NotFound)?;
        h.position = pos;
        Ok(pos)
    }

    pub fn close(&mut self, handle_id: usize) -> KernelResult<()> {
        let handle = self.handles.get(handle_id).and_then(|h| *h).ok_or(KernelError::NotFound)?;
        let fs = self.mounts[handle.mount_idx].fs;
        fs.close(handle.backend)?;
        self.handles[handle_id] = None;
        Ok(())
    }

    // ---- Path-addressed metadata ops -----------------------------------

    pub fn create(&mut self, path: &str) -> KernelResult<Inode> {
        let (fs, rel) = self.resolve_abs(path)?;
        fs.create(&rel)
    }

    pub fn mkdir(&mut self, path: &str) -> KernelResult<Inode> {
        let (fs, rel) = self.resolve_abs(path)?;
        fs.mkdir(&rel)
    }

    pub fn rmdir(&mut self, path: &str) -> KernelResult<()> {
        let (fs, rel) = self.resolve_abs(path)?;
        fs.rmdir(&rel)
    }

    pub fn remove(&mut self, path: &str) -> KernelResult<()> {
        let (fs, rel) = self.resolve_abs(path)?;
        fs.remove(&rel)
    }

    pub fn readdir(&self, path: &str) -> KernelResult<Vec<Dirent>> {
        let (fs, rel) = self.resolve_abs(path)?;
        fs.readdir(&rel)
    }

    pub fn stat(&self, path: &str) -> KernelResult<Inode> {
        let (fs, rel) = self.resolve_abs(path)?;
        fs.stat(&rel)
    }

    /// Convenience used by shell commands and the editor: read a whole file.
    pub fn read_file(&mut self, path: &str) -> KernelResult<Vec<u8>> {
        let stat = self.stat(path)?;
        let mut buf = alloc::vec![0u8; stat.size];
        let handle = self.open(path)?;
        let mut total = 0;
        while total < buf.len() {
            let n = self.read(handle, &mut buf[total..])?;
            if n == 0 {
                break;
            }
            total += n;
        }
        self.close(handle)?;
        buf.truncate(total);
        Ok(buf)
    }

    /// Convenience: overwrite a file's contents in one call.
    pub fn write_file(&mut self, path: &str, data: &[u8]) -> KernelResult<usize> {
        let (fs, rel) = self.resolve_abs(path)?;
        let handle = fs.open(&rel)?;
        let n = fs.write(handle, 0, data);
        let _ = fs.close(handle);
        n
    }

    pub fn exists(&self, path: &str) -> bool {
        self.stat(path).is_ok()
    }

    pub fn is_dir(&self, path: &str) -> bool {
        self.stat(path).map(|i| i.file_type == FileType::Directory).unwrap_or(false)
    }

    // ---- Working directory ---------------------------------------------

    pub fn chdir(&mut self, path: &str) -> KernelResult<()> {
        let abs = normalize_path(path, &self.cwd)?;
        if !self.is_dir(&abs) {
            return Err(KernelError::NotADirectory);
        }
        self.cwd = abs;
        Ok(())
    }

    pub fn getcwd(&self) -> &str {
        &self.cwd
    }

    /// Mount points currently registered, longest-prefix first.
    pub fn mounts(&self) -> Vec<String> {
        self.mounts.iter().map(|m| m.path.clone()).collect()
    }

    pub fn open_handle_count(&self) -> usize {
        self.handles.iter().filter(|h| h.is_some()).count()
    }
}

/// Resolve `.` and `..`, collapse repeated slashes, strip a trailing slash
/// (except for root), and turn a relative path into absolute by prepending
/// `cwd`. Pure — no filesystem access. §4.4 / §8 property 1.
pub fn normalize_path(input: &str, cwd: &str) -> KernelResult<String> {
    if input.len() > MAX_PATH_LEN || cwd.len() > MAX_PATH_LEN {
        return Err(KernelError::InvalidPath);
    }

    let absolute = if input.starts_with('/') {
        String::from(input)
    } else {
        if cwd == "/" {
            alloc::format!("/{}", input)
        } else {
            alloc::format!("{}/{}", cwd, input)
        }
    };

    let mut stack: Vec<&str> = Vec::new();
    for segment in absolute.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                stack.pop();
            }
            s => stack.push(s),
        }
    }

    let mut result = String::from("/");
    for (i, seg) in stack.iter().enumerate() {
        if i > 0 {
            result.push('/');
        }
        result.push_str(seg);
    }

    if result.len() > MAX_PATH_LEN {
        return Err(KernelError::InvalidPath);
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idempotent() {
        let p = normalize_path("/a/./b/../c", "/").unwrap();
        assert_eq!(p, "/a/c");
        let p2 = normalize_path(&p, "/").unwrap();
        assert_eq!(p, p2);
    }

    #[test]
    fn dotdot_at_root_is_noop() {
        assert_eq!(normalize_path("..", "/").unwrap(), "/");
        assert_eq!(normalize_path("/../../x", "/").unwrap(), "/x");
    }

    #[test]
    fn collapses_double_slashes() {
        assert_eq!(normalize_path("/a//b///c", "/").unwrap(), "/a/b/c");
    }

    #[test]
    fn relative_uses_cwd() {
        assert_eq!(normalize_path("bar", "/foo").unwrap(), "/foo/bar");
    }

    #[test]
    fn rejects_overlong_paths() {
        let long: String = core::iter::repeat('a').take(MAX_PATH_LEN + 10).collect();
        assert_eq!(normalize_path(&long, "/"), Err(KernelError::InvalidPath));
    }
}
