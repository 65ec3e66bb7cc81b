//! On-disk FAT32 reader/writer over a 512-byte-sector block device.
//!
//! Layout and traversal rules follow Microsoft's FAT32 spec exactly where it
//! matters for byte-for-byte compatibility (boot-sector field offsets,
//! 32-byte directory entries, end-of-chain markers); everything else
//! (long file names, the free-cluster bitmap) is out of scope and LFN
//! entries are recognised only so they can be skipped.
//!
//! The primary FAT is loaded into memory once at mount (`Fat32Inner::fat_cache`);
//! every lookup is a plain array index, and every update writes the cache
//! first and then flushes only the sectors the update actually touched to
//! each on-disk FAT copy.

use alloc::string::String;
use alloc::vec::Vec;
use spin::Mutex;

use crate::drivers::ata::PRIMARY_ATA;
use crate::error::{KernelError, KernelResult};
use crate::fs::dentry::Dirent;
use crate::fs::inode::{FileType, Inode};
use crate::fs::mount::{BackendHandle, FileSystem};

const SECTOR_SIZE: usize = 512;
const DIR_ENTRY_SIZE: usize = 32;
const ENTRIES_PER_SECTOR: usize = SECTOR_SIZE / DIR_ENTRY_SIZE;
const FAT_ENTRIES_PER_SECTOR: usize = SECTOR_SIZE / 4;
const MAX_OPEN_FAT_FILES: usize = 32;

const FAT_END_OF_CHAIN: u32 = 0x0FFF_FFF8; // >= this is end-of-chain
const FAT_BAD_CLUSTER: u32 = 0x0FFF_FFF7;
const FAT_FREE: u32 = 0x0000_0000;

const ATTR_VOLUME_ID: u8 = 0x08;
const ATTR_DIRECTORY: u8 = 0x10;
const ATTR_ARCHIVE: u8 = 0x20;
const ATTR_LFN: u8 = 0x0F;

// ── BIOS Parameter Block ────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct Bpb {
    bytes_per_sector: u16,
    sectors_per_cluster: u8,
    reserved_sectors: u16,
    num_fats: u8,
    total_sectors: u32,
    fat_size: u32,
    root_cluster: u32,
    fat_start: u32,
    data_start: u32,
    total_clusters: u32,
}

impl Bpb {
    fn parse(sector: &[u8; 512]) -> KernelResult<Self> {
        if sector[510] != 0x55 || sector[511] != 0xAA {
            return Err(KernelError::Error);
        }

        let bytes_per_sector = u16::from_le_bytes([sector[11], sector[12]]);
        let sectors_per_cluster = sector[13];
        let reserved_sectors = u16::from_le_bytes([sector[14], sector[15]]);
        let num_fats = sector[16];

        let total_16 = u16::from_le_bytes([sector[19], sector[20]]);
        let total_32 = u32::from_le_bytes([sector[32], sector[33], sector[34], sector[35]]);
        let total_sectors = if total_16 != 0 { total_16 as u32 } else { total_32 };

        // FAT32 requires the legacy 16-bit FAT-size field to be zero; the
        // real size lives at offset 36. A nonzero value here means this is
        // a FAT12/16 volume, which this back-end does not support.
        let fat_size_16 = u16::from_le_bytes([sector[22], sector[23]]);
        let fat_size_32 = u32::from_le_bytes([sector[36], sector[37], sector[38], sector[39]]);
        if fat_size_16 != 0 || fat_size_32 == 0 {
            return Err(KernelError::Error);
        }
        if bytes_per_sector as usize != SECTOR_SIZE {
            return Err(KernelError::Error);
        }

        let root_cluster = u32::from_le_bytes([sector[44], sector[45], sector[46], sector[47]]);

        let fat_start = reserved_sectors as u32;
        let data_start = fat_start + (num_fats as u32) * fat_size_32;
        let total_clusters = (total_sectors.saturating_sub(data_start)) / sectors_per_cluster as u32;

        Ok(Bpb {
            bytes_per_sector,
            sectors_per_cluster,
            reserved_sectors,
            num_fats,
            total_sectors,
            fat_size: fat_size_32,
            root_cluster,
            fat_start,
            data_start,
            total_clusters,
        })
    }

    fn cluster_to_sector(&self, cluster: u32) -> u32 {
        self.data_start + (cluster - 2) * self.sectors_per_cluster as u32
    }

    fn bytes_per_cluster(&self) -> usize {
        self.sectors_per_cluster as usize * SECTOR_SIZE
    }
}

// ── Raw 32-byte directory entry ─────────────────────────────────────────

#[derive(Clone, Copy)]
struct RawDirEntry {
    name: [u8; 11],
    attr: u8,
    cluster_hi: u16,
    cluster_lo: u16,
    file_size: u32,
}

impl RawDirEntry {
    fn from_bytes(data: &[u8]) -> Self {
        RawDirEntry {
            name: {
                let mut n = [0u8; 11];
                n.copy_from_slice(&data[0..11]);
                n
            },
            attr: data[11],
            cluster_hi: u16::from_le_bytes([data[20], data[21]]),
            cluster_lo: u16::from_le_bytes([data[26], data[27]]),
            file_size: u32::from_le_bytes([data[28], data[29], data[30], data[31]]),
        }
    }

    fn to_bytes(&self) -> [u8; 32] {
        let mut buf = [0u8; 32];
        buf[0..11].copy_from_slice(&self.name);
        buf[11] = self.attr;
        buf[20..22].copy_from_slice(&self.cluster_hi.to_le_bytes());
        buf[26..28].copy_from_slice(&self.cluster_lo.to_le_bytes());
        buf[28..32].copy_from_slice(&self.file_size.to_le_bytes());
        buf
    }

    fn first_cluster(&self) -> u32 {
        ((self.cluster_hi as u32) << 16) | (self.cluster_lo as u32)
    }

    fn is_free(&self) -> bool { self.name[0] == 0x00 }
    fn is_deleted(&self) -> bool { self.name[0] == 0xE5 }
    fn is_lfn(&self) -> bool { self.attr == ATTR_LFN }
    fn is_dir(&self) -> bool { self.attr & ATTR_DIRECTORY != 0 }
    fn is_volume_id(&self) -> bool { self.attr & ATTR_VOLUME_ID != 0 }

    fn display_name(&self) -> String {
        let base = core::str::from_utf8(&self.name[0..8]).unwrap_or("").trim_end();
        let ext = core::str::from_utf8(&self.name[8..11]).unwrap_or("").trim_end();
        if ext.is_empty() {
            String::from(base)
        } else {
            alloc::format!("{}.{}", base, ext)
        }
    }
}

fn encode_83_name(name: &str) -> Option<[u8; 11]> {
    let name = name.trim();
    if name.is_empty() || name.len() > 12 {
        return None;
    }
    let mut result = [0x20u8; 11];
    let (base, ext) = match name.rfind('.') {
        Some(pos) => (&name[..pos], &name[pos + 1..]),
        None => (name, ""),
    };
    if base.len() > 8 || ext.len() > 3 {
        return None;
    }
    for (i, c) in base.chars().enumerate().take(8) {
        result[i] = (c as u8).to_ascii_uppercase();
    }
    for (i, c) in ext.chars().enumerate().take(3) {
        result[8 + i] = (c as u8).to_ascii_uppercase();
    }
    Some(result)
}

/// Where a directory entry physically lives, so it can be updated in place
/// (§3 "FAT32 open file"): the sector holding it and the byte offset of the
/// 32-byte record within that sector.
#[derive(Clone, Copy)]
struct DirEntryLocation {
    sector_lba: u32,
    offset: usize,
}

/// Per-handle state for an open FAT32 file (§3).
#[derive(Clone, Copy)]
struct Fat32OpenFile {
    start_cluster: u32,
    file_size: u32,
    dir_cluster: u32,
    dir_entry: DirEntryLocation,
    is_dir: bool,
}

struct Fat32Inner {
    bpb: Bpb,
    /// In-memory mirror of the primary FAT, one `u32` per cluster slot
    /// (masked to 28 bits on read, §3 "FAT32 FS state"). Loaded once at
    /// mount; `fat_write` updates this and flushes only the sector(s) it
    /// touched back to every on-disk FAT copy (§4.6, §5 "single writer").
    fat_cache: Vec<u32>,
    open_files: [Option<Fat32OpenFile>; MAX_OPEN_FAT_FILES],
}

pub struct Fat32Fs {
    inner: Mutex<Fat32Inner>,
}

impl Fat32Fs {
    pub fn init() -> KernelResult<Self> {
        let mut sector = [0u8; 512];
        {
            let ata = PRIMARY_ATA.lock();
            ata.read_sector(0, &mut sector).map_err(|_| KernelError::Error)?;
        }
        let bpb = Bpb::parse(&sector)?;
        let fat_cache = Self::load_fat(&bpb)?;

        crate::log_info!(
            "FAT32: bps={} spc={} fats={} fat_size={} root_cluster={} data_start={} total_clusters={} fat_entries_cached={}",
            bpb.bytes_per_sector, bpb.sectors_per_cluster, bpb.num_fats,
            bpb.fat_size, bpb.root_cluster, bpb.data_start, bpb.total_clusters, fat_cache.len()
        );

        Ok(Fat32Fs { inner: Mutex::new(Fat32Inner { bpb, fat_cache, open_files: [None; MAX_OPEN_FAT_FILES] }) })
    }

    fn read_sector_raw(lba: u32) -> KernelResult<[u8; 512]> {
        let mut buf = [0u8; 512];
        PRIMARY_ATA.lock().read_sector(lba, &mut buf).map_err(|_| KernelError::Error)?;
        Ok(buf)
    }

    fn write_sector_raw(lba: u32, buf: &[u8; 512]) -> KernelResult<()> {
        PRIMARY_ATA.lock().write_sector(lba, buf).map_err(|_| KernelError::Error)
    }

    /// Read the primary (first) on-disk FAT in full into a flat `u32` array,
    /// one entry per FAT slot, mirroring `bpb.fat_size` sectors' worth.
    fn load_fat(bpb: &Bpb) -> KernelResult<Vec<u32>> {
        let mut cache = Vec::with_capacity(bpb.fat_size as usize * FAT_ENTRIES_PER_SECTOR);
        for s in 0..bpb.fat_size {
            let sector = Self::read_sector_raw(bpb.fat_start + s)?;
            for i in 0..FAT_ENTRIES_PER_SECTOR {
                let off = i * 4;
                cache.push(u32::from_le_bytes([sector[off], sector[off + 1], sector[off + 2], sector[off + 3]]));
            }
        }
        Ok(cache)
    }

    /// `next_cluster(c) = fat[c] & 0x0FFFFFFF`. Returns `OutOfRange` for a
    /// cluster index outside the volume instead of silently aliasing it to
    /// end-of-chain (§9 open question).
    fn fat_read(cache: &[u32], bpb: &Bpb, cluster: u32) -> KernelResult<u32> {
        if cluster < 2 || cluster >= bpb.total_clusters + 2 {
            return Err(KernelError::OutOfRange);
        }
        Ok(cache[cluster as usize] & 0x0FFF_FFFF)
    }

    /// Update the cached entry, then flush the one sector that changed to
    /// every on-disk FAT copy (`bpb.num_fats` of them stay in lockstep).
    fn fat_write(cache: &mut Vec<u32>, bpb: &Bpb, cluster: u32, value: u32) -> KernelResult<()> {
        if cluster < 2 || cluster >= bpb.total_clusters + 2 {
            return Err(KernelError::OutOfRange);
        }
        let idx = cluster as usize;
        let existing = cache[idx];
        cache[idx] = (existing & 0xF000_0000) | (value & 0x0FFF_FFFF);

        let sector_offset = (idx / FAT_ENTRIES_PER_SECTOR) as u32;
        let sector_start = idx - (idx % FAT_ENTRIES_PER_SECTOR);
        let mut sector = [0u8; SECTOR_SIZE];
        for i in 0..FAT_ENTRIES_PER_SECTOR {
            sector[i * 4..i * 4 + 4].copy_from_slice(&cache[sector_start + i].to_le_bytes());
        }
        for fat_idx in 0..bpb.num_fats as u32 {
            let lba = bpb.fat_start + fat_idx * bpb.fat_size + sector_offset;
            Self::write_sector_raw(lba, &sector)?;
        }
        Ok(())
    }

    fn fat_alloc(cache: &[u32], bpb: &Bpb) -> KernelResult<u32> {
        for cluster in 2..bpb.total_clusters + 2 {
            if Self::fat_read(cache, bpb, cluster)? == FAT_FREE {
                return Ok(cluster);
            }
        }
        Err(KernelError::NoSpace)
    }

    fn alloc_cluster(cache: &mut Vec<u32>, bpb: &Bpb, prev: Option<u32>) -> KernelResult<u32> {
        let new = Self::fat_alloc(cache, bpb)?;
        Self::fat_write(cache, bpb, new, 0x0FFF_FFFF)?;
        if let Some(p) = prev {
            Self::fat_write(cache, bpb, p, new)?;
        }
        let start_sector = bpb.cluster_to_sector(new);
        let zero = [0u8; 512];
        for s in 0..bpb.sectors_per_cluster as u32 {
            Self::write_sector_raw(start_sector + s, &zero)?;
        }
        Ok(new)
    }

    fn read_chain(cache: &[u32], bpb: &Bpb, start_cluster: u32) -> KernelResult<Vec<u8>> {
        let mut data = Vec::new();
        let mut cluster = start_cluster;
        loop {
            if cluster < 2 {
                break;
            }
            let sector = bpb.cluster_to_sector(cluster);
            for s in 0..bpb.sectors_per_cluster as u32 {
                data.extend_from_slice(&Self::read_sector_raw(sector + s)?);
            }
            match Self::fat_read(cache, bpb, cluster) {
                Ok(next) if next < FAT_END_OF_CHAIN => cluster = next,
                _ => break,
            }
        }
        Ok(data)
    }

    /// Write `data` over a cluster chain rooted at `start_cluster`, allocating
    /// new clusters as needed, and update the FAT so the chain terminates.
    fn write_chain(cache: &mut Vec<u32>, bpb: &Bpb, start_cluster: u32, data: &[u8]) -> KernelResult<()> {
        let mut cluster = start_cluster;
        let mut offset = 0usize;
        loop {
            let sector = bpb.cluster_to_sector(cluster);
            for s in 0..bpb.sectors_per_cluster as u32 {
                let mut buf = [0u8; 512];
                let start = offset;
                let end = (offset + SECTOR_SIZE).min(data.len());
                if start < data.len() {
                    buf[..end - start].copy_from_slice(&data[start..end]);
                }
                Self::write_sector_raw(sector + s, &buf)?;
                offset += SECTOR_SIZE;
            }

            if offset >= data.len() {
                Self::fat_write(cache, bpb, cluster, 0x0FFF_FFFF)?;
                return Ok(());
            }

            match Self::fat_read(cache, bpb, cluster) {
                Ok(next) if next < FAT_END_OF_CHAIN => cluster = next,
                _ => cluster = Self::alloc_cluster(cache, bpb, Some(cluster))?,
            }
        }
    }

    fn read_dir_entries(cache: &[u32], bpb: &Bpb, dir_cluster: u32) -> KernelResult<Vec<(RawDirEntry, DirEntryLocation)>> {
        let mut entries = Vec::new();
        let mut cluster = dir_cluster;
        loop {
            if cluster < 2 {
                break;
            }
            let base_sector = bpb.cluster_to_sector(cluster);
            for s in 0..bpb.sectors_per_cluster as u32 {
                let sector_lba = base_sector + s;
                let sector = Self::read_sector_raw(sector_lba)?;
                for i in 0..ENTRIES_PER_SECTOR {
                    let off = i * DIR_ENTRY_SIZE;
                    let entry = RawDirEntry::from_bytes(&sector[off..off + DIR_ENTRY_SIZE]);
                    if entry.is_free() {
                        return Ok(entries);
                    }
                    if entry.is_deleted() || entry.is_lfn() || entry.is_volume_id() {
                        continue;
                    }
                    entries.push((entry, DirEntryLocation { sector_lba, offset: off }));
                }
            }
            match Self::fat_read(cache, bpb, cluster) {
                Ok(next) if next < FAT_END_OF_CHAIN => cluster = next,
                _ => break,
            }
        }
        Ok(entries)
    }

    fn resolve_path_entry(cache: &[u32], bpb: &Bpb, path: &str) -> KernelResult<(RawDirEntry, u32, DirEntryLocation)> {
        let path = path.trim_start_matches('/');
        if path.is_empty() {
            return Err(KernelError::InvalidPath); // root has no directory entry of its own
        }
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let mut current_cluster = bpb.root_cluster;

        for (idx, segment) in segments.iter().enumerate() {
            let entries = Self::read_dir_entries(cache, bpb, current_cluster)?;
            let target = encode_83_name(segment).ok_or(KernelError::InvalidPath)?;
            let found = entries.iter().find(|(e, _)| e.name == target);
            match found {
                Some((entry, loc)) if idx == segments.len() - 1 => return Ok((*entry, current_cluster, *loc)),
                Some((entry, _)) if entry.is_dir() => current_cluster = entry.first_cluster(),
                Some(_) => return Err(KernelError::NotADirectory),
                None => return Err(KernelError::NotFound),
            }
        }
        Err(KernelError::NotFound)
    }

    fn resolve_parent_and_name(cache: &[u32], bpb: &Bpb, path: &str) -> KernelResult<(u32, String)> {
        let path = path.trim_start_matches('/');
        if path.is_empty() {
            return Err(KernelError::InvalidPath);
        }
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let child_name = String::from(*segments.last().unwrap());
        let mut parent_cluster = bpb.root_cluster;

        for segment in &segments[..segments.len() - 1] {
            let entries = Self::read_dir_entries(cache, bpb, parent_cluster)?;
            let target = encode_83_name(segment).ok_or(KernelError::InvalidPath)?;
            match entries.iter().find(|(e, _)| e.name == target) {
                Some((e, _)) if e.is_dir() => parent_cluster = e.first_cluster(),
                Some(_) => return Err(KernelError::NotADirectory),
                None => return Err(KernelError::NotFound),
            }
        }
        Ok((parent_cluster, child_name))
    }

    fn add_dir_entry(cache: &mut Vec<u32>, bpb: &Bpb, dir_cluster: u32, entry: &RawDirEntry) -> KernelResult<()> {
        let mut cluster = dir_cluster;
        loop {
            if cluster < 2 {
                return Err(KernelError::Error);
            }
            let base_sector = bpb.cluster_to_sector(cluster);
            for s in 0..bpb.sectors_per_cluster as u32 {
                let sector_lba = base_sector + s;
                let mut sector = Self::read_sector_raw(sector_lba)?;
                for i in 0..ENTRIES_PER_SECTOR {
                    let off = i * DIR_ENTRY_SIZE;
                    if sector[off] == 0x00 || sector[off] == 0xE5 {
                        sector[off..off + DIR_ENTRY_SIZE].copy_from_slice(&entry.to_bytes());
                        return Self::write_sector_raw(sector_lba, &sector);
                    }
                }
            }
            match Self::fat_read(cache, bpb, cluster) {
                Ok(next) if next < FAT_END_OF_CHAIN => cluster = next,
                _ => cluster = Self::alloc_cluster(cache, bpb, Some(cluster))?,
            }
        }
    }

    fn write_entry_at(loc: DirEntryLocation, entry: &RawDirEntry) -> KernelResult<()> {
        let mut sector = Self::read_sector_raw(loc.sector_lba)?;
        sector[loc.offset..loc.offset + DIR_ENTRY_SIZE].copy_from_slice(&entry.to_bytes());
        Self::write_sector_raw(loc.sector_lba, &sector)
    }

    fn free_chain(cache: &mut Vec<u32>, bpb: &Bpb, start: u32) -> KernelResult<()> {
        let mut c = start;
        while c >= 2 {
            let next = Self::fat_read(cache, bpb, c);
            Self::fat_write(cache, bpb, c, FAT_FREE)?;
            match next {
                Ok(n) if n < FAT_END_OF_CHAIN => c = n,
                _ => break,
            }
        }
        Ok(())
    }

    fn alloc_slot(&self, inner: &mut Fat32Inner, file: Fat32OpenFile) -> KernelResult<BackendHandle> {
        let idx = inner.open_files.iter().position(|f| f.is_none()).ok_or(KernelError::NoSpace)?;
        inner.open_files[idx] = Some(file);
        Ok(idx as u64)
    }
}

impl FileSystem for Fat32Fs {
    fn name(&self) -> &str {
        "fat32"
    }

    fn open(&self, path: &str) -> KernelResult<BackendHandle> {
        let mut inner = self.inner.lock();
        let bpb = inner.bpb.clone();
        let (entry, parent_cluster, loc) = Self::resolve_path_entry(&inner.fat_cache, &bpb, path)?;
        if entry.is_dir() {
            return Err(KernelError::IsADirectory);
        }
        let file = Fat32OpenFile {
            start_cluster: entry.first_cluster(),
            file_size: entry.file_size,
            dir_cluster: parent_cluster,
            dir_entry: loc,
            is_dir: false,
        };
        self.alloc_slot(&mut inner, file)
    }

    fn read(&self, handle: BackendHandle, offset: usize, buf: &mut [u8]) -> KernelResult<usize> {
        let inner = self.inner.lock();
        let file = inner.open_files.get(handle as usize).and_then(|f| *f).ok_or(KernelError::NotFound)?;
        let file_size = file.file_size as usize;
        if offset >= file_size {
            return Ok(0);
        }
        let data = Self::read_chain(&inner.fat_cache, &inner.bpb, file.start_cluster)?;
        let available = &data[offset..file_size.min(data.len())];
        let n = buf.len().min(available.len());
        buf[..n].copy_from_slice(&available[..n]);
        Ok(n)
    }

    fn write(&self, handle: BackendHandle, offset: usize, data: &[u8]) -> KernelResult<usize> {
        let mut inner = self.inner.lock();
        let bpb = inner.bpb.clone();
        let mut file = inner.open_files.get(handle as usize).and_then(|f| *f).ok_or(KernelError::NotFound)?;

        let mut file_data = if file.file_size > 0 {
            let d = Self::read_chain(&inner.fat_cache, &bpb, file.start_cluster)?;
            d[..(file.file_size as usize).min(d.len())].to_vec()
        } else {
            Vec::new()
        };
        let end = offset + data.len();
        if end > file_data.len() {
            file_data.resize(end, 0);
        }
        file_data[offset..end].copy_from_slice(data);

        Self::write_chain(&mut inner.fat_cache, &bpb, file.start_cluster, &file_data)?;

        file.file_size = file_data.len() as u32;
        let mut updated = RawDirEntry::from_bytes(&{
            let mut tmp = [0u8; 32];
            let sector = Self::read_sector_raw(file.dir_entry.sector_lba)?;
            tmp.copy_from_slice(&sector[file.dir_entry.offset..file.dir_entry.offset + DIR_ENTRY_SIZE]);
            tmp
        });
        updated.file_size = file.file_size;
        Self::write_entry_at(file.dir_entry, &updated)?;

        inner.open_files[handle as usize] = Some(file);
        Ok(data.len())
    }

    fn close(&self, handle: BackendHandle) -> KernelResult<()> {
        let mut inner = self.inner.lock();
        if let Some(slot) = inner.open_files.get_mut(handle as usize) {
            *slot = None;
        }
        Ok(())
    }

    fn create(&self, path: &str) -> KernelResult<Inode> {
        let mut inner = self.inner.lock();
        let bpb = inner.bpb.clone();
        let (parent_cluster, child_name) = Self::resolve_parent_and_name(&inner.fat_cache, &bpb, path)?;
        let name83 = encode_83_name(&child_name).ok_or(KernelError::InvalidPath)?;

        if Self::read_dir_entries(&inner.fat_cache, &bpb, parent_cluster)?.iter().any(|(e, _)| e.name == name83) {
            return Err(KernelError::AlreadyExists);
        }

        let cluster = Self::alloc_cluster(&mut inner.fat_cache, &bpb, None)?;
        let entry = RawDirEntry { name: name83, attr: ATTR_ARCHIVE, cluster_hi: (cluster >> 16) as u16, cluster_lo: cluster as u16, file_size: 0 };
        Self::add_dir_entry(&mut inner.fat_cache, &bpb, parent_cluster, &entry)?;

        Ok(Inode { id: cluster as u64, file_type: FileType::File, size: 0 })
    }

    fn mkdir(&self, path: &str) -> KernelResult<Inode> {
        let mut inner = self.inner.lock();
        let bpb = inner.bpb.clone();
        let (parent_cluster, child_name) = Self::resolve_parent_and_name(&inner.fat_cache, &bpb, path)?;
        let name83 = encode_83_name(&child_name).ok_or(KernelError::InvalidPath)?;

        if Self::read_dir_entries(&inner.fat_cache, &bpb, parent_cluster)?.iter().any(|(e, _)| e.name == name83) {
            return Err(KernelError::AlreadyExists);
        }

        let cluster = Self::alloc_cluster(&mut inner.fat_cache, &bpb, None)?;

        let mut dot = [0x20u8; 11];
        dot[0] = b'.';
        let mut dotdot = [0x20u8; 11];
        dotdot[0] = b'.';
        dotdot[1] = b'.';

        Self::add_dir_entry(&mut inner.fat_cache, &bpb, cluster, &RawDirEntry { name: dot, attr: ATTR_DIRECTORY, cluster_hi: (cluster >> 16) as u16, cluster_lo: cluster as u16, file_size: 0 })?;
        Self::add_dir_entry(&mut inner.fat_cache, &bpb, cluster, &RawDirEntry { name: dotdot, attr: ATTR_DIRECTORY, cluster_hi: (parent_cluster >> 16) as u16, cluster_lo: parent_cluster as u16, file_size: 0 })?;
        Self::add_dir_entry(&mut inner.fat_cache, &bpb, parent_cluster, &RawDirEntry { name: name83, attr: ATTR_DIRECTORY, cluster_hi: (cluster >> 16) as u16, cluster_lo: cluster as u16, file_size: 0 })?;

        Ok(Inode { id: cluster as u64, file_type: FileType::Directory, size: 0 })
    }

    fn remove(&self, path: &str) -> KernelResult<()> {
        let mut inner = self.inner.lock();
        let bpb = inner.bpb.clone();
        let (entry, _parent, loc) = Self::resolve_path_entry(&inner.fat_cache, &bpb, path)?;

        if entry.is_dir() {
            let children: Vec<_> = Self::read_dir_entries(&inner.fat_cache, &bpb, entry.first_cluster())?
                .into_iter()
                .filter(|(e, _)| { let n = e.display_name(); n != "." && n != ".." })
                .collect();
            if !children.is_empty() {
                return Err(KernelError::NotEmpty);
            }
        }

        let mut sector = Self::read_sector_raw(loc.sector_lba)?;
        sector[loc.offset] = 0xE5;
        Self::write_sector_raw(loc.sector_lba, &sector)?;
        Self::free_chain(&mut inner.fat_cache, &bpb, entry.first_cluster())?;
        Ok(())
    }

    fn readdir(&self, path: &str) -> KernelResult<Vec<Dirent>> {
        let inner = self.inner.lock();
        let bpb = &inner.bpb;
        let dir_cluster = if path.trim_start_matches('/').is_empty() {
            bpb.root_cluster
        } else {
            let (entry, _, _) = Self::resolve_path_entry(&inner.fat_cache, bpb, path)?;
            if !entry.is_dir() {
                return Err(KernelError::NotADirectory);
            }
            entry.first_cluster()
        };

        let mut result = Vec::new();
        for (e, _) in Self::read_dir_entries(&inner.fat_cache, bpb, dir_cluster)? {
            let name = e.display_name();
            if name == "." || name == ".." {
                continue;
            }
            result.push(Dirent {
                name,
                file_type: if e.is_dir() { FileType::Directory } else { FileType::File },
                size: e.file_size as usize,
            });
        }
        Ok(result)
    }

    fn stat(&self, path: &str) -> KernelResult<Inode> {
        let inner = self.inner.lock();
        let bpb = &inner.bpb;
        if path.trim_start_matches('/').is_empty() {
            return Ok(Inode { id: bpb.root_cluster as u64, file_type: FileType::Directory, size: 0 });
        }
        let (entry, _, _) = Self::resolve_path_entry(&inner.fat_cache, bpb, path)?;
        Ok(Inode {
            id: entry.first_cluster() as u64,
            file_type: if entry.is_dir() { FileType::Directory } else { FileType::File },
            size: entry.file_size as usize,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_boot_sector(spc: u8, total_sectors: u32, fat_size: u32) -> [u8; 512] {
        let mut s = [0u8; 512];
        s[11..13].copy_from_slice(&512u16.to_le_bytes());
        s[13] = spc;
        s[14..16].copy_from_slice(&32u16.to_le_bytes()); // reserved sectors
        s[16] = 2; // num_fats
        s[36..40].copy_from_slice(&fat_size.to_le_bytes());
        s[32..36].copy_from_slice(&total_sectors.to_le_bytes());
        s[44..48].copy_from_slice(&2u32.to_le_bytes()); // root cluster
        s[510] = 0x55;
        s[511] = 0xAA;
        s
    }

    #[test]
    fn bpb_geometry() {
        let sector = sample_boot_sector(8, 100_000, 200);
        let bpb = Bpb::parse(&sector).unwrap();
        assert_eq!(bpb.fat_start, 32);
        assert_eq!(bpb.data_start, 32 + 2 * 200);
        assert_eq!(bpb.cluster_to_sector(2), bpb.data_start);
    }

    #[test]
    fn rejects_bad_signature() {
        let mut sector = sample_boot_sector(8, 100_000, 200);
        sector[511] = 0x00;
        assert!(Bpb::parse(&sector).is_err());
    }

    #[test]
    fn rejects_fat16_geometry() {
        let mut sector = sample_boot_sector(8, 100_000, 200);
        sector[22..24].copy_from_slice(&100u16.to_le_bytes()); // fat_size_16 != 0
        assert!(Bpb::parse(&sector).is_err());
    }

    #[test]
    fn encodes_83_names() {
        assert_eq!(&encode_83_name("readme.txt").unwrap(), b"README  TXT");
        assert_eq!(&encode_83_name("a").unwrap()[0], &b'A');
        assert!(encode_83_name("waytoolongname.txt").is_none());
    }

    #[test]
    fn fat_read_masks_reserved_bits_and_rejects_out_of_range() {
        let bpb = Bpb::parse(&sample_boot_sector(8, 100_000, 200)).unwrap();
        let mut cache = alloc::vec![0u32; FAT_ENTRIES_PER_SECTOR * 2];
        cache[5] = 0xF000_0010; // top nibble carries reserved/dirty bits on real media
        assert_eq!(Fat32Fs::fat_read(&cache, &bpb, 5).unwrap(), 0x0000_0010);
        assert!(Fat32Fs::fat_read(&cache, &bpb, bpb.total_clusters + 2).is_err());
    }
}
