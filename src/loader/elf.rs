//! ELF32 `ET_REL` loader (§4.8). Every app ships as a relocatable object
//! compiled against a small set of kernel-exported symbols; loading means
//! allocating its `SHF_ALLOC` sections, applying `R_386_32`/`R_386_PC32`
//! relocations against them, running `.ctors`, and spawning a process at
//! its entry symbol. There is no Ring 3 and no separate address space —
//! the object runs with the same privilege and mappings as the kernel.

use alloc::alloc::{alloc_zeroed, Layout};
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::config::DEFAULT_STACK_SIZE;
use crate::process::task::Pid;

const EI_MAG: [u8; 4] = [0x7F, b'E', b'L', b'F'];
const ET_REL: u16 = 1;
const EM_386: u16 = 3;

const SHT_NULL: u32 = 0;
const SHT_SYMTAB: u32 = 2;
const SHT_NOBITS: u32 = 8;
const SHT_REL: u32 = 9;

const SHF_ALLOC: u32 = 0x2;

const SHN_UNDEF: u16 = 0;
const SHN_ABS: u16 = 0xFFF1;

const R_386_NONE: u32 = 0;
const R_386_32: u32 = 1;
const R_386_PC32: u32 = 2;

#[derive(Debug)]
pub enum ExecError {
    FileNotFound,
    ReadError,
    InvalidFormat,
    UnsupportedObject,
    UnresolvedSymbol,
    UnsupportedRelocation,
    EntryNotFound,
    SpawnFailed,
}

impl fmt::Display for ExecError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let msg = match self {
            ExecError::FileNotFound => "file not found",
            ExecError::ReadError => "read error",
            ExecError::InvalidFormat => "invalid ELF header",
            ExecError::UnsupportedObject => "not an ET_REL/EM_386 object",
            ExecError::UnresolvedSymbol => "unresolved symbol",
            ExecError::UnsupportedRelocation => "unsupported relocation type",
            ExecError::EntryNotFound => "entry symbol not found",
            ExecError::SpawnFailed => "failed to start process",
        };
        write!(f, "{}", msg)
    }
}

#[derive(Clone, Copy)]
struct Ehdr {
    e_type: u16,
    e_machine: u16,
    e_shoff: u32,
    e_shentsize: u16,
    e_shnum: u16,
    e_shstrndx: u16,
}

const EHDR_SIZE: usize = 52;

impl Ehdr {
    fn parse(data: &[u8]) -> Result<Self, ExecError> {
        if data.len() < EHDR_SIZE || data[0..4] != EI_MAG {
            return Err(ExecError::InvalidFormat);
        }
        Ok(Ehdr {
            e_type: u16::from_le_bytes([data[16], data[17]]),
            e_machine: u16::from_le_bytes([data[18], data[19]]),
            e_shoff: u32::from_le_bytes(data[32..36].try_into().unwrap()),
            e_shentsize: u16::from_le_bytes([data[46], data[47]]),
            e_shnum: u16::from_le_bytes([data[48], data[49]]),
            e_shstrndx: u16::from_le_bytes([data[50], data[51]]),
        })
    }
}

#[derive(Clone, Copy)]
struct Shdr {
    sh_name: u32,
    sh_type: u32,
    sh_flags: u32,
    sh_offset: u32,
    sh_size: u32,
    sh_link: u32,
    sh_info: u32,
}

const SHDR_SIZE: usize = 40;

impl Shdr {
    fn parse(data: &[u8]) -> Result<Self, ExecError> {
        if data.len() < SHDR_SIZE {
            return Err(ExecError::InvalidFormat);
        }
        Ok(Shdr {
            sh_name: u32::from_le_bytes(data[0..4].try_into().unwrap()),
            sh_type: u32::from_le_bytes(data[4..8].try_into().unwrap()),
            sh_flags: u32::from_le_bytes(data[8..12].try_into().unwrap()),
            sh_offset: u32::from_le_bytes(data[16..20].try_into().unwrap()),
            sh_size: u32::from_le_bytes(data[20..24].try_into().unwrap()),
            sh_link: u32::from_le_bytes(data[24..28].try_into().unwrap()),
            sh_info: u32::from_le_bytes(data[28..32].try_into().unwrap()),
        })
    }
}

#[derive(Clone, Copy)]
struct Sym {
    st_name: u32,
    st_value: u32,
    st_shndx: u16,
}

const SYM_SIZE: usize = 16;

impl Sym {
    fn parse(data: &[u8]) -> Result<Self, ExecError> {
        if data.len() < SYM_SIZE {
            return Err(ExecError::InvalidFormat);
        }
        Ok(Sym {
            st_name: u32::from_le_bytes(data[0..4].try_into().unwrap()),
            st_value: u32::from_le_bytes(data[4..8].try_into().unwrap()),
            st_shndx: u16::from_le_bytes([data[14], data[15]]),
        })
    }
}

#[derive(Clone, Copy)]
struct Rel {
    r_offset: u32,
    r_info: u32,
}

const REL_SIZE: usize = 8;

impl Rel {
    fn parse(data: &[u8]) -> Rel {
        Rel {
            r_offset: u32::from_le_bytes(data[0..4].try_into().unwrap()),
            r_info: u32::from_le_bytes(data[4..8].try_into().unwrap()),
        }
    }
    fn sym(self) -> u32 {
        self.r_info >> 8
    }
    fn kind(self) -> u32 {
        self.r_info & 0xFF
    }
}

fn cstr_at(bytes: &[u8], offset: u32) -> String {
    let start = offset as usize;
    let end = bytes[start..].iter().position(|&b| b == 0).map(|n| start + n).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[start..end]).into_owned()
}

/// Kernel functions an app object may import. Extend this table as the
/// syscall surface grows; an unresolved `R_386_32`/`R_386_PC32` against
/// `SHN_UNDEF` outside it fails the load.
fn resolve_kernel_symbol(name: &str) -> Option<u32> {
    let addr: usize = match name {
        "sys_yield" => sys_yield_trampoline as usize,
        "sys_getpid" => sys_getpid_trampoline as usize,
        "sys_open" => sys_open_trampoline as usize,
        "sys_read" => sys_read_trampoline as usize,
        "sys_write" => sys_write_trampoline as usize,
        "sys_close" => sys_close_trampoline as usize,
        "sys_exit" => sys_exit_trampoline as usize,
        _ => return None,
    };
    Some(addr as u32)
}

// Apps are plain C-ABI objects; every exported kernel symbol gets a thin
// `extern "C"` trampoline around the Rust-native syscall so relocations
// land on a calling convention the object actually expects.

extern "C" fn sys_yield_trampoline() {
    crate::syscalls::sys_yield();
}

/// `sys_getpid` returns `Option<Pid>`; apps linked against this table get
/// the ABI-flattened form (`0` means "no current process", which cannot
/// happen for a running app, so `0` is otherwise unused as a real pid).
extern "C" fn sys_getpid_trampoline() -> u32 {
    crate::syscalls::sys_getpid().unwrap_or(0)
}

extern "C" fn sys_exit_trampoline(pid: Pid) -> i32 {
    crate::syscalls::sys_exit(pid)
}

extern "C" fn sys_open_trampoline(path_ptr: *const u8, path_len: usize) -> i32 {
    let path = unsafe { core::slice::from_raw_parts(path_ptr, path_len) };
    match core::str::from_utf8(path) {
        Ok(s) => crate::syscalls::sys_open(s),
        Err(_) => -1,
    }
}

extern "C" fn sys_read_trampoline(handle: usize, buf_ptr: *mut u8, buf_len: usize) -> i32 {
    let buf = unsafe { core::slice::from_raw_parts_mut(buf_ptr, buf_len) };
    crate::syscalls::sys_read(handle, buf)
}

extern "C" fn sys_write_trampoline(handle: usize, buf_ptr: *const u8, buf_len: usize) -> i32 {
    let buf = unsafe { core::slice::from_raw_parts(buf_ptr, buf_len) };
    crate::syscalls::sys_write(handle, buf)
}

extern "C" fn sys_close_trampoline(handle: usize) -> i32 {
    crate::syscalls::sys_close(handle)
}

/// One allocated, possibly-zero-sized `SHF_ALLOC` section's live memory.
/// Raw-allocated (not `Box<[u8]>`) so `sh_addralign` can be honored exactly
/// — a boxed `vec![0u8; n]` only guarantees byte alignment, which is not
/// enough for sections an app expects to find word- or cacheline-aligned.
#[derive(Clone, Copy)]
struct SectionMem {
    ptr: *mut u8,
    len: usize,
}

/// Round `n` up to the next power of two, minimum 1 (an `sh_addralign` of
/// 0 or 1 means "no alignment requirement").
fn next_pow2(n: u32) -> usize {
    if n <= 1 {
        1
    } else {
        (n as usize).next_power_of_two()
    }
}

/// Pure relocation arithmetic shared by every `R_386_*` entry: kept free of
/// file/section plumbing so it can be unit-tested directly.
fn apply_relocation(kind: u32, symbol_value: u32, addend: u32, location_addr: u32) -> Result<Option<u32>, ExecError> {
    match kind {
        R_386_NONE => Ok(None),
        R_386_32 => Ok(Some(symbol_value.wrapping_add(addend))),
        R_386_PC32 => Ok(Some(symbol_value.wrapping_add(addend).wrapping_sub(location_addr))),
        _ => Err(ExecError::UnsupportedRelocation),
    }
}

/// Load the ELF32 object at `path`, relocate it against the kernel symbol
/// table, optionally call `init_symbol(init_arg)`, and spawn a process
/// named `process_name` at `entry_symbol`.
pub fn load(
    path: &str,
    process_name: &str,
    entry_symbol: &str,
    init_symbol: Option<&str>,
    init_arg: &str,
) -> Result<Pid, ExecError> {
    let file_data = crate::fs::VFS.lock().read_file(path).map_err(|_| ExecError::FileNotFound)?;
    if file_data.is_empty() {
        return Err(ExecError::ReadError);
    }

    let ehdr = Ehdr::parse(&file_data)?;
    if ehdr.e_type != ET_REL || ehdr.e_machine != EM_386 {
        return Err(ExecError::UnsupportedObject);
    }
    if ehdr.e_shoff == 0 || ehdr.e_shentsize as usize != SHDR_SIZE {
        return Err(ExecError::InvalidFormat);
    }

    let section_count = ehdr.e_shnum as usize;
    let mut sections = Vec::with_capacity(section_count);
    for i in 0..section_count {
        let off = ehdr.e_shoff as usize + i * SHDR_SIZE;
        sections.push(Shdr::parse(&file_data[off..])?);
    }

    let shstr_base = if (ehdr.e_shstrndx as usize) < section_count {
        Some(sections[ehdr.e_shstrndx as usize].sh_offset as usize)
    } else {
        None
    };

    // Allocate every loaded section at its required alignment.
    let mut memory: Vec<Option<SectionMem>> = Vec::with_capacity(section_count);
    for sh in &sections {
        if sh.sh_type == SHT_NULL || sh.sh_flags & SHF_ALLOC == 0 {
            memory.push(None);
            continue;
        }
        let size = sh.sh_size as usize;
        let align = next_pow2(sh.sh_addralign);
        if size == 0 {
            memory.push(Some(SectionMem { ptr: core::ptr::NonNull::dangling().as_ptr(), len: 0 }));
            continue;
        }
        let layout = Layout::from_size_align(size, align).map_err(|_| ExecError::InvalidFormat)?;
        let ptr = unsafe { alloc_zeroed(layout) };
        if ptr.is_null() {
            return Err(ExecError::ReadError);
        }
        if sh.sh_type != SHT_NOBITS {
            let start = sh.sh_offset as usize;
            let end = start + size;
            if end > file_data.len() {
                return Err(ExecError::InvalidFormat);
            }
            unsafe { core::ptr::copy_nonoverlapping(file_data[start..end].as_ptr(), ptr, size) };
        }
        memory.push(Some(SectionMem { ptr, len: size }));
    }

    // Locate the symbol table.
    let mut symtab_idx = None;
    for (i, sh) in sections.iter().enumerate() {
        if sh.sh_type == SHT_SYMTAB {
            symtab_idx = Some(i);
            break;
        }
    }
    let symtab_idx = symtab_idx.ok_or(ExecError::InvalidFormat)?;
    let symtab_sh = sections[symtab_idx];
    let sym_count = symtab_sh.sh_size as usize / SYM_SIZE;
    let strtab_sh = sections[symtab_sh.sh_link as usize];

    let symbol_value = |sym: Sym, strtab: Shdr, memory: &[Option<SectionMem>]| -> Result<u32, ExecError> {
        if sym.st_shndx == SHN_UNDEF {
            let name = cstr_at(&file_data[strtab.sh_offset as usize..], sym.st_name);
            resolve_kernel_symbol(&name).ok_or(ExecError::UnresolvedSymbol)
        } else if sym.st_shndx == SHN_ABS {
            Ok(sym.st_value)
        } else {
            let idx = sym.st_shndx as usize;
            if idx >= section_count {
                return Err(ExecError::InvalidFormat);
            }
            let base = match memory[idx] {
                Some(m) => m.ptr as u32,
                None => file_data.as_ptr() as u32 + sections[idx].sh_offset,
            };
            Ok(base + sym.st_value)
        }
    };

    // Apply relocations against every SHT_REL section.
    for rel_sh in sections.iter() {
        if rel_sh.sh_type != SHT_REL {
            continue;
        }
        let target_idx = rel_sh.sh_info as usize;
        if target_idx >= section_count || sections[target_idx].sh_flags & SHF_ALLOC == 0 {
            continue;
        }
        let rel_symtab_sh = sections[rel_sh.sh_link as usize];
        let rel_strtab_sh = sections[rel_symtab_sh.sh_link as usize];
        let rel_count = rel_sh.sh_size as usize / REL_SIZE;

        for r in 0..rel_count {
            let off = rel_sh.sh_offset as usize + r * REL_SIZE;
            let rel = Rel::parse(&file_data[off..]);
            let sym_off = rel_symtab_sh.sh_offset as usize + rel.sym() as usize * SYM_SIZE;
            let sym = Sym::parse(&file_data[sym_off..])?;
            let value = symbol_value(sym, rel_strtab_sh, &memory)?;

            let target = memory[target_idx].ok_or(ExecError::InvalidFormat)?;
            let reloc_off = rel.r_offset as usize;
            if reloc_off + 4 > target.len {
                return Err(ExecError::InvalidFormat);
            }
            let slot = unsafe { target.ptr.add(reloc_off) };
            let existing = unsafe { core::slice::from_raw_parts(slot, 4) };
            let addend = u32::from_le_bytes(existing.try_into().unwrap());
            let location_addr = slot as u32;

            if let Some(result) = apply_relocation(rel.kind(), value, addend, location_addr)? {
                unsafe { core::ptr::copy_nonoverlapping(result.to_le_bytes().as_ptr(), slot, 4) };
            }
        }
    }

    let resolve_symbol_by_name = |name: &str| -> Result<Option<u32>, ExecError> {
        for s in 0..sym_count {
            let off = symtab_sh.sh_offset as usize + s * SYM_SIZE;
            let sym = Sym::parse(&file_data[off..])?;
            if sym.st_name == 0 || sym.st_shndx == SHN_UNDEF {
                continue;
            }
            if cstr_at(&file_data[strtab_sh.sh_offset as usize..], sym.st_name) == name {
                return Ok(Some(symbol_value(sym, strtab_sh, &memory)?));
            }
        }
        Ok(None)
    };

    let entry = resolve_symbol_by_name(entry_symbol)?.ok_or(ExecError::EntryNotFound)?;

    // Run .ctors, if present.
    if let Some(shstrtab_off) = shstr_base {
        for (i, sh) in sections.iter().enumerate() {
            if sh.sh_flags & SHF_ALLOC == 0 {
                continue;
            }
            let name = cstr_at(&file_data[shstrtab_off..], sh.sh_name);
            if name == ".ctors" {
                if let Some(section) = memory[i] {
                    let count = section.len / 4;
                    for c in 0..count {
                        let slot = unsafe { section.ptr.add(c * 4) };
                        let bytes = unsafe { core::slice::from_raw_parts(slot, 4) };
                        let addr = u32::from_le_bytes(bytes.try_into().unwrap());
                        if addr != 0 {
                            let ctor: extern "C" fn() = unsafe { core::mem::transmute(addr as usize) };
                            ctor();
                        }
                    }
                }
            }
        }
    }

    // Optional init symbol, called with the caller-supplied argument string
    // before the process is spawned.
    if let Some(init_name) = init_symbol {
        if let Some(init_addr) = resolve_symbol_by_name(init_name)? {
            let init_fn: extern "C" fn(*const u8, usize) = unsafe { core::mem::transmute(init_addr as usize) };
            init_fn(init_arg.as_ptr(), init_arg.len());
        }
    }

    // Section memory is intentionally never freed: it is live as the
    // process's own code and data for as long as the process runs, and this
    // kernel has no unload path.
    crate::process::spawn_ex(process_name, entry, DEFAULT_STACK_SIZE, false).map_err(|_| ExecError::SpawnFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn r_386_32_adds_symbol_and_addend() {
        let result = apply_relocation(R_386_32, 0x1000, 0x20, 0xDEAD).unwrap();
        assert_eq!(result, Some(0x1020));
    }

    #[test]
    fn r_386_pc32_is_relative_to_location() {
        let result = apply_relocation(R_386_PC32, 0x2000, 0x10, 0x1F00).unwrap();
        assert_eq!(result, Some(0x2000u32.wrapping_add(0x10).wrapping_sub(0x1F00)));
    }

    #[test]
    fn r_386_none_is_a_no_op() {
        let result = apply_relocation(R_386_NONE, 0x1000, 0x20, 0xDEAD).unwrap();
        assert_eq!(result, None);
    }

    #[test]
    fn unknown_relocation_type_is_rejected() {
        assert!(apply_relocation(0xFF, 0, 0, 0).is_err());
    }

    #[test]
    fn next_pow2_rounds_up_and_treats_zero_or_one_as_unaligned() {
        assert_eq!(next_pow2(0), 1);
        assert_eq!(next_pow2(1), 1);
        assert_eq!(next_pow2(3), 4);
        assert_eq!(next_pow2(16), 16);
        assert_eq!(next_pow2(17), 32);
    }
}
