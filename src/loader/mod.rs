//! Loads relocatable ELF32 objects into the kernel's own address space
//! and starts them as ordinary processes (§4.8).

pub mod elf;
