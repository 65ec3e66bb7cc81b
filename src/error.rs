//! Crate-wide error taxonomy.
//!
//! Every fallible kernel path — VFS, filesystem back-ends, the loader, the
//! syscall surface — returns `Result<T, KernelError>`. The syscall ABI is the
//! only place the taxonomy is flattened to the classic sentinel negative
//! integer; everywhere else it stays a typed enum.

use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelError {
    /// Generic failure: I/O error, inconsistent on-disk state, etc.
    Error,
    /// Path, mount, process, or symbol not found.
    NotFound,
    /// Process, mount, or file already exists / already registered.
    AlreadyExists,
    /// Table, disk, or handle space exhausted.
    NoSpace,
    /// Path failed normalisation, exceeded the length cap, or was malformed.
    InvalidPath,
    /// No mount covers the path.
    NotMounted,
    /// The target mount point is already occupied.
    AlreadyMounted,
    /// Operation expected a directory and got a file, or vice versa.
    NotADirectory,
    IsADirectory,
    /// Directory is not empty.
    NotEmpty,
    /// A cluster/frame/index argument fell outside the valid range —
    /// kept distinct from end-of-chain so the two can't be confused.
    OutOfRange,
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let msg = match self {
            KernelError::Error => "generic failure",
            KernelError::NotFound => "not found",
            KernelError::AlreadyExists => "already exists",
            KernelError::NoSpace => "no space left",
            KernelError::InvalidPath => "invalid path",
            KernelError::NotMounted => "not mounted",
            KernelError::AlreadyMounted => "already mounted",
            KernelError::NotADirectory => "not a directory",
            KernelError::IsADirectory => "is a directory",
            KernelError::NotEmpty => "directory not empty",
            KernelError::OutOfRange => "value out of range",
        };
        write!(f, "{}", msg)
    }
}

impl KernelError {
    /// Flatten to the negative-integer sentinel used at the syscall boundary.
    pub fn to_raw(self) -> i32 {
        match self {
            KernelError::Error => -1,
            KernelError::NotFound => -2,
            KernelError::NoSpace => -3,
            KernelError::InvalidPath => -4,
            KernelError::NotMounted => -5,
            KernelError::AlreadyMounted => -6,
            // The remaining variants are internal refinements of `Error` for
            // callers that want to match on them in Rust; at the ABI boundary
            // they still read as a generic failure.
            KernelError::AlreadyExists
            | KernelError::NotADirectory
            | KernelError::IsADirectory
            | KernelError::NotEmpty
            | KernelError::OutOfRange => -1,
        }
    }
}

pub type KernelResult<T> = Result<T, KernelError>;

/// Successful byte-count / process-id style return value from a syscall.
pub fn success_raw(value: usize) -> i32 {
    value as i32
}
