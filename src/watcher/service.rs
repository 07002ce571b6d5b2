//! The OS watch service boundary.
//!
//! The rest of the crate only sees [`WatchService`]: register a path and get
//! a [`WatchHandle`] back, then block on [`WatchService::read_record`] for the
//! next [`ChangeRecord`]. [`InotifyService`] is the Linux implementation.

use std::ffi::CString;
use std::fmt;
use std::io;
use std::mem;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

use bitflags::bitflags;

/// Opaque identifier returned by the watch service for a registered path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WatchHandle(pub i32);

impl fmt::Display for WatchHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "wd:{}", self.0)
    }
}

bitflags! {
    /// Change-type flags carried by a [`ChangeRecord`], mirroring the inotify bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ChangeMask: u32 {
        const ACCESS = libc::IN_ACCESS;
        const MODIFY = libc::IN_MODIFY;
        const ATTRIB = libc::IN_ATTRIB;
        const CLOSE_WRITE = libc::IN_CLOSE_WRITE;
        const CLOSE_NOWRITE = libc::IN_CLOSE_NOWRITE;
        const OPEN = libc::IN_OPEN;
        const MOVED_FROM = libc::IN_MOVED_FROM;
        const MOVED_TO = libc::IN_MOVED_TO;
        const CREATE = libc::IN_CREATE;
        const DELETE = libc::IN_DELETE;
        const DELETE_SELF = libc::IN_DELETE_SELF;
        const MOVE_SELF = libc::IN_MOVE_SELF;
        const UNMOUNT = libc::IN_UNMOUNT;
        const Q_OVERFLOW = libc::IN_Q_OVERFLOW;
        const IGNORED = libc::IN_IGNORED;
        const ISDIR = libc::IN_ISDIR;

        // Kernel bits we don't name are kept rather than truncated.
        const _ = !0;
    }
}

/// Mask every target is registered with: content modified or created.
pub const WATCH_MASK: ChangeMask = ChangeMask::MODIFY.union(ChangeMask::CREATE);

/// One change notification as delivered by the watch service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeRecord {
    pub handle: WatchHandle,
    pub mask: ChangeMask,
    /// Length of the optional name payload that followed the header.
    pub name_len: u32,
}

impl ChangeRecord {
    pub fn new(handle: WatchHandle, mask: ChangeMask) -> Self {
        Self {
            handle,
            mask,
            name_len: 0,
        }
    }

    pub fn is_modify(&self) -> bool {
        self.mask.contains(ChangeMask::MODIFY)
    }
}

/// Result of one blocking read on the watch service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    Record(ChangeRecord),
    /// Fewer bytes than one whole record header were available.
    Short { bytes: usize },
}

/// A file-system watch service.
///
/// `add_watch` and `read_record` map onto `inotify_add_watch(2)` and a
/// blocking `read(2)` on the inotify descriptor.
pub trait WatchService {
    fn add_watch(&mut self, path: &Path, mask: ChangeMask) -> io::Result<WatchHandle>;

    /// Block until the next change record is available.
    fn read_record(&mut self) -> io::Result<ReadOutcome>;
}

/// Size of the fixed `struct inotify_event` header.
pub const RECORD_HEADER_LEN: usize = mem::size_of::<libc::inotify_event>();

const READ_BUFFER_LEN: usize = 4096;

/// Decode one record header from the front of `bytes`.
///
/// Layout is `{ i32 wd, u32 mask, u32 cookie, u32 len }` in native byte order.
pub fn decode_record(bytes: &[u8]) -> Option<ChangeRecord> {
    if bytes.len() < RECORD_HEADER_LEN {
        return None;
    }
    let field = |at: usize| -> [u8; 4] { [bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]] };

    Some(ChangeRecord {
        handle: WatchHandle(i32::from_ne_bytes(field(0))),
        mask: ChangeMask::from_bits_retain(u32::from_ne_bytes(field(4))),
        name_len: u32::from_ne_bytes(field(12)),
    })
}

/// Bytes returned by the last `read(2)`, consumed one record at a time.
#[derive(Debug)]
struct RecordBuffer {
    data: Box<[u8]>,
    filled: usize,
    cursor: usize,
}

impl RecordBuffer {
    fn new(capacity: usize) -> Self {
        Self {
            data: vec![0u8; capacity].into_boxed_slice(),
            filled: 0,
            cursor: 0,
        }
    }

    fn is_drained(&self) -> bool {
        self.cursor >= self.filled
    }

    fn reset(&mut self, filled: usize) {
        self.filled = filled.min(self.data.len());
        self.cursor = 0;
    }

    /// Take the next record, skipping its name payload.
    ///
    /// Leftover bytes too short for a header are reported and discarded.
    fn next_outcome(&mut self) -> ReadOutcome {
        let rest = &self.data[self.cursor..self.filled];
        match decode_record(rest) {
            Some(record) => {
                let total = RECORD_HEADER_LEN + record.name_len as usize;
                self.cursor = (self.cursor + total).min(self.filled);
                ReadOutcome::Record(record)
            }
            None => {
                let bytes = rest.len();
                self.cursor = self.filled;
                ReadOutcome::Short { bytes }
            }
        }
    }
}

/// inotify-backed [`WatchService`].
#[derive(Debug)]
pub struct InotifyService {
    fd: OwnedFd,
    buffer: RecordBuffer,
}

impl InotifyService {
    pub fn new() -> io::Result<Self> {
        // SAFETY: no pointers are passed; the flags are a valid inotify_init1 argument.
        let raw = unsafe { libc::inotify_init1(libc::IN_CLOEXEC) };
        if raw < 0 {
            return Err(io::Error::last_os_error());
        }
        // SAFETY: `raw` was just returned by inotify_init1 and nothing else owns it.
        let fd = unsafe { OwnedFd::from_raw_fd(raw) };

        Ok(Self {
            fd,
            buffer: RecordBuffer::new(READ_BUFFER_LEN),
        })
    }

    fn fill(&mut self) -> io::Result<()> {
        loop {
            let data = &mut self.buffer.data;
            // SAFETY: `data` is an exclusively borrowed buffer of `data.len()` writable
            // bytes, and the descriptor stays open for as long as `self.fd` lives.
            let n = unsafe {
                libc::read(
                    self.fd.as_raw_fd(),
                    data.as_mut_ptr().cast::<libc::c_void>(),
                    data.len(),
                )
            };
            if n >= 0 {
                self.buffer.reset(n as usize);
                return Ok(());
            }
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::Interrupted {
                return Err(err);
            }
        }
    }
}

impl WatchService for InotifyService {
    fn add_watch(&mut self, path: &Path, mask: ChangeMask) -> io::Result<WatchHandle> {
        let c_path = CString::new(path.as_os_str().as_bytes())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        // SAFETY: `c_path` is a NUL-terminated string that outlives the call, and the
        // descriptor stays open for as long as `self.fd` lives.
        let wd =
            unsafe { libc::inotify_add_watch(self.fd.as_raw_fd(), c_path.as_ptr(), mask.bits()) };
        if wd < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(WatchHandle(wd))
    }

    fn read_record(&mut self) -> io::Result<ReadOutcome> {
        if self.buffer.is_drained() {
            self.fill()?;
        }
        Ok(self.buffer.next_outcome())
    }
}
