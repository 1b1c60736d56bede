//! # Mapped Windows
//!
//! A [`Window`] owns one `mmap()`ed range of a file. It is the only place in
//! the crate that talks to the VM subsystem: mapping, unmapping, `msync()`
//! and `madvise()` all go through it.
//!
//! ## Why not memmap2?
//!
//! The engine needs two things `memmap2` does not offer: write-only
//! protection (`PROT_WRITE` without `PROT_READ`) and an `munmap()` whose
//! failure is reported instead of swallowed by `Drop`. The handle therefore
//! wraps the raw syscalls and keeps the same ownership model: the region lives
//! exactly as long as the `Window` value.
//!
//! ## Checked Access
//!
//! Callers never see raw pointers. A file offset is turned into an in-window
//! byte range by [`Window::locate`], which fails unless the whole request lies
//! inside the window. Copies borrow the window, so the borrow checker rules
//! out holding a range across a re-map.
//!
//! ```text
//! file:    |------|----|=========window=========|---------|
//!                 ^    ^ window.offset()        ^ window.end()
//!                 mapping base (page-aligned)
//! request:                  [offset, offset+len)
//! range:                    lead + offset - window.offset() ..
//! ```
//!
//! ## Alignment
//!
//! `mmap()` only accepts page-aligned file offsets, while a window starts
//! exactly at the request that triggered it. The mapping therefore begins at
//! the page boundary at or below the window start, and the `lead` bytes in
//! between are mapped but lie outside the window. Ranges returned by
//! [`Window::locate`] are relative to the mapping base, which keeps msync and
//! madvise addresses page-aligned.

use std::fmt;
use std::io;
use std::ops::Range;
use std::os::unix::io::RawFd;
use std::ptr::{self, NonNull};

use crate::config::{page_size, AccessMode, AccessPattern};

/// Protection bits of a mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Protection {
    pub read: bool,
    pub write: bool,
}

impl Protection {
    /// Read-write maps read+write, read-only maps read, and write-only maps
    /// write alone unless verification needs to read the data back.
    pub fn for_access(mode: AccessMode, verify: bool) -> Self {
        match mode {
            AccessMode::ReadWrite => Self { read: true, write: true },
            AccessMode::WriteOnly => Self { read: verify, write: true },
            AccessMode::ReadOnly => Self { read: true, write: false },
        }
    }

    fn raw(&self) -> libc::c_int {
        let mut prot = libc::PROT_NONE;
        if self.read {
            prot |= libc::PROT_READ;
        }
        if self.write {
            prot |= libc::PROT_WRITE;
        }
        prot
    }
}

/// madvise hints used by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advice {
    Sequential,
    Random,
    DontNeed,
}

impl Advice {
    pub fn for_pattern(pattern: AccessPattern) -> Self {
        match pattern {
            AccessPattern::Sequential => Advice::Sequential,
            AccessPattern::Random => Advice::Random,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Advice::Sequential => "MADV_SEQUENTIAL",
            Advice::Random => "MADV_RANDOM",
            Advice::DontNeed => "MADV_DONTNEED",
        }
    }

    fn raw(&self) -> libc::c_int {
        match self {
            Advice::Sequential => libc::MADV_SEQUENTIAL,
            Advice::Random => libc::MADV_RANDOM,
            Advice::DontNeed => libc::MADV_DONTNEED,
        }
    }
}

impl fmt::Display for Advice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Owned handle to a `MAP_SHARED` mapping of `[offset, offset + len)`.
///
/// `offset` is relative to the owning file's base offset; the window's file
/// position is `base_offset + offset`.
pub struct Window {
    ptr: NonNull<u8>,
    lead: usize,
    len: usize,
    offset: u64,
    protection: Protection,
}

// SAFETY: Window exclusively owns its mapping. The region is only reached
// through &self/&mut self, so moving the handle to another thread moves the
// only access path with it.
unsafe impl Send for Window {}

impl Window {
    /// Maps `len` bytes of `fd` starting at file position `position`.
    ///
    /// The mapping itself starts at the page boundary at or below `position`.
    pub fn map(
        fd: RawFd,
        position: u64,
        offset: u64,
        len: usize,
        protection: Protection,
    ) -> io::Result<Self> {
        let lead = (position % page_size() as u64) as usize;
        let file_offset = libc::off_t::try_from(position - lead as u64)
            .map_err(|_| io::Error::from_raw_os_error(libc::EOVERFLOW))?;
        let mapped = lead
            .checked_add(len)
            .ok_or_else(|| io::Error::from_raw_os_error(libc::EOVERFLOW))?;

        // SAFETY: a null hint lets the kernel pick a fresh range, so no
        // existing memory is replaced. The result is checked for MAP_FAILED
        // before it is used.
        let addr = unsafe {
            libc::mmap(
                ptr::null_mut(),
                mapped,
                protection.raw(),
                libc::MAP_SHARED,
                fd,
                file_offset,
            )
        };

        if addr == libc::MAP_FAILED {
            return Err(io::Error::last_os_error());
        }

        let ptr = NonNull::new(addr as *mut u8)
            .ok_or_else(|| io::Error::from_raw_os_error(libc::EFAULT))?;

        Ok(Self {
            ptr,
            lead,
            len,
            offset,
            protection,
        })
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn end(&self) -> u64 {
        self.offset + self.len as u64
    }

    pub fn protection(&self) -> Protection {
        self.protection
    }

    /// Bytes mapped ahead of the window start to reach a page boundary.
    pub fn lead(&self) -> usize {
        self.lead
    }

    fn mapped_len(&self) -> usize {
        self.lead + self.len
    }

    /// Returns true if `[offset, offset + len)` lies entirely inside the window.
    pub fn covers(&self, offset: u64, len: usize) -> bool {
        match offset.checked_add(len as u64) {
            Some(end) => offset >= self.offset && end <= self.end(),
            None => false,
        }
    }

    /// Translates a file-relative range into a byte range of the mapping,
    /// measured from the page-aligned mapping base.
    pub fn locate(&self, offset: u64, len: usize) -> Option<Range<usize>> {
        if !self.covers(offset, len) {
            return None;
        }
        let start = self.lead + (offset - self.offset) as usize;
        Some(start..start + len)
    }

    /// The window itself, in mapping coordinates.
    fn span(&self) -> Range<usize> {
        self.lead..self.mapped_len()
    }

    /// Borrows the mapped bytes of `[offset, offset + len)`.
    ///
    /// Returns `None` for ranges outside the window and for mappings without
    /// read protection.
    pub fn slice(&self, offset: u64, len: usize) -> Option<&[u8]> {
        if !self.protection.read {
            return None;
        }
        let range = self.locate(offset, len)?;
        Some(&self.as_slice()[range])
    }

    fn as_slice(&self) -> &[u8] {
        // SAFETY: ptr and mapped_len describe a live mapping owned by self,
        // and callers only reach this after checking read protection.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.mapped_len()) }
    }

    pub(crate) fn read_into(&self, range: Range<usize>, dst: &mut [u8]) {
        debug_assert!(self.protection.read);
        dst.copy_from_slice(&self.as_slice()[range]);
    }

    pub(crate) fn write_from(&mut self, range: Range<usize>, src: &[u8]) {
        assert!(range.end <= self.mapped_len() && range.len() == src.len());
        debug_assert!(self.protection.write);
        // SAFETY: the assertion keeps the destination inside the mapping, the
        // mapping is writable, and src is ordinary memory that cannot overlap
        // a region this handle owns exclusively. Raw copies avoid forming a
        // reference to memory that may lack PROT_READ.
        unsafe {
            ptr::copy_nonoverlapping(src.as_ptr(), self.ptr.as_ptr().add(range.start), src.len());
        }
    }

    /// Widens `range` down to the page boundary that contains its start.
    ///
    /// The mapping base is page-aligned, so aligned offsets within the window
    /// give the aligned addresses msync and madvise insist on.
    pub fn page_span(&self, range: Range<usize>) -> Range<usize> {
        let mask = page_size() - 1;
        (range.start & !mask)..range.end
    }

    /// Synchronously writes back the dirty pages of `range` (`MS_SYNC`).
    pub fn flush(&self, range: Range<usize>) -> io::Result<()> {
        let span = self.page_span(range);
        // SAFETY: span lies inside the mapping and starts page-aligned.
        let rc = unsafe {
            libc::msync(
                self.ptr.as_ptr().add(span.start) as *mut libc::c_void,
                span.len(),
                libc::MS_SYNC,
            )
        };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    /// Flushes the whole window.
    pub fn flush_all(&self) -> io::Result<()> {
        self.flush(self.span())
    }

    pub fn advise(&self, range: Range<usize>, advice: Advice) -> io::Result<()> {
        let span = self.page_span(range);
        // SAFETY: span lies inside the mapping and starts page-aligned. For a
        // MAP_SHARED file mapping MADV_DONTNEED only drops page-cache
        // residency; the data stays in the file.
        let rc = unsafe {
            libc::madvise(
                self.ptr.as_ptr().add(span.start) as *mut libc::c_void,
                span.len(),
                advice.raw(),
            )
        };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    pub fn advise_all(&self, advice: Advice) -> io::Result<()> {
        self.advise(self.span(), advice)
    }

    /// Releases the mapping. On failure the still-mapped window is handed
    /// back so the owner keeps a valid handle.
    pub fn unmap(self) -> Result<(), (Self, io::Error)> {
        // SAFETY: ptr and mapped_len are exactly what mmap returned for this
        // handle.
        let rc = unsafe { libc::munmap(self.ptr.as_ptr() as *mut libc::c_void, self.mapped_len()) };
        if rc < 0 {
            return Err((self, io::Error::last_os_error()));
        }
        std::mem::forget(self);
        Ok(())
    }
}

impl Drop for Window {
    fn drop(&mut self) {
        // SAFETY: ptr and mapped_len are exactly what mmap returned; unmap()
        // forgets the handle after a successful munmap so this never runs twice.
        let rc = unsafe { libc::munmap(self.ptr.as_ptr() as *mut libc::c_void, self.mapped_len()) };
        if rc < 0 {
            tracing::warn!(
                offset = self.offset,
                len = self.len,
                error = %io::Error::last_os_error(),
                "munmap failed while dropping window"
            );
        }
    }
}

impl fmt::Debug for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Window")
            .field("offset", &self.offset)
            .field("lead", &self.lead)
            .field("len", &self.len)
            .field("protection", &self.protection)
            .finish()
    }
}
