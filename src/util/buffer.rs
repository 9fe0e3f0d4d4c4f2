//! Page-aligned transfer buffer
//!
//! Each worker allocates one buffer of the record size at start-up and reuses
//! it for every transfer. Page alignment satisfies O_DIRECT on every common
//! filesystem.

use crate::error::BenchError;
use crate::Result;
use std::alloc::{alloc_zeroed, dealloc, Layout};

/// Alignment of every transfer buffer
pub const PAGE_ALIGNMENT: usize = 4096;

/// Memory-aligned buffer owned by one worker
pub struct AlignedBuffer {
    ptr: *mut u8,
    size: usize,
    layout: Layout,
}

impl AlignedBuffer {
    /// Allocate a zeroed buffer of `size` bytes aligned to `alignment`
    ///
    /// # Errors
    ///
    /// Returns `BenchError::Configuration` if `size` is zero, `alignment` is
    /// not a power of two, or the allocation fails.
    pub fn new(size: usize, alignment: usize) -> Result<Self> {
        if size == 0 {
            return Err(BenchError::config("transfer buffer size must be greater than zero").into());
        }
        let layout = Layout::from_size_align(size, alignment).map_err(|e| {
            BenchError::config(format!(
                "invalid buffer layout (size {}, alignment {}): {}",
                size, alignment, e
            ))
        })?;

        // SAFETY: layout has a non-zero size
        let ptr = unsafe { alloc_zeroed(layout) };
        if ptr.is_null() {
            let msg = format!("failed to allocate {} byte transfer buffer", size);
            return Err(BenchError::config(msg).into());
        }

        Ok(AlignedBuffer { ptr, size, layout })
    }

    /// Page-aligned buffer for one record
    pub fn for_records(block_size: usize) -> Result<Self> {
        Self::new(block_size, PAGE_ALIGNMENT)
    }

    /// Fill with a repeating non-zero byte pattern so written data is not all zeros
    pub fn fill_pattern(&mut self) {
        for (i, byte) in self.as_mut_slice().iter_mut().enumerate() {
            *byte = (i % 251) as u8 + 1;
        }
    }

    #[inline(always)]
    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: ptr points to size initialized bytes owned by self
        unsafe { std::slice::from_raw_parts(self.ptr, self.size) }
    }

    #[inline(always)]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: ptr points to size initialized bytes exclusively borrowed through self
        unsafe { std::slice::from_raw_parts_mut(self.ptr, self.size) }
    }

    #[inline(always)]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline(always)]
    pub fn alignment(&self) -> usize {
        self.layout.align()
    }

    #[inline(always)]
    pub fn is_aligned(&self) -> bool {
        (self.ptr as usize) % self.layout.align() == 0
    }
}

impl Drop for AlignedBuffer {
    fn drop(&mut self) {
        // SAFETY: ptr was allocated with this exact layout
        unsafe {
            dealloc(self.ptr, self.layout);
        }
    }
}

// AlignedBuffer is Send because it owns its memory
unsafe impl Send for AlignedBuffer {}
