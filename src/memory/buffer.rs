use std::{alloc::Layout, marker::PhantomData, ptr::NonNull};

use crate::error::Error;
use crate::memory::{
    buffer::utils::zero_trailing_bytes,
    policy::{AlignmentStrategy, CustomAlignment, InitStrategy, SimdAlignment, Zeroed},
};

/// Raw, aligned heap storage for elements of type `T`, allocated from the
/// global allocator.
///
/// Owns the allocated memory and handles deallocation. Ensures specific
/// memory alignment with AVX and NEON requirements, defaulting to 32 bytes
/// for `x86_64` when AVX2 is enabled and 16 bytes for `aarch64` when NEON is
/// enabled.
///
/// # Note
///
/// `Buffer` only drops the underlying allocation; it does **not** drop any
/// `T` present in the allocated memory. Every [`crate::element::Element`]
/// has no `Drop` glue, so this is never a concern for
/// [`crate::container::Container`], the only caller.
#[derive(Debug)]
pub struct Buffer<T> {
    /// Pointer to start of allocation.
    ptr: NonNull<T>,
    /// Number of elements originally requested (`numel`).
    numel: usize,
    /// Full layout used during allocation (includes padding).
    layout: Layout,
    _marker: PhantomData<T>,
}

/// Builder for constructing a [`Buffer`] with custom settings.
pub struct BufferBuilder<I, A>
where
    A: AlignmentStrategy,
    I: InitStrategy,
{
    numel: usize,
    _marker: PhantomData<(A, I)>,
}

// The default constructor sets default policies: zero-initialized, SIMD
// alignment. Every `Element` needs a meaningful zero value so there is no
// `Uninitialized`-by-default entry point on the public builder.
impl BufferBuilder<Zeroed, SimdAlignment> {
    pub fn new(numel: usize) -> Self {
        Self {
            numel,
            _marker: PhantomData,
        }
    }
}

impl<I: InitStrategy, A: AlignmentStrategy> BufferBuilder<I, A> {
    #[must_use]
    pub fn with_alignment<const ALIGN: usize>(self) -> BufferBuilder<I, CustomAlignment<ALIGN>> {
        BufferBuilder {
            numel: self.numel,
            _marker: PhantomData,
        }
    }

    pub fn build<T>(self) -> Result<Buffer<T>, Error> {
        Buffer::with_alignment::<I, A>(self.numel)
    }
}

impl<T> Buffer<T> {
    /// Allocates a buffer for `numel` elements of `T`, aligned per `Align`
    /// and initialized per `I`.
    ///
    /// # Panics
    ///
    /// Panics if `T` is a zero-sized type or `numel` is 0 — callers
    /// ([`crate::container::Container`]) special-case zero-size shapes
    /// before reaching here, so both are programmer-error preconditions
    /// rather than recoverable failures.
    fn with_alignment<I: InitStrategy, Align: AlignmentStrategy>(
        numel: usize,
    ) -> Result<Self, Error> {
        assert!((std::mem::size_of::<T>() != 0), "ZSTs are not supported.");
        assert!(
            (numel != 0),
            "zero-sized buffers (numel=0) are not supported."
        );

        let align = Align::alignment::<T>();
        let size = self::utils::align_to::<T>(numel, align);
        let layout = Layout::from_size_align(size, align).unwrap_or_else(|_| {
            panic!("layout creation should have valid alignment: {align} and length: {numel}")
        });

        let Some(ptr) = I::allocate(layout) else {
            return Err(Error::AllocationFailed {
                size: layout.size(),
                align: layout.align(),
            });
        };

        #[cfg(debug_assertions)]
        // SAFETY:
        // - this code only runs in debug builds.
        // - `ptr.as_ptr()` is a valid non-null aligned pointer to allocated memory.
        // - `size` is the number of *bytes* in the array.
        unsafe {
            // poison buffer, then re-zero the logical region below so debug
            // and release builds observe the same initial contents.
            std::ptr::write_bytes(ptr.as_ptr(), 0xAB, size);
            std::ptr::write_bytes(ptr.as_ptr(), 0, numel * std::mem::size_of::<T>());
        }

        zero_trailing_bytes::<T>(ptr.as_ptr(), numel, size);

        Ok(Buffer {
            ptr: ptr.cast(),
            layout,
            numel,
            _marker: PhantomData,
        })
    }

    /// Returns the internal pointer to the underlying memory.
    #[inline]
    pub fn as_ptr(&self) -> *const T {
        self.ptr.as_ptr()
    }

    /// Returns a mutable internal pointer to the underlying memory.
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.ptr.as_ptr()
    }

    /// Returns the underlying layout.
    #[inline]
    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Returns the number of elements originally requested (logical
    /// length).
    #[inline]
    pub fn numel(&self) -> usize {
        self.numel
    }

    /// Returns a slice over the logical allocated region.
    ///
    /// Sound unconditionally: every element in `[0, numel)` is initialized
    /// by construction ([`BufferBuilder`] only exposes the `Zeroed` init
    /// strategy).
    pub fn as_slice(&self) -> &[T] {
        // SAFETY:
        // - `self.as_ptr()` returns a valid, non-null, aligned pointer.
        // - `self.numel()` elements starting there are initialized.
        unsafe { std::slice::from_raw_parts(self.as_ptr(), self.numel()) }
    }

    /// Returns a mutable slice over the logical allocated region.
    pub fn as_slice_mut(&mut self) -> &mut [T] {
        // SAFETY:
        // - `as_mut_ptr` is a valid, non-null, aligned pointer.
        // - `self.numel()` elements starting there are initialized.
        unsafe { std::slice::from_raw_parts_mut(self.as_mut_ptr(), self.numel()) }
    }
}

impl<T> Drop for Buffer<T> {
    /// Deallocates the buffer. Does **not** drop any `T`s.
    fn drop(&mut self) {
        // SAFETY:
        // - `self.ptr` was allocated from the global allocator with `self.layout`.
        // - `self.layout` is unchanged since allocation.
        unsafe {
            std::alloc::dealloc(self.ptr.as_ptr().cast::<u8>(), self.layout());
        }
    }
}

mod utils {
    /// Returns allocation size (in bytes) for `numel` elements of `T`,
    /// rounded up to the nearest multiple of `align`.
    #[inline]
    pub fn align_to<T>(numel: usize, align: usize) -> usize {
        let tsize = std::mem::size_of::<T>();

        let size_in_bytes = numel
            .checked_mul(tsize)
            .unwrap_or_else(|| panic!("numel {numel} * tsize {tsize} overflowed."));

        (size_in_bytes + align - 1) & !(align - 1)
    }

    /// Fills trailing padding bytes with zeroes (if any).
    ///
    /// This is useful when SIMD loads might read past initialized data.
    /// Does nothing if `length * size_of::<T>() >= size`.
    #[inline]
    pub fn zero_trailing_bytes<T>(ptr: *mut T, length: usize, size: usize) {
        let start_offset = length * std::mem::size_of::<T>();
        if start_offset >= size {
            return;
        }

        let pad_bytes = size - start_offset;

        // SAFETY:
        // - `base.add(start_offset)` is within the allocation of `size` bytes.
        unsafe {
            std::ptr::write_bytes(ptr.cast::<u8>().add(start_offset), 0, pad_bytes);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zeroed_buffer_reads_back_zero() {
        let buf = BufferBuilder::new(8).build::<f64>().unwrap();
        assert_eq!(buf.as_slice(), &[0.0; 8]);
    }

    #[test]
    fn numel_matches_request() {
        let buf = BufferBuilder::new(5).build::<i32>().unwrap();
        assert_eq!(buf.numel(), 5);
    }

    #[test]
    fn mutation_is_visible_through_as_slice() {
        let mut buf = BufferBuilder::new(4).build::<i32>().unwrap();
        buf.as_slice_mut()[2] = 42;
        assert_eq!(buf.as_slice(), &[0, 0, 42, 0]);
    }
}
