//! Memory allocation policies for buffers.
//!
//! This module provides strategy traits that control how memory is allocated
//! and aligned, built on the stable global-allocator functions
//! (`std::alloc::{alloc, alloc_zeroed, dealloc}`) rather than the unstable
//! `Allocator` trait — an unstable-only bound would make every downstream
//! crate require nightly Rust for no benefit here.

use std::alloc::Layout;
use std::ptr::NonNull;

/// Strategy for initializing allocated memory.
pub trait InitStrategy {
    /// Allocates `layout` bytes from the global allocator according to the
    /// strategy's initialization policy.
    ///
    /// Returns `None` if the global allocator refuses the request.
    fn allocate(layout: Layout) -> Option<NonNull<u8>>;
}

/// Strategy for determining memory alignment requirements.
///
/// Implementations define alignment based on target architecture, SIMD
/// capabilities, or custom requirements. All alignment calculations are
/// performed at compile time.
pub trait AlignmentStrategy {
    /// Returns the required memory alignment for type `T`.
    ///
    /// Always a power of two.
    fn alignment<T>() -> usize;
}

/// SIMD-optimized alignment strategy.
///
/// Automatically selects optimal alignment based on target architecture and
/// available SIMD instruction sets:
/// - **`ARM64 with NEON`**: 16-byte alignment
/// - **`x86/x86_64` with AVX2**: 32-byte alignment
/// - **Fallback**: uses `align_of::<T>()`
///
/// All alignment decisions are made at compile time using `cfg!` macros.
pub struct SimdAlignment;

/// 16-byte alignment for ARM NEON SIMD operations.
const NEON_ALIGN: usize = 16;

/// 32-byte alignment for x86 AVX2 SIMD operations.
const AVX2_ALIGN: usize = 32;

impl AlignmentStrategy for SimdAlignment {
    /// Returns SIMD-optimal alignment for the target architecture.
    ///
    /// # Panics
    ///
    /// Panics if the computed alignment is not a power of two (which should
    /// never happen with valid SIMD alignments).
    fn alignment<T>() -> usize {
        let ret = if cfg!(all(target_feature = "neon", target_arch = "aarch64")) {
            NEON_ALIGN
        } else if cfg!(all(
            target_feature = "avx2",
            any(target_arch = "x86", target_arch = "x86_64")
        )) {
            AVX2_ALIGN
        } else {
            std::mem::align_of::<T>()
        };
        assert!(ret.is_power_of_two());
        ret
    }
}

/// Custom alignment strategy with compile-time specified alignment.
///
/// Provides a fixed alignment value specified as a const generic parameter.
/// Useful when you need specific alignment requirements that differ from
/// SIMD defaults (e.g. cache-line alignment).
pub struct CustomAlignment<const ALIGN: usize>;

impl<const ALIGN: usize> AlignmentStrategy for CustomAlignment<ALIGN> {
    /// Returns the custom alignment value.
    ///
    /// # Panics
    ///
    /// Panics if `ALIGN` is not a power of two.
    fn alignment<T>() -> usize {
        assert!(ALIGN.is_power_of_two());
        ALIGN
    }
}

/// Uninitialized memory allocation strategy.
///
/// Allocates memory without initializing it, leaving the contents undefined.
/// This is the fastest allocation strategy.
///
/// # Safety
///
/// Memory allocated with this strategy contains undefined values. Callers
/// must initialize all memory before reading from it.
pub struct Uninitialized;
impl InitStrategy for Uninitialized {
    fn allocate(layout: Layout) -> Option<NonNull<u8>> {
        // SAFETY: `layout` is non-zero size (callers guarantee this before
        // invoking any strategy).
        let ptr = unsafe { std::alloc::alloc(layout) };
        NonNull::new(ptr)
    }
}

/// Zero-initialized memory allocation strategy.
///
/// Allocates memory and initializes all bytes to zero. Slightly more costly
/// than [`Uninitialized`] but required whenever the element type's
/// zero-bit-pattern is a meaningful default (every [`crate::element::Element`]
/// qualifies, which is why [`crate::container::Container`] always uses this
/// strategy).
pub struct Zeroed;
impl InitStrategy for Zeroed {
    fn allocate(layout: Layout) -> Option<NonNull<u8>> {
        // SAFETY: `layout` is non-zero size (callers guarantee this before
        // invoking any strategy).
        let ptr = unsafe { std::alloc::alloc_zeroed(layout) };
        NonNull::new(ptr)
    }
}
