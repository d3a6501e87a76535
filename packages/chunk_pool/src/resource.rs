use std::fmt;
use std::ptr::NonNull;

use crate::{
    AllocError, BlockIndex, BlockPool, ChunkOptions, ChunkResourceBuilder, DropPolicy,
};

/// A fixed-size-block memory resource.
///
/// The resource pre-reserves `block_count` storage blocks of `block_size`
/// bytes at `block_align` and hands them out one at a time: allocation is
/// O(1), release is O(1) for stack-like patterns, and misuse (a foreign
/// pointer, a double free) is caught by cheap precondition checks. It is
/// meant for short-lived objects in hot paths where the maximum object size
/// is known up front and a general-purpose allocator is too expensive.
///
/// One resource owns a self-contained pool; distinct resources never share
/// storage. The only address shared between resources is the zero-block
/// sentinel returned for zero-byte requests, which identifies no usable
/// memory.
///
/// # Key properties
///
/// - **Fixed capacity**: the pool never grows; an exhausted pool reports
///   [`AllocError::OutOfMemory`].
/// - **Uniform blocks**: every request is served by one whole block; sizes
///   above `block_size` are rejected, smaller ones waste the tail.
/// - **Stable addresses**: storage is heap-backed, so block addresses
///   survive moves of the resource value.
/// - **Misuse detection**: deallocation asserts that the pointer is owned
///   and currently allocated.
/// - **Defragmentation on demand**: [`defrag()`](Self::defrag) and
///   [`defrag_optimistic()`](Self::defrag_optimistic) restore low-to-high
///   allocation order after scrambled releases.
///
/// The index type parameter `I` sets the width of the internal index stack
/// elements; see [`BlockIndex`]. The default `usize` is always wide enough.
///
/// # Thread safety
///
/// The resource is single-owner: thread-mobile ([`Send`]) but not [`Sync`],
/// and allocation requires `&mut self`.
///
/// # Examples
///
/// ```
/// use chunk_pool::{ChunkOptions, ChunkResource};
///
/// let mut resource: ChunkResource = ChunkResource::new(ChunkOptions {
///     block_size: 64,
///     block_align: 8,
///     block_count: 4,
/// });
///
/// let block = resource.allocate_bytes(48)?;
/// assert!(resource.maybe_owns(block.as_ptr()));
/// assert_eq!(resource.available_blocks(), 3);
///
/// resource.deallocate_bytes(block.as_ptr(), 48);
/// assert_eq!(resource.available_blocks(), 4);
/// # Ok::<(), chunk_pool::AllocError>(())
/// ```
#[derive(Debug)]
pub struct ChunkResource<I: BlockIndex = usize> {
    pool: BlockPool<I>,
}

impl ChunkResource {
    /// Creates a resource for the given options with the default
    /// [`DropPolicy`] and `usize` index stack elements.
    ///
    /// Use [`builder()`](Self::builder) to pick a drop policy or a narrower
    /// index type.
    ///
    /// # Panics
    ///
    /// Panics if the options are not [valid][ChunkOptions::is_valid] or if
    /// the host allocator cannot provide the storage.
    #[must_use]
    pub fn new(options: ChunkOptions) -> Self {
        Self::new_inner(options, DropPolicy::default())
    }

    /// Creates a builder for configuring and constructing a
    /// [`ChunkResource`].
    ///
    /// # Examples
    ///
    /// ```
    /// use chunk_pool::ChunkResource;
    ///
    /// let resource: ChunkResource = ChunkResource::builder()
    ///     .block_size(16)
    ///     .block_align(8)
    ///     .block_count(4)
    ///     .build();
    ///
    /// assert_eq!(resource.available_blocks(), 4);
    /// ```
    #[inline]
    pub fn builder() -> ChunkResourceBuilder {
        ChunkResourceBuilder::new()
    }
}

impl<I: BlockIndex> ChunkResource<I> {
    /// Creates the resource. Used internally by the builder and by
    /// [`new()`](ChunkResource::new).
    #[must_use]
    pub(crate) fn new_inner(options: ChunkOptions, drop_policy: DropPolicy) -> Self {
        Self {
            pool: BlockPool::new(options, drop_policy),
        }
    }

    /// The normalized options this resource was built from.
    ///
    /// These may differ from what was passed in: the size is padded to a
    /// multiple of the alignment and the alignment may have been raised; see
    /// [`ChunkOptions::normalized`].
    #[must_use]
    pub fn options(&self) -> ChunkOptions {
        self.pool.options()
    }

    /// The number of blocks available to be allocated.
    ///
    /// If this is zero, non-zero-sized allocation will unconditionally fail.
    #[must_use]
    pub fn available_blocks(&self) -> usize {
        self.pool.available_count()
    }

    /// Checks whether `ptr` may point into this resource's storage.
    ///
    /// This is **not** a validity check for deallocation: it reports true
    /// for pointers into the middle of blocks, and false for null and for
    /// the zero-byte sentinel even though both are fine to pass to
    /// [`deallocate_bytes`](Self::deallocate_bytes). Its purpose is to
    /// disambiguate memory between resources with non-overlapping storage:
    /// if it reports true, no other live resource owns the pointer.
    #[must_use]
    pub fn maybe_owns(&self, ptr: *const u8) -> bool {
        self.pool.is_maybe_owned(ptr)
    }

    /// Sorts the free blocks so subsequent allocations proceed from the
    /// lowest address upward.
    ///
    /// Releasing blocks out of allocation order scrambles the internal free
    /// stack (release is O(1) by swapping, not shifting). Calling this at
    /// the start of a major allocation cycle restores spatial locality.
    /// Prefer this over [`defrag_optimistic`](Self::defrag_optimistic) when
    /// releases so far have *not* followed a stack-like pattern.
    pub fn defrag(&mut self) {
        self.pool.defrag();
    }

    /// Same effect as [`defrag`](Self::defrag), optimized for the case
    /// where releases have (mostly) followed a stack-like pattern already.
    ///
    /// Runs in linear time on an already-ordered free stack, degrading to
    /// quadratic on heavily scrambled input.
    pub fn defrag_optimistic(&mut self) {
        self.pool.defrag_optimistic();
    }

    /// Allocates `n` bytes of storage: one whole block, or the shared
    /// zero-byte sentinel for `n == 0`.
    ///
    /// The returned pointer is aligned to `block_align`. The sentinel
    /// consumes no block, identifies no usable memory, and is accepted by
    /// [`deallocate_bytes`](Self::deallocate_bytes) as a no-op.
    ///
    /// # Errors
    ///
    /// [`AllocError::UnsupportedSize`] if `n` exceeds the block size;
    /// [`AllocError::OutOfMemory`] if `n > 0` and no block is free.
    ///
    /// # Examples
    ///
    /// ```
    /// use chunk_pool::{AllocError, ChunkOptions, ChunkResource};
    ///
    /// let mut resource: ChunkResource = ChunkResource::new(ChunkOptions {
    ///     block_size: 8,
    ///     block_align: 8,
    ///     block_count: 1,
    /// });
    ///
    /// let block = resource.allocate_bytes(8)?;
    ///
    /// // One block, and it is taken now.
    /// assert_eq!(resource.allocate_bytes(1), Err(AllocError::OutOfMemory));
    ///
    /// // Requests beyond the block size are never servable.
    /// assert_eq!(
    ///     resource.allocate_bytes(9),
    ///     Err(AllocError::UnsupportedSize { size: 9, max_size: 8 })
    /// );
    ///
    /// resource.deallocate_bytes(block.as_ptr(), 8);
    /// # Ok::<(), AllocError>(())
    /// ```
    pub fn allocate_bytes(&mut self, n: usize) -> Result<NonNull<u8>, AllocError> {
        let options = self.pool.options();

        if n > options.block_size {
            return Err(AllocError::UnsupportedSize {
                size: n,
                max_size: options.block_size,
            });
        }

        if n != 0 && self.pool.available_count() == 0 {
            return Err(AllocError::OutOfMemory);
        }

        if n == 0 {
            return Ok(self.pool.zero_block());
        }

        Ok(self.pool.obtain_unchecked())
    }

    /// Allocates `n` bytes of storage, checking that `align` can be
    /// honored.
    ///
    /// Blocks are always aligned to `block_align`, so any valid `align` up
    /// to that is satisfied for free.
    ///
    /// # Errors
    ///
    /// [`AllocError::InvalidAlign`] if `align` is not a power of two;
    /// [`AllocError::UnsupportedAlign`] if it exceeds the block alignment;
    /// otherwise as [`allocate_bytes`](Self::allocate_bytes).
    pub fn allocate_bytes_aligned(
        &mut self,
        n: usize,
        align: usize,
    ) -> Result<NonNull<u8>, AllocError> {
        if !align.is_power_of_two() {
            return Err(AllocError::InvalidAlign { align });
        }

        let max_align = self.pool.options().block_align;
        if align > max_align {
            return Err(AllocError::UnsupportedAlign { align, max_align });
        }

        self.allocate_bytes(n)
    }

    /// Allocates `n` bytes of storage, returning `None` instead of an error
    /// on failure.
    ///
    /// The failure conditions are exactly those of
    /// [`allocate_bytes`](Self::allocate_bytes); this path never constructs
    /// an error value.
    pub fn try_allocate_bytes(&mut self, n: usize) -> Option<NonNull<u8>> {
        let options = self.pool.options();

        if n > options.block_size || (n != 0 && self.pool.available_count() == 0) {
            return None;
        }

        if n == 0 {
            return Some(self.pool.zero_block());
        }

        Some(self.pool.obtain_unchecked())
    }

    /// Allocates `n` bytes of storage checking `align`, returning `None`
    /// instead of an error on failure.
    pub fn try_allocate_bytes_aligned(&mut self, n: usize, align: usize) -> Option<NonNull<u8>> {
        if !align.is_power_of_two() || align > self.pool.options().block_align {
            return None;
        }

        self.try_allocate_bytes(n)
    }

    /// Allocates storage suitable for `n` objects of type `T` and returns
    /// it as a typed pointer.
    ///
    /// The storage is one whole block (or the zero-byte sentinel for
    /// `n == 0`); nothing is written to it and no `T` is constructed.
    /// `size_of::<T>() * n` must fit in one block and `align_of::<T>()`
    /// must not exceed the block alignment.
    ///
    /// # Errors
    ///
    /// [`AllocError::ArrayLength`] if `n * size_of::<T>()` is not a
    /// representable allocation size; [`AllocError::UnsupportedAlign`],
    /// [`AllocError::UnsupportedSize`] and [`AllocError::OutOfMemory`] as
    /// for the byte path.
    ///
    /// # Examples
    ///
    /// ```
    /// use chunk_pool::{ChunkOptions, ChunkResource};
    ///
    /// let mut resource: ChunkResource = ChunkResource::new(ChunkOptions {
    ///     block_size: 64,
    ///     block_align: 8,
    ///     block_count: 2,
    /// });
    ///
    /// let values = resource.allocate_object::<u64>(8)?;
    ///
    /// // SAFETY: The block holds 8 u64 values and is exclusively ours.
    /// unsafe {
    ///     for offset in 0..8 {
    ///         values.add(offset).write(offset as u64);
    ///     }
    ///     assert_eq!(values.add(7).read(), 7);
    /// }
    ///
    /// resource.deallocate_object(values.as_ptr(), 8);
    /// # Ok::<(), chunk_pool::AllocError>(())
    /// ```
    #[allow(
        clippy::cast_sign_loss,
        reason = "isize::MAX is non-negative by definition"
    )]
    pub fn allocate_object<T>(&mut self, n: usize) -> Result<NonNull<T>, AllocError> {
        let options = self.pool.options();

        let size = match size_of::<T>().checked_mul(n) {
            Some(total) if total <= isize::MAX as usize => total,
            _ => {
                return Err(AllocError::ArrayLength {
                    count: n,
                    elem_size: size_of::<T>(),
                });
            }
        };

        if align_of::<T>() > options.block_align {
            return Err(AllocError::UnsupportedAlign {
                align: align_of::<T>(),
                max_align: options.block_align,
            });
        }

        if size > options.block_size {
            return Err(AllocError::UnsupportedSize {
                size,
                max_size: options.block_size,
            });
        }

        if n != 0 && self.pool.available_count() == 0 {
            return Err(AllocError::OutOfMemory);
        }

        if n == 0 {
            return Ok(self.pool.zero_block().cast());
        }

        Ok(self.pool.obtain_unchecked().cast())
    }

    /// Allocates storage for `n` objects of type `T`, checking that an
    /// explicit `align` can be honored.
    ///
    /// An `align` that is valid but smaller than `align_of::<T>()` is
    /// ignored; the stronger natural alignment wins.
    ///
    /// # Errors
    ///
    /// [`AllocError::InvalidAlign`] if `align` is not a power of two;
    /// [`AllocError::UnsupportedAlign`] if it exceeds the block alignment;
    /// otherwise as [`allocate_object`](Self::allocate_object).
    pub fn allocate_object_aligned<T>(
        &mut self,
        n: usize,
        align: usize,
    ) -> Result<NonNull<T>, AllocError> {
        if !align.is_power_of_two() {
            return Err(AllocError::InvalidAlign { align });
        }

        let max_align = self.pool.options().block_align;
        if align > max_align {
            return Err(AllocError::UnsupportedAlign { align, max_align });
        }

        self.allocate_object::<T>(n)
    }

    /// Allocates storage for `n` objects of type `T`, returning `None`
    /// instead of an error on failure.
    #[allow(
        clippy::cast_sign_loss,
        reason = "isize::MAX is non-negative by definition"
    )]
    pub fn try_allocate_object<T>(&mut self, n: usize) -> Option<NonNull<T>> {
        let options = self.pool.options();

        let size = match size_of::<T>().checked_mul(n) {
            Some(total) if total <= isize::MAX as usize => total,
            _ => return None,
        };

        if align_of::<T>() > options.block_align
            || size > options.block_size
            || (n != 0 && self.pool.available_count() == 0)
        {
            return None;
        }

        if n == 0 {
            return Some(self.pool.zero_block().cast());
        }

        Some(self.pool.obtain_unchecked().cast())
    }

    /// Allocates storage for `n` objects of type `T` checking `align`,
    /// returning `None` instead of an error on failure.
    pub fn try_allocate_object_aligned<T>(&mut self, n: usize, align: usize) -> Option<NonNull<T>> {
        if !align.is_power_of_two() || align > self.pool.options().block_align {
            return None;
        }

        self.try_allocate_object::<T>(n)
    }

    /// Returns the block at `ptr` to the pool.
    ///
    /// Null and the zero-byte sentinel are accepted and ignored. The byte
    /// count is recorded in the signature for symmetry with allocation and
    /// is not consulted.
    ///
    /// # Panics
    ///
    /// Panics if `ptr` is non-null, not the sentinel, and either not
    /// allocated by this resource ("invalid pointer") or already free
    /// ("double free").
    pub fn deallocate_bytes(&mut self, ptr: *mut u8, _n: usize) {
        if ptr.is_null() || ptr.addr() == self.pool.zero_block().addr().get() {
            return;
        }

        assert!(
            self.pool.is_owned(ptr),
            "invalid pointer: not allocated by this memory resource"
        );

        let token = self
            .pool
            .is_allocated(ptr)
            .expect("double free: block is already available");
        self.pool.return_unchecked(token);
    }

    /// Returns the block holding `n` objects of type `T` at `ptr` to the
    /// pool.
    ///
    /// The element count mirrors the allocation call and is not consulted.
    ///
    /// # Panics
    ///
    /// As [`deallocate_bytes`](Self::deallocate_bytes).
    pub fn deallocate_object<T>(&mut self, ptr: *mut T, _n: usize) {
        if ptr.is_null() {
            return;
        }

        let bytes = ptr.cast::<u8>();
        if bytes.addr() == self.pool.zero_block().addr().get() {
            return;
        }

        assert!(
            self.pool.is_owned(bytes),
            "invalid pointer: not allocated by this memory resource"
        );

        let token = self
            .pool
            .is_allocated(bytes)
            .expect("double free: block is already available");
        self.pool.return_unchecked(token);
    }
}

impl<I: BlockIndex> PartialEq for ChunkResource<I> {
    /// Identity comparison: no two distinct resources compare equal, even
    /// when built from equal options.
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
    }
}

impl<I: BlockIndex> Eq for ChunkResource<I> {}

impl<I: BlockIndex> fmt::Display for ChunkResource<I> {
    /// Outputs `chunk_resource<{.block_size=S, .block_align=A,
    /// .block_count=C}>` using the normalized option values.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chunk_resource<{}>", self.options())
    }
}

#[cfg(test)]
mod tests {
    use std::fmt::{Debug, Display};

    use static_assertions::{assert_impl_all, assert_not_impl_any};

    use super::*;

    assert_impl_all!(ChunkResource<usize>: Send, Debug, Display);
    assert_impl_all!(ChunkResource<u8>: Send);
    assert_not_impl_any!(ChunkResource<usize>: Sync, Clone);

    fn resource(size: usize, align: usize, count: usize) -> ChunkResource {
        ChunkResource::new(ChunkOptions {
            block_size: size,
            block_align: align,
            block_count: count,
        })
    }

    #[test]
    fn options_are_normalized() {
        let resource = resource(3, 4, 5);
        assert_eq!(
            resource.options(),
            ChunkOptions {
                block_size: 4,
                block_align: 4,
                block_count: 5,
            }
        );
    }

    #[test]
    fn allocation_gating_rejects_oversized_requests() {
        let mut resource = resource(8, 8, 2);

        assert_eq!(
            resource.allocate_bytes(9),
            Err(AllocError::UnsupportedSize {
                size: 9,
                max_size: 8
            })
        );
        assert_eq!(resource.try_allocate_bytes(9), None);
    }

    #[test]
    fn allocation_gating_rejects_bad_aligns() {
        let mut resource = resource(8, 8, 2);

        assert_eq!(
            resource.allocate_bytes_aligned(1, 3),
            Err(AllocError::InvalidAlign { align: 3 })
        );
        assert_eq!(
            resource.allocate_bytes_aligned(1, 16),
            Err(AllocError::UnsupportedAlign {
                align: 16,
                max_align: 8
            })
        );
        assert_eq!(resource.try_allocate_bytes_aligned(1, 3), None);
        assert_eq!(resource.try_allocate_bytes_aligned(1, 16), None);

        // A valid align within bounds is satisfied.
        let block = resource
            .allocate_bytes_aligned(8, 4)
            .expect("supported align must be accepted");
        resource.deallocate_bytes(block.as_ptr(), 8);
    }

    #[test]
    fn exhaustion_reports_out_of_memory() {
        let mut resource = resource(8, 8, 1);

        let block = resource.allocate_bytes(1).expect("one block is free");
        assert_eq!(resource.allocate_bytes(1), Err(AllocError::OutOfMemory));
        assert_eq!(resource.try_allocate_bytes(1), None);

        resource.deallocate_bytes(block.as_ptr(), 1);
        assert!(resource.allocate_bytes(1).is_ok());
    }

    #[test]
    fn zero_byte_requests_share_the_sentinel_and_consume_nothing() {
        let mut resource = resource(1, 1, 3);

        let a = resource.allocate_bytes(0).expect("zero-size always works");
        let b = resource.allocate_bytes(0).expect("zero-size always works");
        let c = resource
            .try_allocate_bytes(0)
            .expect("zero-size always works");

        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(resource.available_blocks(), 3);
        assert!(!resource.maybe_owns(a.as_ptr()));

        // Releasing the sentinel is a no-op.
        resource.deallocate_bytes(a.as_ptr(), 0);
        assert_eq!(resource.available_blocks(), 3);
    }

    #[test]
    fn zero_byte_requests_succeed_even_when_exhausted() {
        let mut resource = resource(8, 8, 1);

        let block = resource.allocate_bytes(8).expect("one block is free");
        let sentinel = resource
            .allocate_bytes(0)
            .expect("the sentinel needs no block");
        assert!(!resource.maybe_owns(sentinel.as_ptr()));

        resource.deallocate_bytes(block.as_ptr(), 8);
    }

    #[test]
    fn typed_allocation_round_trips() {
        let mut resource = resource(64, 8, 2);

        let values = resource
            .allocate_object::<u64>(8)
            .expect("8 u64 values fill one block exactly");
        assert_eq!(values.addr().get() % align_of::<u64>(), 0);
        assert_eq!(resource.available_blocks(), 1);

        resource.deallocate_object(values.as_ptr(), 8);
        assert_eq!(resource.available_blocks(), 2);
    }

    #[test]
    fn typed_allocation_gating() {
        // 40 keeps the normalized alignment at 8: the largest power of two
        // dividing 40 is 8, so normalization does not raise it.
        let mut resource = resource(40, 8, 2);

        // 6 * 8 = 48 > 40.
        assert_eq!(
            resource.allocate_object::<u64>(6),
            Err(AllocError::UnsupportedSize {
                size: 48,
                max_size: 40
            })
        );

        // u128 wants 16-byte alignment, the blocks only give 8.
        assert_eq!(
            resource.allocate_object::<u128>(1),
            Err(AllocError::UnsupportedAlign {
                align: 16,
                max_align: 8
            })
        );

        // Element count whose byte size cannot be represented.
        assert_eq!(
            resource.allocate_object::<u64>(usize::MAX / 4),
            Err(AllocError::ArrayLength {
                count: usize::MAX / 4,
                elem_size: 8
            })
        );

        assert_eq!(resource.try_allocate_object::<u64>(6), None);
        assert_eq!(resource.try_allocate_object::<u128>(1), None);
        assert_eq!(resource.try_allocate_object::<u64>(usize::MAX / 4), None);
    }

    #[test]
    fn typed_aligned_allocation_ignores_weaker_aligns() {
        let mut resource = resource(40, 8, 2);

        // align 2 is valid but weaker than u64's natural 8; it is ignored.
        let values = resource
            .allocate_object_aligned::<u64>(4, 2)
            .expect("weaker explicit align defers to the natural one");
        assert_eq!(values.addr().get() % align_of::<u64>(), 0);

        resource.deallocate_object(values.as_ptr(), 4);

        assert_eq!(
            resource.allocate_object_aligned::<u64>(1, 3),
            Err(AllocError::InvalidAlign { align: 3 })
        );
        assert_eq!(
            resource.allocate_object_aligned::<u64>(1, 16),
            Err(AllocError::UnsupportedAlign {
                align: 16,
                max_align: 8
            })
        );
        assert_eq!(resource.try_allocate_object_aligned::<u64>(1, 3), None);
    }

    #[test]
    fn zero_count_typed_requests_use_the_sentinel() {
        let mut resource = resource(64, 8, 2);

        let empty = resource
            .allocate_object::<u64>(0)
            .expect("zero-length arrays always work");
        assert_eq!(resource.available_blocks(), 2);
        assert!(!resource.maybe_owns(empty.as_ptr().cast::<u8>()));

        resource.deallocate_object(empty.as_ptr(), 0);
        assert_eq!(resource.available_blocks(), 2);
    }

    #[test]
    fn deallocating_null_is_a_no_op() {
        let mut resource = resource(8, 8, 1);
        resource.deallocate_bytes(std::ptr::null_mut(), 4);
        resource.deallocate_object::<u64>(std::ptr::null_mut(), 1);
        assert_eq!(resource.available_blocks(), 1);
    }

    #[test]
    #[should_panic(expected = "invalid pointer")]
    fn deallocating_a_foreign_pointer_panics() {
        let mut resource = resource(8, 8, 1);

        let mut foreign = 0_u64;
        resource.deallocate_bytes(std::ptr::from_mut(&mut foreign).cast(), 8);
    }

    #[test]
    #[should_panic(expected = "double free")]
    fn double_free_is_detected() {
        let mut resource = resource(8, 8, 2);

        let block = resource.allocate_bytes(8).expect("blocks are free");
        resource.deallocate_bytes(block.as_ptr(), 8);
        resource.deallocate_bytes(block.as_ptr(), 8);
    }

    #[test]
    fn resources_compare_equal_only_to_themselves() {
        let a = resource(8, 8, 1);
        let b = resource(8, 8, 1);

        let same = &a;
        assert!(a == *same);
        assert_ne!(a, b);
    }

    #[test]
    fn display_uses_the_normalized_options() {
        let resource = resource(3, 4, 5);
        assert_eq!(
            resource.to_string(),
            "chunk_resource<{.block_size=4, .block_align=4, .block_count=5}>"
        );
    }
}
