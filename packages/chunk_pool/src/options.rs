use std::fmt;

/// Checks that `size * count` describes a storage region that can actually
/// exist: non-zero, representable by `usize`, and no larger than
/// `isize::MAX` so that every byte is addressable by offset from a base
/// pointer.
#[allow(
    clippy::cast_sign_loss,
    reason = "isize::MAX is non-negative by definition"
)]
const fn valid_sizeof(size: usize, count: usize) -> bool {
    if size == 0 || count == 0 {
        return false;
    }

    if size > usize::MAX / count {
        return false;
    }

    size * count <= isize::MAX as usize
}

/// Describes the blocks of a [`ChunkResource`][crate::ChunkResource]:
/// how large each block is, how it is aligned, and how many blocks the
/// resource owns.
///
/// Options are plain values. They become binding when a resource is built
/// from them, at which point they are [normalized](Self::normalized) so the
/// pool internals can rely on `block_align` dividing `block_size`.
///
/// Two option sets compare lexicographically on
/// `(block_size, block_align, block_count)`.
///
/// # Examples
///
/// ```
/// use chunk_pool::ChunkOptions;
///
/// let options = ChunkOptions {
///     block_size: 3,
///     block_align: 4,
///     block_count: 5,
/// };
///
/// assert!(options.is_valid());
///
/// // Normalization pads the size up to a multiple of the alignment.
/// let normalized = options.normalized();
/// assert_eq!(normalized.block_size, 4);
/// assert_eq!(normalized.block_align, 4);
/// assert_eq!(normalized.block_count, 5);
/// ```
// Field order is load-bearing: the derived `Ord` must compare
// size, then align, then count.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ChunkOptions {
    /// Size in bytes of every block. Requests larger than this are rejected.
    pub block_size: usize,

    /// Alignment in bytes of every block. Must be a power of two.
    pub block_align: usize,

    /// Number of blocks the resource owns. Fixed for the resource's life.
    pub block_count: usize,
}

impl ChunkOptions {
    /// The largest alignment [`normalized()`](Self::normalized) will raise
    /// `block_align` to on its own.
    ///
    /// This matches the strongest alignment the global allocator guarantees
    /// for ordinary allocations on mainstream targets. Blocks with a larger
    /// alignment are available, but only by explicitly requesting one via
    /// `block_align`.
    pub const MAX_DEFAULT_ALIGN: usize = align_of::<u128>();

    /// Checks all fields are in a valid state, separately and together.
    ///
    /// Valid means: `block_size` and `block_count` are non-zero,
    /// `block_align` is a power of two, and `block_size * block_count`
    /// neither overflows `usize` nor exceeds `isize::MAX`.
    ///
    /// # Examples
    ///
    /// ```
    /// use chunk_pool::ChunkOptions;
    ///
    /// let options = ChunkOptions {
    ///     block_size: 16,
    ///     block_align: 3,
    ///     block_count: 4,
    /// };
    ///
    /// // 3 is not a power of two.
    /// assert!(!options.is_valid());
    /// ```
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        valid_sizeof(self.block_size, self.block_count) && self.block_align.is_power_of_two()
    }

    /// Returns the options with the padding and alignment rules applied.
    ///
    /// The size becomes the smallest multiple of `block_align` not less than
    /// `block_size`. The alignment is raised to the largest power of two
    /// dividing the padded size, but never past
    /// [`MAX_DEFAULT_ALIGN`](Self::MAX_DEFAULT_ALIGN) unless the caller
    /// already asked for more. Normalization is idempotent and never changes
    /// `block_count`; the result always satisfies
    /// `block_size % block_align == 0`.
    ///
    /// Padding the size does not make blocks take up any more space than
    /// they would once laid out in an aligned array.
    ///
    /// # Panics
    ///
    /// Panics if `self` is not [valid](Self::is_valid).
    #[must_use]
    pub const fn normalized(&self) -> Self {
        assert!(
            self.is_valid(),
            "normalized() requires valid chunk options"
        );

        // Smallest multiple of block_align not less than block_size. The sum
        // cannot overflow: block_size <= isize::MAX and block_align is a
        // power of two representable in usize.
        let size = (self.block_size + self.block_align - 1) & !(self.block_align - 1);

        // Raise the alignment to the largest power of two the padded size is
        // divisible by, without increasing padding. Going past
        // MAX_DEFAULT_ALIGN requires the caller to have set block_align
        // larger to begin with.
        let mut align = self.block_align;
        if align < Self::MAX_DEFAULT_ALIGN {
            align = size & size.wrapping_neg();
            if align > Self::MAX_DEFAULT_ALIGN {
                align = Self::MAX_DEFAULT_ALIGN;
            }
        }

        Self {
            block_size: size,
            block_align: align,
            block_count: self.block_count,
        }
    }

    /// Checks whether one block can hold `n` objects of type `T`.
    ///
    /// True iff `n * size_of::<T>()` does not overflow, the product fits in
    /// `block_size`, and `align_of::<T>()` does not exceed `block_align`.
    /// The block count is not a concern here; the alignment is, even for
    /// `n == 0`.
    ///
    /// # Examples
    ///
    /// ```
    /// use chunk_pool::ChunkOptions;
    ///
    /// let options = ChunkOptions {
    ///     block_size: 16,
    ///     block_align: 8,
    ///     block_count: 4,
    /// };
    ///
    /// assert!(options.fits::<u32>(4));
    /// assert!(!options.fits::<u32>(5));
    /// assert!(!options.fits::<u128>(1)); // alignment 16 exceeds 8
    /// ```
    #[must_use]
    pub const fn fits<T>(&self, n: usize) -> bool {
        match size_of::<T>().checked_mul(n) {
            Some(total) => total <= self.block_size && align_of::<T>() <= self.block_align,
            None => false,
        }
    }
}

impl fmt::Display for ChunkOptions {
    /// Outputs `{.block_size=S, .block_align=A, .block_count=C}` with
    /// decimal values.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{.block_size={}, .block_align={}, .block_count={}}}",
            self.block_size, self.block_align, self.block_count
        )
    }
}
