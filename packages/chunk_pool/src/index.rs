use std::fmt::Debug;

mod sealed {
    pub trait Sealed {}

    impl Sealed for u8 {}
    impl Sealed for u16 {}
    impl Sealed for u32 {}
    impl Sealed for usize {}
}

/// An unsigned integer type usable as an element of a pool's index stack.
///
/// A [`ChunkResource<I>`][crate::ChunkResource] keeps one `I` per block, so
/// picking the narrowest type whose [`MAX`](Self::MAX) covers
/// `block_count - 1` shrinks the bookkeeping footprint: a 200-block pool
/// indexed by `u8` spends 200 bytes on its index stack instead of 1600.
/// Construction asserts that the block count actually fits.
///
/// This trait is sealed: it is implemented for `u8`, `u16`, `u32` and
/// `usize`, and cannot be implemented outside this crate.
///
/// # Examples
///
/// ```
/// use chunk_pool::{ChunkResource, ChunkOptions};
///
/// // 200 blocks index comfortably with u8 (indexes 0..=199).
/// let pool: ChunkResource<u8> = ChunkResource::builder()
///     .block_size(32)
///     .block_align(8)
///     .block_count(200)
///     .build();
///
/// assert_eq!(pool.available_blocks(), 200);
/// ```
pub trait BlockIndex: sealed::Sealed + Copy + Ord + Debug + Send + 'static {
    /// Largest block index this type can represent.
    const MAX: usize;

    /// Narrows a block index into this type.
    ///
    /// Callers must have established `index <= Self::MAX`; checked by a
    /// debug assertion.
    fn from_usize(index: usize) -> Self;

    /// Widens this index back to `usize`.
    fn into_usize(self) -> usize;
}

macro_rules! impl_block_index {
    ($($int:ty),* $(,)?) => {$(
        #[allow(
            clippy::unnecessary_cast,
            reason = "the macro also instantiates for usize, where the casts are identity"
        )]
        impl BlockIndex for $int {
            const MAX: usize = <$int>::MAX as usize;

            #[inline]
            #[allow(
                clippy::cast_possible_truncation,
                reason = "callers establish index <= Self::MAX before narrowing"
            )]
            fn from_usize(index: usize) -> Self {
                debug_assert!(
                    index <= <Self as BlockIndex>::MAX,
                    "block index {index} does not fit in {}",
                    stringify!($int)
                );

                index as $int
            }

            #[inline]
            fn into_usize(self) -> usize {
                self as usize
            }
        }
    )*};
}

impl_block_index!(u8, u16, u32, usize);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_values_match_the_underlying_types() {
        assert_eq!(<u8 as BlockIndex>::MAX, 255);
        assert_eq!(<u16 as BlockIndex>::MAX, 65_535);
        assert_eq!(<u32 as BlockIndex>::MAX, u32::MAX as usize);
        assert_eq!(<usize as BlockIndex>::MAX, usize::MAX);
    }

    #[test]
    fn round_trips_preserve_the_index() {
        assert_eq!(u8::from_usize(255).into_usize(), 255);
        assert_eq!(u16::from_usize(1_000).into_usize(), 1_000);
        assert_eq!(u32::from_usize(70_000).into_usize(), 70_000);
        assert_eq!(usize::from_usize(0).into_usize(), 0);
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic]
    fn narrowing_an_oversized_index_panics_in_debug() {
        _ = u8::from_usize(256);
    }
}
