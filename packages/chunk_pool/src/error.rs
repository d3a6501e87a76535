use thiserror::Error;

/// Errors reported by the allocation entry points of
/// [`ChunkResource`][crate::ChunkResource].
///
/// Every variant carries the numeric offenders as plain fields, so
/// constructing an error never allocates; the message text is composed from
/// fixed fragments only when the error is formatted.
///
/// Deallocation-side misuse (a foreign pointer, a double free) is a
/// programming error rather than a domain error and panics instead of
/// returning a variant of this type.
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum AllocError {
    /// An explicit alignment argument was not a power of two.
    #[error("{align} is not a valid alignment, must be a power of 2")]
    InvalidAlign {
        /// The rejected alignment.
        align: usize,
    },

    /// A valid alignment exceeded the block alignment of the resource.
    #[error("{align} exceeds {max_align}, the max alignment supported by the memory resource")]
    UnsupportedAlign {
        /// The requested alignment.
        align: usize,

        /// The block alignment of the resource.
        max_align: usize,
    },

    /// A request was larger than one block.
    #[error("{size} exceeds {max_size}, the max size supported by the memory resource")]
    UnsupportedSize {
        /// The requested size in bytes.
        size: usize,

        /// The block size of the resource.
        max_size: usize,
    },

    /// A typed request for `count` elements of `elem_size` bytes each does
    /// not describe a representable array.
    #[error("array of {count} elements of {elem_size} bytes each overflows the supported size range")]
    ArrayLength {
        /// The requested element count.
        count: usize,

        /// The size of one element in bytes.
        elem_size: usize,
    },

    /// Every block is currently allocated.
    #[error("memory resource is out of blocks")]
    OutOfMemory,
}

#[cfg(test)]
mod tests {
    use std::fmt::Debug;

    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(AllocError: Send, Sync, Debug, Copy);

    #[test]
    fn messages_carry_the_numeric_offenders() {
        let error = AllocError::UnsupportedSize {
            size: 9,
            max_size: 8,
        };
        assert_eq!(
            error.to_string(),
            "9 exceeds 8, the max size supported by the memory resource"
        );

        let error = AllocError::UnsupportedAlign {
            align: 16,
            max_align: 8,
        };
        assert_eq!(
            error.to_string(),
            "16 exceeds 8, the max alignment supported by the memory resource"
        );

        let error = AllocError::InvalidAlign { align: 3 };
        assert_eq!(
            error.to_string(),
            "3 is not a valid alignment, must be a power of 2"
        );
    }

    #[test]
    fn out_of_memory_has_a_fixed_message() {
        assert_eq!(
            AllocError::OutOfMemory.to_string(),
            "memory resource is out of blocks"
        );
    }
}
