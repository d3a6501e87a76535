use crate::{BlockIndex, ChunkOptions, ChunkResource, DropPolicy};

/// Builder for creating an instance of [`ChunkResource`].
///
/// The block size, alignment and count are mandatory; the
/// [drop policy][DropPolicy] is optional. `build()` normalizes the resulting
/// options, so the finished resource may report a padded size or a raised
/// alignment; see [`ChunkOptions::normalized`].
///
/// The index type of the resource is chosen by the `build()` call site,
/// usually through inference from the binding's type annotation.
///
/// # Examples
///
/// ```
/// use chunk_pool::{ChunkResource, DropPolicy};
///
/// let resource: ChunkResource = ChunkResource::builder()
///     .block_size(48)
///     .block_align(8)
///     .block_count(16)
///     .drop_policy(DropPolicy::MustNotDropAllocated)
///     .build();
/// assert_eq!(resource.available_blocks(), 16);
///
/// // A narrow index type shrinks the per-block bookkeeping.
/// let small: ChunkResource<u8> = ChunkResource::builder()
///     .block_size(48)
///     .block_align(8)
///     .block_count(16)
///     .build();
/// assert_eq!(small.options(), resource.options());
/// ```
#[derive(Debug)]
#[must_use]
pub struct ChunkResourceBuilder {
    block_size: Option<usize>,
    block_align: Option<usize>,
    block_count: Option<usize>,
    drop_policy: DropPolicy,
}

impl ChunkResourceBuilder {
    pub(crate) fn new() -> Self {
        Self {
            block_size: None,
            block_align: None,
            block_count: None,
            drop_policy: DropPolicy::default(),
        }
    }

    /// Sets the size in bytes of every block.
    pub fn block_size(mut self, block_size: usize) -> Self {
        self.block_size = Some(block_size);
        self
    }

    /// Sets the alignment in bytes of every block. Must be a power of two.
    pub fn block_align(mut self, block_align: usize) -> Self {
        self.block_align = Some(block_align);
        self
    }

    /// Sets the number of blocks the resource owns.
    pub fn block_count(mut self, block_count: usize) -> Self {
        self.block_count = Some(block_count);
        self
    }

    /// Sets all three block parameters at once from an options value.
    pub fn options(mut self, options: ChunkOptions) -> Self {
        self.block_size = Some(options.block_size);
        self.block_align = Some(options.block_align);
        self.block_count = Some(options.block_count);
        self
    }

    /// Sets the [drop policy][DropPolicy] for the resource. This governs
    /// how to treat outstanding allocations when the resource is dropped.
    pub fn drop_policy(mut self, drop_policy: DropPolicy) -> Self {
        self.drop_policy = drop_policy;
        self
    }

    /// Builds the resource with the specified configuration.
    ///
    /// # Panics
    ///
    /// Panics if any of the block parameters has not been set, if the
    /// resulting options are not [valid][ChunkOptions::is_valid], or if the
    /// block count cannot be indexed by `I`.
    #[must_use]
    pub fn build<I: BlockIndex>(self) -> ChunkResource<I> {
        let options = ChunkOptions {
            block_size: self
                .block_size
                .expect("block_size must be set before calling build()"),
            block_align: self
                .block_align
                .expect("block_align must be set before calling build()"),
            block_count: self
                .block_count
                .expect("block_count must be set before calling build()"),
        };

        ChunkResource::new_inner(options, self.drop_policy)
    }
}
