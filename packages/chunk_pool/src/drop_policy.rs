/// Determines how a resource treats outstanding allocations when dropped.
///
/// By default the resource reclaims its storage regardless of how many
/// blocks are still handed out.
///
/// # Examples
///
/// ```
/// use chunk_pool::{ChunkResource, DropPolicy};
///
/// // The drop policy is set at resource creation time.
/// let resource: ChunkResource = ChunkResource::builder()
///     .block_size(64)
///     .block_align(8)
///     .block_count(4)
///     .drop_policy(DropPolicy::MustNotDropAllocated)
///     .build();
///
/// // Nothing is allocated, so dropping the resource here is fine.
/// assert_eq!(resource.available_blocks(), 4);
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub enum DropPolicy {
    /// The resource may be dropped while blocks are still allocated. This is
    /// the default. The storage is reclaimed; any pointers still held become
    /// dangling, which is the caller's teardown-order responsibility.
    #[default]
    MayDropAllocated,

    /// The resource panics if blocks are still allocated when it is dropped.
    ///
    /// This may be valuable when unsafe code holds out-of-band pointers into
    /// the pool and a drop with live blocks can only mean a teardown-order
    /// bug.
    MustNotDropAllocated,
}
