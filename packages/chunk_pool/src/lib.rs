//! A fixed-size-block memory resource with O(1) allocation, misuse
//! detection and explicit defragmentation.
//!
//! This crate provides [`ChunkResource`], an allocator that pre-reserves an
//! array of uniformly sized, uniformly aligned storage blocks and hands them
//! out one at a time. It is a drop-in resource for short-lived objects in
//! hot paths where a general-purpose allocator is too expensive and the
//! maximum object size is known up front.
//!
//! # Key Features
//!
//! - **Predictable latency**: allocation pops a free-index stack in O(1);
//!   release is O(1) for stack-like (LIFO) patterns and linear only in the
//!   worst case.
//! - **Byte and typed requests**: [`allocate_bytes`][1] serves raw storage,
//!   [`allocate_object`][2] serves storage for `n` values of `T` with size
//!   and alignment checked up front.
//! - **Zero-byte requests cost nothing**: they return a shared sentinel
//!   address and consume no block.
//! - **Misuse detection**: releasing a foreign pointer or releasing the
//!   same block twice panics with a precise message instead of corrupting
//!   the pool.
//! - **Defragmentation on demand**: [`defrag`][3] and
//!   [`defrag_optimistic`][4] re-sort the free blocks so allocation
//!   proceeds from low addresses upward again.
//! - **Right-sized bookkeeping**: the per-block index type is chosen via
//!   [`BlockIndex`] (`u8`, `u16`, `u32` or `usize`).
//!
//! # Example
//!
//! ```
//! use chunk_pool::{AllocError, ChunkOptions, ChunkResource};
//!
//! let mut resource: ChunkResource = ChunkResource::new(ChunkOptions {
//!     block_size: 64,
//!     block_align: 8,
//!     block_count: 2,
//! });
//!
//! // Every request is served by one whole block.
//! let a = resource.allocate_bytes(64)?;
//! let b = resource.allocate_bytes(1)?;
//! assert_ne!(a, b);
//!
//! // The pool is now exhausted.
//! assert_eq!(resource.allocate_bytes(1), Err(AllocError::OutOfMemory));
//!
//! // Release in any order; blocks become reusable immediately.
//! resource.deallocate_bytes(a.as_ptr(), 64);
//! let c = resource.allocate_bytes(16)?;
//! assert_eq!(a, c);
//!
//! resource.deallocate_bytes(b.as_ptr(), 1);
//! resource.deallocate_bytes(c.as_ptr(), 16);
//! assert_eq!(resource.available_blocks(), 2);
//! # Ok::<(), AllocError>(())
//! ```
//!
//! # What this crate does not do
//!
//! The resource is single-owner (`Send`, not `Sync`), never grows, never
//! splits or coalesces blocks, and attaches no hidden header to them: a
//! block is exactly the bytes handed out.
//!
//! [1]: ChunkResource::allocate_bytes
//! [2]: ChunkResource::allocate_object
//! [3]: ChunkResource::defrag
//! [4]: ChunkResource::defrag_optimistic

mod builder;
mod drop_policy;
mod error;
mod index;
mod options;
mod pool;
mod resource;
mod sort;
mod zero_block;

pub use builder::ChunkResourceBuilder;
pub use drop_policy::DropPolicy;
pub use error::AllocError;
pub use index::BlockIndex;
pub use options::ChunkOptions;
pub use resource::ChunkResource;

pub(crate) use pool::BlockPool;
pub(crate) use sort::optimistic_sort_by;
pub(crate) use zero_block::zero_block_ptr;
