use std::alloc::{Layout, alloc, dealloc};
use std::num::NonZero;
use std::ptr::NonNull;
use std::thread;

use crate::{BlockIndex, ChunkOptions, DropPolicy, optimistic_sort_by, zero_block_ptr};

/// The block-pool engine: one contiguous run of `block_count` storage blocks
/// plus the index stack that governs which of them are free.
///
/// `index_stack` is a permutation of `0..block_count` at all times. The
/// prefix `[0, available)` enumerates the free blocks, top of stack at
/// `available - 1`; the suffix `[available, block_count)` enumerates the
/// allocated blocks, most recently allocated at `available`. Allocation pops
/// the free prefix; release swaps the released slot with `available` so it
/// stays O(1), which is also why the two defrag sorts exist.
///
/// # Out of band access
///
/// The pool does not create or keep references to the block memory, so it is
/// valid to access blocks via the returned pointers even while the pool is
/// borrowed. Storage is heap-backed: block addresses are stable when the
/// pool value itself moves.
#[derive(Debug)]
pub(crate) struct BlockPool<I: BlockIndex> {
    /// Normalized options this pool was built from; `block_align` divides
    /// `block_size`, which the pointer arithmetic below relies on.
    options: ChunkOptions,

    /// `options.block_count` as a non-zero count.
    capacity: NonZero<usize>,

    /// Base of the blocks allocation; block `i` starts at
    /// `blocks + i * block_size`.
    blocks: NonNull<u8>,

    /// Layout of the blocks allocation, kept for deallocation.
    blocks_layout: Layout,

    /// Address returned for zero-byte requests. Interned per option set,
    /// never inside the blocks allocation, never dereferenced.
    zero_block: NonNull<u8>,

    /// Permutation of `0..capacity`, split by `available` into the free
    /// prefix and the allocated suffix.
    index_stack: Box<[I]>,

    /// Number of free blocks; the split point of `index_stack`.
    available: usize,

    /// Whether dropping the pool with allocated blocks is a caller bug.
    drop_policy: DropPolicy,
}

impl<I: BlockIndex> BlockPool<I> {
    /// Creates a pool for the given options, which are normalized here.
    ///
    /// The index stack starts holding `block_count - 1` down to `0`, so the
    /// first block allocated is block 0 and a full drain walks the blocks in
    /// address order.
    ///
    /// # Panics
    ///
    /// Panics if the options are invalid (before or after normalization), if
    /// the block count cannot be indexed by `I`, or if the host allocator
    /// cannot provide the storage.
    pub(crate) fn new(options: ChunkOptions, drop_policy: DropPolicy) -> Self {
        assert!(options.is_valid(), "chunk options are not valid");

        let options = options.normalized();
        assert!(
            options.is_valid(),
            "chunk options do not survive normalization"
        );

        assert!(
            options.block_count - 1 <= I::MAX,
            "block count {} cannot be indexed by the chosen index type (max index {})",
            options.block_count,
            I::MAX
        );

        let capacity =
            NonZero::new(options.block_count).expect("valid options have a non-zero block count");

        let blocks_layout = Layout::from_size_align(
            options.block_size * options.block_count,
            options.block_align,
        )
        .expect("valid options describe a representable blocks layout");

        // SAFETY: The layout is non-zero-sized for any valid options.
        let blocks = NonNull::new(unsafe { alloc(blocks_layout) }).expect(
            "we do not intend to handle allocation failure as a real possibility - OOM results in panic",
        );

        let index_stack = (0..capacity.get())
            .map(|position| I::from_usize(capacity.get() - 1 - position))
            .collect();

        Self {
            options,
            capacity,
            blocks,
            blocks_layout,
            zero_block: zero_block_ptr(options),
            index_stack,
            available: capacity.get(),
            drop_policy,
        }
    }

    /// The normalized options this pool was built from.
    pub(crate) fn options(&self) -> ChunkOptions {
        self.options
    }

    /// Current size of the free prefix of the index stack.
    #[cfg_attr(test, mutants::skip)] // Mutating this to a constant makes exhaustion tests loop forever.
    pub(crate) fn available_count(&self) -> usize {
        self.available
    }

    /// The sentinel address handed out for zero-byte requests.
    pub(crate) fn zero_block(&self) -> NonNull<u8> {
        self.zero_block
    }

    /// Start address of block `index`.
    fn block_ptr(&self, index: usize) -> NonNull<u8> {
        debug_assert!(index < self.capacity.get(), "block index out of bounds");

        // Cannot overflow: the whole blocks allocation fits in isize::MAX.
        let offset = index * self.options.block_size;

        // SAFETY: index is bounded by the capacity, so the offset stays
        // within the blocks allocation made in new().
        unsafe { self.blocks.add(offset) }
    }

    /// Checks whether `ptr` points into the pool's block storage.
    ///
    /// Returns false for null and for the zero-block sentinel. No alignment
    /// check: a pointer into the middle of a block also reports true. This
    /// is the cheap filter run before the exact [`is_owned`](Self::is_owned)
    /// check; comparisons are on plain addresses, which are totally ordered.
    pub(crate) fn is_maybe_owned(&self, ptr: *const u8) -> bool {
        if ptr.is_null() {
            return false;
        }

        let addr = ptr.addr();
        if addr == self.zero_block.addr().get() {
            return false;
        }

        let lo = self.blocks.addr().get();
        let hi = lo + self.blocks_layout.size();
        addr >= lo && addr < hi
    }

    /// Checks whether `ptr` points at the start of one of the pool's blocks.
    ///
    /// Returns false for null and for the zero-block sentinel.
    pub(crate) fn is_owned(&self, ptr: *const u8) -> bool {
        if !self.is_maybe_owned(ptr) {
            return false;
        }

        (ptr.addr() - self.blocks.addr().get()) % self.options.block_size == 0
    }

    /// The index of the block `ptr` points at.
    ///
    /// Callers must have established `is_owned(ptr)`.
    fn block_index(&self, ptr: *const u8) -> usize {
        debug_assert!(self.is_owned(ptr), "is_owned(ptr) not satisfied");

        let offset = ptr.addr() - self.blocks.addr().get();
        let index = offset / self.options.block_size;

        assert!(index < self.capacity.get(), "is_owned(ptr) not satisfied");

        index
    }

    /// Looks up whether the block `ptr` points at is currently allocated.
    ///
    /// Returns the position in the index stack holding the block's index,
    /// to be treated as an opaque token for
    /// [`return_unchecked`](Self::return_unchecked); `None` means the block
    /// is free. The token is invalidated by any subsequent mutation of the
    /// pool.
    ///
    /// The search walks the allocated suffix starting at `available`,
    /// because the pointer being released is overwhelmingly the most
    /// recently allocated one; stack-like release patterns hit on the first
    /// probe.
    ///
    /// Callers must have established `is_owned(ptr)`.
    pub(crate) fn is_allocated(&self, ptr: *const u8) -> Option<usize> {
        let block = self.block_index(ptr);

        self.index_stack[self.available..]
            .iter()
            .position(|&index| index.into_usize() == block)
            .map(|position| self.available + position)
    }

    /// Pops the free prefix and returns the address of the popped block.
    ///
    /// # Panics
    ///
    /// Panics if no blocks are available.
    pub(crate) fn obtain_unchecked(&mut self) -> NonNull<u8> {
        assert!(self.available > 0, "no blocks available");

        // The popped value stays in place at index_stack[available], which
        // is exactly the "most recently allocated" slot is_allocated()
        // probes first.
        self.available -= 1;
        let index = self.index_stack[self.available].into_usize();

        #[cfg(debug_assertions)]
        self.integrity_check();

        self.block_ptr(index)
    }

    /// Marks the block identified by `token` as free again.
    ///
    /// `token` must come from [`is_allocated`](Self::is_allocated) with no
    /// intervening mutation. The released slot is swapped with
    /// `index_stack[available]` rather than shifted, trading strict LIFO
    /// order of the free prefix for O(1) release; the defrag entry points
    /// restore the order when it matters.
    ///
    /// # Panics
    ///
    /// Panics if the token is out of range or has been invalidated.
    pub(crate) fn return_unchecked(&mut self, token: usize) {
        assert!(
            token < self.capacity.get(),
            "token not obtained from is_allocated()"
        );
        assert!(
            token >= self.available,
            "token invalidated by a later operation on the pool"
        );

        self.index_stack.swap(token, self.available);
        self.available += 1;

        #[cfg(debug_assertions)]
        self.integrity_check();
    }

    /// Sorts the free prefix in descending order with a comparison sort, so
    /// subsequent allocations proceed from low addresses upward.
    pub(crate) fn defrag(&mut self) {
        let (free, _) = self.index_stack.split_at_mut(self.available);
        free.sort_unstable_by(|a, b| b.cmp(a));
    }

    /// Same postcondition as [`defrag`](Self::defrag), but optimized for a
    /// free prefix that is already (almost) in order: O(n) then, quadratic
    /// in the worst case.
    pub(crate) fn defrag_optimistic(&mut self) {
        let (free, _) = self.index_stack.split_at_mut(self.available);
        optimistic_sort_by(free, |a, b| a >= b);
    }

    /// Verifies the structural invariants of the index stack.
    ///
    /// Debug builds only; run after every mutation.
    #[cfg(debug_assertions)]
    fn integrity_check(&self) {
        assert!(
            self.available <= self.capacity.get(),
            "available {} exceeds capacity {}",
            self.available,
            self.capacity.get()
        );

        let mut seen = vec![false; self.capacity.get()];
        for &index in &self.index_stack {
            let index = index.into_usize();
            assert!(
                index < self.capacity.get(),
                "index stack holds out-of-bounds block index {index}"
            );
            assert!(!seen[index], "index stack holds block index {index} twice");
            seen[index] = true;
        }
    }
}

impl<I: BlockIndex> Drop for BlockPool<I> {
    fn drop(&mut self) {
        let allocated = self.capacity.get() - self.available;

        // SAFETY: blocks was allocated in new() with exactly this layout and
        // is freed once, here.
        unsafe {
            dealloc(self.blocks.as_ptr(), self.blocks_layout);
        }

        // Storage is reclaimed first so the check below cannot leak on
        // panic. If we are already panicking, a second panic would only
        // obscure the original one.
        if !thread::panicking() && self.drop_policy == DropPolicy::MustNotDropAllocated {
            assert!(
                allocated == 0,
                "dropped a chunk resource with {allocated} blocks still allocated - this is forbidden by DropPolicy::MustNotDropAllocated"
            );
        }
    }
}

// SAFETY: The pool owns its blocks allocation outright and the raw pointers
// it holds never alias another thread's data; the zero-block sentinel is
// shared between pools but only ever compared, never dereferenced. All
// mutation goes through &mut self.
unsafe impl<I: BlockIndex> Send for BlockPool<I> {}
