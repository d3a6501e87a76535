use std::alloc::{Layout, alloc};
use std::ptr::NonNull;
use std::sync::{LazyLock, Mutex};

use foldhash::{HashMap, HashMapExt};

use crate::ChunkOptions;

/// One interned storage block per normalized option set, shared by every
/// resource built from those options. Map values are exposed addresses of
/// allocations that intentionally live for the rest of the process; storing
/// addresses rather than pointers keeps the registry `Sync`.
///
/// We use foldhash for better performance with small hash tables.
static ZERO_BLOCKS: LazyLock<Mutex<HashMap<ChunkOptions, usize>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// Returns the distinguished address handed out for zero-byte requests
/// against a pool with the given normalized options.
///
/// The address identifies one block-sized, block-aligned allocation that is
/// outside every pool's block array and is never read or written; only its
/// identity matters. Repeated calls with equal options return the same
/// address.
///
/// # Panics
///
/// Panics if the host allocator cannot provide the block.
pub(crate) fn zero_block_ptr(options: ChunkOptions) -> NonNull<u8> {
    debug_assert!(
        options == options.normalized(),
        "zero blocks are interned by normalized options"
    );

    let mut registry = ZERO_BLOCKS
        .lock()
        .expect("zero block registry mutex poisoned");

    let addr = *registry.entry(options).or_insert_with(|| {
        let layout = Layout::from_size_align(options.block_size, options.block_align)
            .expect("normalized options describe a representable block layout");

        // SAFETY: The layout has non-zero size for any valid options.
        let block = unsafe { alloc(layout) };

        NonNull::new(block)
            .expect("we do not intend to handle allocation failure as a real possibility - OOM results in panic")
            .as_ptr()
            .expose_provenance()
    });

    let ptr = std::ptr::with_exposed_provenance_mut(addr);

    // SAFETY: Registry entries are addresses of live allocations that are
    // never freed, so they stay non-null for the life of the process.
    unsafe { NonNull::new_unchecked(ptr) }
}
