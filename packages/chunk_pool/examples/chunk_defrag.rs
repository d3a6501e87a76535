//! Shows why the defragmentation entry points exist.
//!
//! Release is O(1) because it swaps the released slot to the top of the
//! free stack instead of shifting; the price is that out-of-order releases
//! scramble the order in which blocks are handed out next. A defrag pass at
//! the start of a major cycle restores low-to-high address order.

use chunk_pool::{AllocError, ChunkOptions, ChunkResource};

fn main() -> Result<(), AllocError> {
    let mut resource: ChunkResource = ChunkResource::new(ChunkOptions {
        block_size: 32,
        block_align: 8,
        block_count: 8,
    });

    // First cycle: drain the fresh pool; addresses come out ascending.
    let mut blocks = Vec::new();
    for _ in 0..8 {
        blocks.push(resource.allocate_bytes(32)?);
    }

    // Release in a scrambled order.
    for release in [6, 0, 3, 7, 1, 5, 2, 4] {
        resource.deallocate_bytes(blocks[release].as_ptr(), 32);
    }

    // Without defrag the next cycle would walk the blocks in roughly the
    // release order above. One sort restores spatial locality.
    resource.defrag();

    let mut previous: Option<usize> = None;
    blocks.clear();
    for _ in 0..8 {
        let block = resource.allocate_bytes(32)?;
        let addr = block.addr().get();
        if let Some(previous) = previous {
            assert!(previous < addr, "defrag must restore ascending order");
        }
        previous = Some(addr);
        blocks.push(block);
    }

    // Stack-like release keeps the free stack sorted on its own, which is
    // exactly the input defrag_optimistic() is tuned for.
    for block in blocks.iter().rev() {
        resource.deallocate_bytes(block.as_ptr(), 32);
    }
    resource.defrag_optimistic();

    println!("defragmented cycles walk blocks in address order");

    Ok(())
}
