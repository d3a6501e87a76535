//! Basic usage of a [`ChunkResource`]: allocate, inspect, release.

use chunk_pool::{AllocError, ChunkOptions, ChunkResource};

fn main() -> Result<(), AllocError> {
    let mut resource: ChunkResource = ChunkResource::new(ChunkOptions {
        block_size: 64,
        block_align: 8,
        block_count: 4,
    });

    println!("created {resource}");

    // Every request is served by one whole block, so small requests and
    // block-sized requests cost the same.
    let small = resource.allocate_bytes(5)?;
    let large = resource.allocate_bytes(64)?;

    println!(
        "two blocks handed out, {} of {} remain",
        resource.available_blocks(),
        resource.options().block_count
    );

    // Typed allocation checks size and alignment up front.
    let values = resource.allocate_object::<u64>(8)?;

    // SAFETY: The block holds 8 u64 values and is exclusively ours.
    unsafe {
        for offset in 0..8 {
            values.add(offset).write(offset as u64 * 3);
        }
        println!("values[7] = {}", values.add(7).read());
    }

    // Zero-byte requests consume no block at all.
    let sentinel = resource.allocate_bytes(0)?;
    assert!(!resource.maybe_owns(sentinel.as_ptr()));

    resource.deallocate_object(values.as_ptr(), 8);
    resource.deallocate_bytes(large.as_ptr(), 64);
    resource.deallocate_bytes(small.as_ptr(), 5);
    resource.deallocate_bytes(sentinel.as_ptr(), 0);

    println!("all blocks returned: {}", resource.available_blocks());

    Ok(())
}
