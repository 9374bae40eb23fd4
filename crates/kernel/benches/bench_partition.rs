use std::hint::black_box;
use std::time::Instant;

use roomtrace_common::{CellCode, GridCoord};
use roomtrace_kernel::{CellVocabulary, GridMap, RoomPartitioner, World};

fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

/// Roughly 70% open cells with scattered solid and door cells.
fn make_map(side: usize, seed: u64) -> GridMap {
    let mut state = seed;
    let walls: Vec<Vec<CellCode>> = (0..side)
        .map(|_| {
            (0..side)
                .map(|_| match splitmix64(&mut state) % 10 {
                    0..=6 => 0,
                    7 => 7,
                    n => n as CellCode,
                })
                .collect()
        })
        .collect();
    match GridMap::from_walls(walls, 4, 2) {
        Ok(map) => map,
        Err(e) => panic!("generated map rejected: {e}"),
    }
}

fn bench_partition(side: usize, iterations: usize) {
    let map = make_map(side, 42);
    let vocab = CellVocabulary::default();

    let start = Instant::now();
    for _ in 0..iterations {
        let _ = black_box(RoomPartitioner::new(black_box(&map), &vocab).partition());
    }
    let elapsed = start.elapsed();
    let per_iter = elapsed / iterations as u32;
    println!("  partition ({side}x{side}, {iterations} iters): {per_iter:?}/iter, total {elapsed:?}");
}

fn bench_lookup(side: usize, iterations: usize) {
    let world = World::build(make_map(side, 7), CellVocabulary::default());
    let cells: Vec<GridCoord> = world.map().coords().collect();

    let start = Instant::now();
    for i in 0..iterations {
        let coord = cells[i % cells.len()];
        let _ = black_box(world.lookup(black_box(coord)));
    }
    let elapsed = start.elapsed();
    let per_iter = elapsed / iterations as u32;
    println!("  lookup ({side}x{side}, {iterations} iters): {per_iter:?}/iter, total {elapsed:?}");
}

fn main() {
    println!("=== Room Partition Benchmarks ===\n");

    println!("Partition:");
    bench_partition(16, 1000);
    bench_partition(64, 100);
    bench_partition(256, 10);

    println!("\nSpatial lookup:");
    bench_lookup(64, 100_000);
    bench_lookup(256, 100_000);

    println!("\n=== Done ===");
}
