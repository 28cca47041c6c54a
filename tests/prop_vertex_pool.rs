use std::collections::HashMap;

use proptest::prelude::*;
use voxel_engine::engine_state::rendering::meshing::vertex_pool::{
    bucket_size_for, PoolBuffer, PoolKind, BUCKET_SIZES, MAX_BUCKET_SIZE,
};

#[derive(Debug, Clone)]
enum Op {
    Allocate(u32, u32),
    Release(u32),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0u32..12, 0u32..3000).prop_map(|(id, count)| Op::Allocate(id, count)),
        1 => (0u32..12).prop_map(Op::Release),
    ]
}

fn capacity() -> impl Strategy<Value = u32> {
    (1u32..64).prop_map(|c| c * 64)
}

proptest! {
    // ranges stay disjoint, bucket-sized and tile the whole buffer
    #[test]
    fn layout_survives_any_sequence(
        initial in capacity(),
        increment in capacity(),
        ops in prop::collection::vec(op(), 1..80),
    ) {
        let mut buffer = PoolBuffer::<u32>::new(PoolKind::Vertex, initial, increment);

        for op in ops {
            match op {
                Op::Allocate(id, count) => {
                    let range = buffer.allocate(id, count).unwrap();
                    prop_assert!(BUCKET_SIZES.contains(&range.len()));
                    prop_assert!(range.len() >= count);
                    prop_assert_eq!(range.object_count, count);
                }
                Op::Release(id) => {
                    buffer.release(id);
                    prop_assert!(buffer.range(id).is_none());
                }
            }
            prop_assert_eq!(buffer.check_layout(), Ok(()));
        }

        buffer.coalesce_free_ranges();
        prop_assert_eq!(buffer.check_layout(), Ok(()));
    }

    // a chunk keeps its range when the new size still fits, and moves otherwise
    #[test]
    fn reallocation_reuses_in_place(first in 0u32..5000, second in 0u32..5000) {
        let mut buffer = PoolBuffer::<u32>::new(PoolKind::Index, 4096, 4096);
        let original = buffer.allocate(1, first).unwrap();
        let updated = buffer.allocate(1, second).unwrap();

        let needed = bucket_size_for(second).unwrap();
        if original.len() >= needed {
            prop_assert_eq!((updated.start, updated.end), (original.start, original.end));
        } else {
            prop_assert!(updated.len() == needed);
        }
        prop_assert_eq!(buffer.occupied_ranges().len(), 1);
        prop_assert_eq!(buffer.check_layout(), Ok(()));
    }

    // growth only appends: data written before stays where it was
    #[test]
    fn growth_never_moves_data(counts in prop::collection::vec(1u32..MAX_BUCKET_SIZE, 1..12)) {
        let mut buffer = PoolBuffer::<u32>::new(PoolKind::Index, 64, 64);
        let mut starts = HashMap::new();

        for (id, count) in counts.into_iter().enumerate() {
            let id = id as u32;
            let range = buffer.allocate(id, count).unwrap();
            starts.insert(id, range.start);
            for (other, start) in &starts {
                prop_assert_eq!(buffer.range(*other).map(|r| r.start), Some(*start));
            }
        }
        prop_assert_eq!(buffer.check_layout(), Ok(()));
    }
}

#[test]
fn requests_above_the_largest_bucket_fail() {
    let mut buffer = PoolBuffer::<u32>::new(PoolKind::Vertex, 64, 64);
    assert!(buffer.allocate(0, MAX_BUCKET_SIZE + 1).is_err());
    assert!(buffer.range(0).is_none());
}
