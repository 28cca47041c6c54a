use cgmath::{Point3, Vector3};
use voxel_engine::engine_state::rendering::meshing::{
    mesh::{greedy, naive},
    remesh_dirty_chunks,
};
use voxel_engine::engine_state::voxels::chunk::chunk_key_of;
use voxel_engine::{
    BlockSide, ChunkMesher, ChunkStore, GeneratedMesh, MeshingMode, RenderBridge, VertexPool,
    VoxelColor,
};

const STONE: VoxelColor = VoxelColor::new(120, 120, 120, 255);
const SAND: VoxelColor = VoxelColor::new(220, 200, 120, 255);

/// Covered face area per side, recovered from the quad corners.
fn side_areas(mesh: &GeneratedMesh) -> [i32; 6] {
    let mut areas = [0; 6];
    let mut quad = 0;

    for side in BlockSide::all() {
        let quads = mesh.index_count(side as usize) as usize / 6;
        for _ in 0..quads {
            let v = &mesh.vertices[quad * 4..quad * 4 + 4];
            let p = |i: usize| Vector3::new(v[i].x, v[i].y, v[i].z);
            let cross = (p(1) - p(0)).cross(p(3) - p(0));
            areas[side as usize] += cross.x.abs() + cross.y.abs() + cross.z.abs();
            quad += 1;
        }
    }

    areas
}

#[test]
fn single_voxel_frame() {
    let mut store = ChunkStore::new();
    let chunk_id = store.create_chunk(Point3::new(3.5, 3.5, 3.5)).unwrap();
    store.add_voxel(Point3::new(3, 3, 3), STONE).unwrap();

    let mut pool = VertexPool::new(512, 512, 512);
    let stats = remesh_dirty_chunks(&mut store, &ChunkMesher::default(), &mut pool).unwrap();
    assert_eq!(stats.quads, 6);

    let chunk = store.chunk(Point3::new(0, 0, 0)).unwrap();
    assert!(!chunk.dirty);
    assert_eq!(chunk.mesh.vertices.len(), 24);
    assert_eq!(chunk.mesh.indices.len(), 36);

    let vertex_range = pool.vertices.range(chunk_id).unwrap();
    assert_eq!((vertex_range.start, vertex_range.end), (0, 64));
    assert!(!vertex_range.uploaded);
    let index_range = pool.indices.range(chunk_id).unwrap();
    assert_eq!((index_range.start, index_range.end), (0, 64));

    let bridge = RenderBridge::new(true);
    let draws = bridge.indirect_commands(&pool);
    assert_eq!(draws.len(), 6);
    assert!(draws.iter().all(|draw| draw.first_instance == chunk_id));

    let writes = bridge.dirty_upload_commands(&store, &mut pool);
    assert!(!writes.is_empty());
    assert!(pool.vertices.range(chunk_id).unwrap().uploaded);
    assert!(pool.vertices.dirty_ranges().is_empty());
    pool.check_layout().unwrap();
}

#[test]
fn buried_chunk_meshes_to_nothing() {
    let mut store = ChunkStore::new();
    let center = Point3::new(3.5, 3.5, 3.5);
    store.fill_chunk(center, STONE).unwrap();
    for side in BlockSide::all() {
        let normal = side.normal() * 8;
        let neighbor = Point3::new(
            center.x + normal.x as f32,
            center.y + normal.y as f32,
            center.z + normal.z as f32,
        );
        store.fill_chunk(neighbor, STONE).unwrap();
    }

    let chunk = store.chunk_at(center).unwrap();
    assert_eq!(chunk.voxel_count(), 512);
    assert!(greedy(&store, chunk).is_empty());
    assert!(naive(&store, chunk).is_empty());

    let mut pool = VertexPool::new(4096, 4096, 4096);
    remesh_dirty_chunks(&mut store, &ChunkMesher::default(), &mut pool).unwrap();
    let chunk_id = store.chunk_at(center).unwrap().id;
    assert!(pool.vertices.range(chunk_id).is_none());
    assert_eq!(pool.chunk_ids().len(), 6);
}

#[test]
fn runs_merge_into_single_quads() {
    let mut store = ChunkStore::new();
    for x in 0..5 {
        store.add_voxel(Point3::new(x, 2, 2), SAND).unwrap();
    }
    let chunk = store.chunk_at(Point3::new(3.5, 3.5, 3.5)).unwrap();

    let merged = greedy(&store, chunk);
    assert_eq!(merged.quad_count(), 6);
    assert_eq!(merged.vertices.len(), 24);

    let unmerged = naive(&store, chunk);
    assert_eq!(unmerged.quad_count(), 5 * 4 + 2);
    assert_eq!(side_areas(&merged), side_areas(&unmerged));
}

#[test]
fn colors_split_merged_runs() {
    let mut store = ChunkStore::new();
    for x in 0..4 {
        let color = if x < 2 { SAND } else { STONE };
        store.add_voxel(Point3::new(x, 0, 0), color).unwrap();
    }
    let chunk = store.chunk_at(Point3::new(3.5, 3.5, 3.5)).unwrap();
    // two caps plus two rectangles on each of the four long sides
    assert_eq!(greedy(&store, chunk).quad_count(), 2 + 4 * 2);
}

#[test]
fn faces_between_chunks_are_culled() {
    let mut store = ChunkStore::new();
    store.add_voxel(Point3::new(7, 0, 0), STONE).unwrap();
    let mut pool = VertexPool::new(512, 512, 512);
    let mesher = ChunkMesher::default();
    remesh_dirty_chunks(&mut store, &mesher, &mut pool).unwrap();

    store.add_voxel(Point3::new(8, 0, 0), STONE).unwrap();
    let left = store.chunk(Point3::new(0, 0, 0)).unwrap();
    assert!(left.dirty);

    let stats = remesh_dirty_chunks(&mut store, &mesher, &mut pool).unwrap();
    assert_eq!(stats.chunks_meshed, 2);
    assert_eq!(stats.quads, 10);

    let left = store.chunk(Point3::new(0, 0, 0)).unwrap();
    assert_eq!(left.mesh.index_count(BlockSide::RIGHT as usize), 0);
    let right = store.chunk(Point3::new(1, 0, 0)).unwrap();
    assert_eq!(right.mesh.index_count(BlockSide::LEFT as usize), 0);
}

#[test]
fn chunks_at_the_lattice_edge_mesh_cleanly() {
    let mut store = ChunkStore::new();
    let positions = [
        Point3::new(8_388_615, 0, 0),
        Point3::new(16_777_216, 3, 0),
        Point3::new(16_777_217, 3, 0),
        Point3::new(i32::MAX, i32::MIN, i32::MAX),
    ];
    for position in positions {
        store.add_voxel(position, STONE).unwrap();
    }

    for (position, quads) in [(positions[0], 6), (positions[1], 6), (positions[3], 6)] {
        let chunk = store.chunk(chunk_key_of(position)).unwrap();
        let merged = greedy(&store, chunk);
        let unmerged = naive(&store, chunk);
        assert_eq!(merged.quad_count(), quads, "chunk {:?}", chunk.key);
        assert_eq!(side_areas(&merged), side_areas(&unmerged));
    }
    assert_eq!(naive(&store, store.chunk(chunk_key_of(positions[1])).unwrap()).quad_count(), 10);

    let mut pool = VertexPool::new(512, 512, 512);
    let stats = remesh_dirty_chunks(&mut store, &ChunkMesher::default(), &mut pool).unwrap();
    assert_eq!(stats.chunks_meshed, 3);
    pool.check_layout().unwrap();
}

#[test]
fn greedy_and_naive_cover_the_same_faces() {
    let palette = [STONE, SAND];
    let mut rng = fastrand::Rng::with_seed(42);

    for _ in 0..8 {
        let mut store = ChunkStore::new();
        for _ in 0..400 {
            let position = Point3::new(rng.i32(-6..10), rng.i32(-6..10), rng.i32(-6..10));
            if rng.u8(0..5) == 0 {
                let _ = store.remove_voxel(position);
            } else {
                store.add_voxel(position, palette[rng.usize(0..2)]).unwrap();
            }
        }

        for chunk in store.chunks() {
            let merged = greedy(&store, chunk);
            let unmerged = naive(&store, chunk);
            assert_eq!(side_areas(&merged), side_areas(&unmerged), "chunk {:?}", chunk.key);
            assert!(merged.quad_count() <= unmerged.quad_count());
            assert_eq!(merged.corner, unmerged.corner);
        }

        let mut pool = VertexPool::new(1024, 1024, 1024);
        let mesher = ChunkMesher::new(MeshingMode::Naive);
        remesh_dirty_chunks(&mut store, &mesher, &mut pool).unwrap();
        assert!(store.dirty_chunk_keys().is_empty());
        pool.check_layout().unwrap();
    }
}
