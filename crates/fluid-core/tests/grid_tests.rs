use fluid_core::grid::SpatialHash;
use glam::Vec3;
use proptest::prelude::*;

fn brute_force(positions: &[Vec3], query: Vec3, radius: f32) -> Vec<u32> {
    positions
        .iter()
        .enumerate()
        .filter(|(_, p)| (**p - query).length_squared() <= radius * radius)
        .map(|(i, _)| i as u32)
        .collect()
}

fn sorted(mut v: Vec<u32>) -> Vec<u32> {
    v.sort_unstable();
    v
}

#[test]
fn test_grid_build_and_query() {
    let mut hash = SpatialHash::new(10.0);
    let positions = vec![
        Vec3::new(1.0, 1.0, 1.0),
        Vec3::new(2.0, 2.0, 2.0),
        Vec3::new(100.0, 100.0, 100.0),
    ];
    hash.build_from_positions(&positions);

    let mut neighbors = Vec::new();
    hash.get_neighbors(positions[0], 10.0, &mut neighbors);

    assert!(neighbors.contains(&0), "should find self");
    assert!(neighbors.contains(&1), "should find nearby particle");
    assert!(!neighbors.contains(&2), "should NOT find far particle");
}

#[test]
fn test_grid_filters_cube_corners() {
    let mut hash = SpatialHash::new(10.0);
    // Same 27-cell block, but outside the sphere.
    let positions = vec![Vec3::ZERO, Vec3::new(9.0, 9.0, 9.0)];
    hash.build_from_positions(&positions);

    let mut neighbors = Vec::new();
    hash.get_neighbors(Vec3::ZERO, 10.0, &mut neighbors);
    assert_eq!(neighbors, vec![0]);

    let mut boxed = Vec::new();
    hash.query_box(Vec3::splat(-1.0), Vec3::splat(1.0), &mut boxed);
    assert_eq!(sorted(boxed), vec![0, 1], "box query is not refined");
}

#[test]
fn test_grid_empty_and_duplicates() {
    let mut hash = SpatialHash::new(5.0);
    hash.build_from_positions(&[]);
    let mut out = vec![7];
    hash.get_neighbors(Vec3::ZERO, 5.0, &mut out);
    assert!(out.is_empty(), "empty build must clear the output");

    let positions = vec![Vec3::ONE; 4];
    hash.build_from_positions(&positions);
    hash.get_neighbors(Vec3::ONE, 0.5, &mut out);
    assert_eq!(sorted(out), vec![0, 1, 2, 3]);
}

#[test]
fn test_grid_rebuild_forgets_previous_state() {
    let mut hash = SpatialHash::new(10.0);
    hash.build_from_positions(&[Vec3::ZERO, Vec3::X]);
    hash.build_from_positions(&[Vec3::new(500.0, 0.0, 0.0)]);

    let mut out = Vec::new();
    hash.get_neighbors(Vec3::ZERO, 10.0, &mut out);
    assert!(out.is_empty(), "stale indices leaked: {:?}", out);
}

#[test]
fn test_grid_unfiltered_insert() {
    let mut hash = SpatialHash::new(10.0);
    hash.build_from_positions(&[]);
    hash.insert(3, Vec3::new(9.0, 9.0, 9.0));
    let mut out = Vec::new();
    hash.get_neighbors(Vec3::ZERO, 1.0, &mut out);
    assert_eq!(out, vec![3], "uncached entries come back unfiltered");
}

#[test]
fn test_grid_cell_size_clamped() {
    let mut hash = SpatialHash::new(0.0);
    assert!(hash.cell_size() > 0.0);
    hash.set_cell_size(-4.0);
    assert!(hash.cell_size() > 0.0);
    hash.set_cell_size(f32::NAN);
    assert!(hash.cell_size() > 0.0);
}

#[test]
fn test_grid_churn_is_bounded() {
    let mut hash = SpatialHash::new(1.0);
    for frame in 0..300 {
        let offset = frame as f32 * 50.0;
        let positions: Vec<Vec3> = (0..10)
            .map(|i| Vec3::new(offset + i as f32 * 3.0, 0.0, 0.0))
            .collect();
        hash.build_from_positions(&positions);
    }
    assert!(
        hash.allocated_cells() <= 64 * 8 + 10,
        "cell map grew to {}",
        hash.allocated_cells()
    );
}

fn cloud() -> impl Strategy<Value = Vec<Vec3>> {
    prop::collection::vec(
        (-50.0f32..50.0, -50.0f32..50.0, -50.0f32..50.0).prop_map(|(x, y, z)| Vec3::new(x, y, z)),
        0..120,
    )
}

proptest! {
    #[test]
    fn test_neighbors_match_brute_force(
        positions in cloud(),
        qx in -60.0f32..60.0,
        qy in -60.0f32..60.0,
        qz in -60.0f32..60.0,
        radius in 0.5f32..30.0,
        cell in prop::sample::select(vec![2.5f32, 7.0, 10.0, 40.0]),
    ) {
        let query = Vec3::new(qx, qy, qz);
        let mut hash = SpatialHash::new(cell);
        hash.build_from_positions(&positions);
        let mut out = Vec::new();
        hash.get_neighbors(query, radius, &mut out);
        prop_assert_eq!(sorted(out), brute_force(&positions, query, radius));
    }
}
