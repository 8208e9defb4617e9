use fluid_core::shapes::dispatcher::points_for;
use fluid_core::shapes::SpawnShape;
use fluid_core::ParticleSet;
use glam::Vec3;

#[test]
fn test_cylinder_points_inside() {
    let center = Vec3::new(0.0, 0.0, 30.0);
    let shape = SpawnShape::Cylinder {
        center,
        radius: 8.0,
        half_height: 12.0,
    };
    let pts = points_for(&shape, 4.0, usize::MAX);
    assert!(!pts.is_empty());
    for p in &pts {
        let d = *p - center;
        assert!(d.x * d.x + d.y * d.y <= 64.0 + 1e-3, "{p:?} outside the radius");
        assert!(d.z.abs() <= 12.0 + 1e-4, "{p:?} outside the height");
    }
}

#[test]
fn test_lattice_spacing_respected() {
    let shape = SpawnShape::Box {
        center: Vec3::ZERO,
        half_extents: Vec3::new(10.0, 4.0, 4.0),
    };
    let pts = points_for(&shape, 4.0, usize::MAX);
    // 20 / 4 = 5 intervals in x, 8 / 4 = 2 in y and z.
    assert_eq!(pts.len(), 6 * 3 * 3);
    for (i, a) in pts.iter().enumerate() {
        for b in &pts[i + 1..] {
            assert!((*a - *b).length() >= 4.0 - 1e-4, "{a:?} and {b:?} too close");
        }
    }
}

#[test]
fn test_spawn_in_shape_truncated_by_capacity() {
    let mut set = ParticleSet::new(10);
    let shape = SpawnShape::Sphere {
        center: Vec3::ZERO,
        radius: 20.0,
    };
    let spawned = set.spawn_particles_in_shape(&shape, 5.0, Vec3::X, 3);
    assert_eq!(spawned, 10);
    assert_eq!(set.len(), 10);
    assert!(set.particles().iter().all(|p| p.source == 3 && p.velocity == Vec3::X));
    assert_eq!(set.spawn_particles_in_shape(&shape, 5.0, Vec3::ZERO, 3), 0);
}

#[test]
fn test_fine_spawn_into_small_budget_stops_early() {
    let mut set = ParticleSet::new(1);
    let shape = SpawnShape::Box {
        center: Vec3::ZERO,
        half_extents: Vec3::splat(10.0),
    };
    // 201 sites per axis: only the first is generated.
    assert_eq!(set.spawn_particles_in_shape(&shape, 0.1, Vec3::ZERO, 0), 1);
    let first = set.particles()[0].position;
    assert!((first - Vec3::splat(-10.0)).length() < 0.1, "first site {first:?}");
    assert_eq!(set.spawn_particles_in_shape(&shape, 0.1, Vec3::ZERO, 0), 0);

    let mut set = ParticleSet::new(1_000);
    // 20 000 sites per axis is refused outright.
    assert_eq!(set.spawn_particles_in_shape(&shape, 0.001, Vec3::ZERO, 0), 0);
    assert!(set.is_empty());
}

#[test]
fn test_spawn_in_shape_respects_source_quota() {
    let mut set = ParticleSet::new(1_000);
    set.max_per_source = Some(5);
    let shape = SpawnShape::Box {
        center: Vec3::ZERO,
        half_extents: Vec3::splat(10.0),
    };
    assert_eq!(set.spawn_particles_in_shape(&shape, 5.0, Vec3::ZERO, 1), 5);
    assert_eq!(set.spawn_particles_in_shape(&shape, 5.0, Vec3::ZERO, 2), 5);
    assert_eq!(set.count_for_source(1), 5);
    assert_eq!(set.remove_particles_from_source(1), 5);
    assert_eq!(set.spawn_particles_in_shape(&shape, 5.0, Vec3::ZERO, 1), 5);
}

#[test]
fn test_spawned_particles_use_set_mass_and_fresh_ids() {
    let mut set = ParticleSet::new(100);
    set.particle_mass = 0.25;
    let shape = SpawnShape::Box {
        center: Vec3::ZERO,
        half_extents: Vec3::splat(5.0),
    };
    let n = set.spawn_particles_in_shape(&shape, 5.0, Vec3::ZERO, 0);
    assert_eq!(n, 27);
    set.remove_particles_in_radius(Vec3::ZERO, 0.5);
    set.spawn_particles_in_shape(&shape, 5.0, Vec3::ZERO, 0);

    let mut ids: Vec<_> = set.particles().iter().map(|p| p.id).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), set.len(), "ids must never repeat");
    assert!(set.particles().iter().all(|p| p.mass == 0.25));
}
