//! Tests for triangle sets.

use glam::{DMat4, DVec3, Vec3};

use super::TriangleSet;
use crate::test_utils::box_mesh;

// =============================================================================
// Batch 1: Basics
// =============================================================================

#[test]
fn test_face_normal_orientation() {
  let cube = box_mesh(Vec3::ZERO, Vec3::ONE);
  // Triangle 2 is on the top face.
  let normal = cube.face_normal(2);
  assert!((normal - Vec3::Z).length() < 1e-6);
  // Triangle 0 is on the bottom face.
  let normal = cube.face_normal(0);
  assert!((normal + Vec3::Z).length() < 1e-6);
}

#[test]
fn test_total_area_of_unit_cube() {
  let cube = box_mesh(Vec3::ZERO, Vec3::ONE);
  assert!((cube.total_area() - 6.0).abs() < 1e-5);
}

#[test]
fn test_merge_offsets_indices() {
  let mut merged = box_mesh(Vec3::ZERO, Vec3::ONE);
  let other = box_mesh(Vec3::splat(10.0), Vec3::splat(11.0));
  merged.merge(&other);

  assert_eq!(merged.triangle_count(), 24);
  assert_eq!(merged.positions.len(), 16);
  let [a, _, _] = merged.triangle(12);
  assert!(a.x >= 10.0, "Merged triangles should reference merged vertices");
}

#[test]
fn test_transformed_applies_matrix() {
  let cube = box_mesh(Vec3::ZERO, Vec3::ONE);
  let transform = DMat4::from_translation(DVec3::new(5.0, 0.0, 0.0));
  let moved = cube.transformed(&transform);

  assert!((moved.positions[0] - Vec3::new(5.0, 0.0, 0.0)).length() < 1e-6);
  assert_eq!(moved.indices, cube.indices);
}

// =============================================================================
// Batch 2: Decimation
// =============================================================================

#[test]
fn test_decimate_reaches_target() {
  // A strip of many small triangles.
  let mut positions = Vec::new();
  let mut indices = Vec::new();
  for i in 0..50u32 {
    let x = i as f32 * 0.1;
    positions.push(Vec3::new(x, 0.0, 0.0));
    positions.push(Vec3::new(x, 1.0, 0.0));
  }
  for i in 0..49u32 {
    let base = i * 2;
    indices.push([base, base + 2, base + 1]);
    indices.push([base + 1, base + 2, base + 3]);
  }
  let mut strip = TriangleSet::new(positions, indices);
  assert_eq!(strip.triangle_count(), 98);

  strip.decimate(20);
  assert!(
    strip.triangle_count() <= 20,
    "Expected at most 20 triangles, got {}",
    strip.triangle_count()
  );
  assert!(strip.triangle_count() > 0);
}

#[test]
fn test_decimate_is_a_noop_below_target() {
  let mut cube = box_mesh(Vec3::ZERO, Vec3::ONE);
  cube.decimate(100);
  assert_eq!(cube.triangle_count(), 12);
}

#[test]
fn test_decimate_is_deterministic() {
  let mut first = box_mesh(Vec3::ZERO, Vec3::ONE);
  let mut second = box_mesh(Vec3::ZERO, Vec3::ONE);
  first.decimate(4);
  second.decimate(4);
  assert_eq!(first.indices, second.indices);
  assert_eq!(first.positions, second.positions);
}
