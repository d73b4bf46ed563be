//! Tests for the painting lookup.

use glam::{DMat4, DVec3, Vec3};

use super::Painting;
use crate::mesh::TriangleSet;
use crate::types::{ModelVolume, VolumeKind};

fn single_triangle() -> TriangleSet {
  TriangleSet::new(
    vec![
      Vec3::new(0.0, 0.0, 0.0),
      Vec3::new(1.0, 0.0, 0.0),
      Vec3::new(0.0, 1.0, 0.0),
    ],
    vec![[0, 1, 2]],
  )
}

fn painted_volume(
  enforcers: TriangleSet,
  blockers: TriangleSet,
  transform: DMat4,
) -> ModelVolume {
  ModelVolume {
    kind: VolumeKind::ModelPart,
    mesh: TriangleSet::default(),
    transform,
    seam_enforcers: enforcers,
    seam_blockers: blockers,
  }
}

// =============================================================================
// Batch 1: Radius queries
// =============================================================================

#[test]
fn test_enforced_within_radius() {
  let volume = painted_volume(single_triangle(), TriangleSet::default(), DMat4::IDENTITY);
  let painting = Painting::new(&DMat4::IDENTITY, &[volume]);

  assert!(painting.is_enforced(Vec3::new(0.2, 0.2, 0.05), 0.1));
  assert!(!painting.is_enforced(Vec3::new(0.2, 0.2, 0.5), 0.1));
  assert!(!painting.is_blocked(Vec3::new(0.2, 0.2, 0.05), 0.1));
}

#[test]
fn test_blocked_within_radius() {
  let volume = painted_volume(TriangleSet::default(), single_triangle(), DMat4::IDENTITY);
  let painting = Painting::new(&DMat4::IDENTITY, &[volume]);

  assert!(painting.is_blocked(Vec3::new(0.1, 0.1, 0.0), 0.05));
  assert!(!painting.is_enforced(Vec3::new(0.1, 0.1, 0.0), 0.05));
}

#[test]
fn test_empty_painting_is_never_hit() {
  let painting = Painting::new(&DMat4::IDENTITY, &[]);
  assert!(!painting.is_enforced(Vec3::ZERO, 100.0));
  assert!(!painting.is_blocked(Vec3::ZERO, 100.0));
}

// =============================================================================
// Batch 2: Transform baking
// =============================================================================

#[test]
fn test_volume_and_object_transforms_are_baked() {
  let volume = painted_volume(
    single_triangle(),
    TriangleSet::default(),
    DMat4::from_translation(DVec3::new(10.0, 0.0, 0.0)),
  );
  let obj_transform = DMat4::from_translation(DVec3::new(0.0, 5.0, 0.0));
  let painting = Painting::new(&obj_transform, &[volume]);

  assert!(painting.is_enforced(Vec3::new(10.2, 5.2, 0.0), 0.1));
  assert!(!painting.is_enforced(Vec3::new(0.2, 0.2, 0.0), 0.1));
}
