//! Tests for shell grouping.

use glam::DVec2;

use super::{create_shells, layer_count};
use crate::geometry::BBox2;
use crate::perimeter::{BoundedPerimeter, Perimeter};
use crate::test_utils::square_perimeter;

fn bounded(offset: DVec2, side: f64, layer_index: usize) -> BoundedPerimeter {
  let mut perimeter = square_perimeter(side);
  for position in &mut perimeter.positions {
    *position += offset;
  }
  perimeter.layer_index = layer_index;
  let bounding_box = BBox2::from_points(perimeter.positions.iter().copied());
  BoundedPerimeter {
    perimeter,
    bounding_box,
  }
}

// =============================================================================
// Batch 1: Linking
// =============================================================================

#[test]
fn test_single_tower_forms_one_shell() {
  let perimeters = vec![
    vec![bounded(DVec2::ZERO, 1.0, 0)],
    vec![bounded(DVec2::ZERO, 1.0, 1)],
    vec![bounded(DVec2::ZERO, 1.0, 2)],
  ];

  let shells = create_shells(perimeters, 5.0);
  assert_eq!(shells.len(), 1);
  assert_eq!(shells[0].len(), 3);
  for (index, slice) in shells[0].iter().enumerate() {
    assert_eq!(slice.layer_index, index);
  }
}

#[test]
fn test_two_towers_do_not_cross_link() {
  let offset = DVec2::new(30.0, 0.0);
  let perimeters = vec![
    vec![bounded(DVec2::ZERO, 1.0, 0), bounded(offset, 1.0, 0)],
    vec![bounded(DVec2::ZERO, 1.0, 1), bounded(offset, 1.0, 1)],
  ];

  let shells = create_shells(perimeters, 5.0);
  assert_eq!(shells.len(), 2);
  for shell in &shells {
    assert_eq!(shell.len(), 2);
    let first = shell[0].boundary.positions[0];
    let second = shell[1].boundary.positions[0];
    assert!(
      (first - second).length() < 1e-9,
      "Shells must chain the vertically matching perimeters"
    );
  }
}

#[test]
fn test_distant_layers_split_shells() {
  let perimeters = vec![
    vec![bounded(DVec2::ZERO, 1.0, 0)],
    vec![bounded(DVec2::new(30.0, 0.0), 1.0, 1)],
  ];

  let shells = create_shells(perimeters, 5.0);
  assert_eq!(shells.len(), 2, "Too-distant link should start a new shell");
  assert_eq!(layer_count(&shells), 2);
}

#[test]
fn test_consecutive_slices_differ_by_one_layer() {
  let perimeters = vec![
    vec![bounded(DVec2::ZERO, 1.0, 0)],
    vec![bounded(DVec2::ZERO, 1.0, 1)],
    Vec::new(),
    vec![bounded(DVec2::ZERO, 1.0, 3)],
  ];

  let shells = create_shells(perimeters, 5.0);
  for shell in &shells {
    for window in shell.windows(2) {
      assert_eq!(window[1].layer_index, window[0].layer_index + 1);
    }
  }
}

// =============================================================================
// Batch 2: Idempotence
// =============================================================================

#[test]
fn test_grouping_is_idempotent() {
  let build = || {
    vec![
      vec![bounded(DVec2::ZERO, 1.0, 0), bounded(DVec2::new(10.0, 0.0), 2.0, 0)],
      vec![bounded(DVec2::ZERO, 1.1, 1), bounded(DVec2::new(10.0, 0.0), 2.0, 1)],
    ]
  };
  let first = create_shells(build(), 5.0);
  let second = create_shells(build(), 5.0);

  assert_eq!(first.len(), second.len());
  for (shell_a, shell_b) in first.iter().zip(&second) {
    assert_eq!(shell_a.len(), shell_b.len());
    for (slice_a, slice_b) in shell_a.iter().zip(shell_b) {
      assert_eq!(slice_a.layer_index, slice_b.layer_index);
      assert_eq!(slice_a.boundary.positions, slice_b.boundary.positions);
    }
  }
}

#[test]
fn test_empty_input() {
  let shells = create_shells(Vec::new(), 5.0);
  assert!(shells.is_empty());
  assert_eq!(layer_count(&shells), 0);
}
