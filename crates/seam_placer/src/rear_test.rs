//! Tests for the rear strategy.

use glam::DVec2;

use super::*;
use crate::choice::{choose_seam_point, SeamPicker};
use crate::geometry::BBox2;
use crate::perimeter::{
  AngleType, BoundedPerimeter, Perimeter, PointClassification, PointType,
};
use crate::test_utils::{square_perimeter, EPSILON};

fn calculator() -> RearestPointCalculator {
  RearestPointCalculator {
    rear_tolerance: 0.2,
    rear_y_offset: 20.0,
  }
}

fn perimeter_from_loop(positions: Vec<DVec2>) -> Perimeter {
  let count = positions.len();
  Perimeter::new(
    1.0,
    0,
    false,
    positions,
    vec![-std::f64::consts::FRAC_PI_2; count],
    vec![PointType::Common; count],
    vec![PointClassification::Common; count],
    vec![AngleType::Concave; count],
  )
}

// =============================================================================
// Batch 1: Rear placement
// =============================================================================

#[test]
fn test_square_seam_at_top_center() {
  let perimeter = square_perimeter(1.0);
  let choice = calculator()
    .pick(&perimeter, PointType::Common, PointClassification::Common)
    .unwrap();

  assert!((choice.position - DVec2::new(0.5, 1.0)).length() < EPSILON);
  assert_eq!(choice.previous_index, 2);
  assert_eq!(choice.next_index, 3);
}

#[test]
fn test_blocked_bottom_edge_is_avoided() {
  let mut perimeter = square_perimeter(1.0);
  perimeter.point_types[0] = PointType::Blocker;
  perimeter.point_types[1] = PointType::Blocker;

  let choice = choose_seam_point(&perimeter, &mut calculator());
  assert!(
    (choice.position - DVec2::new(0.5, 1.0)).length() < EPSILON,
    "Seam should go to the rear, not the blocked bottom edge"
  );
}

#[test]
fn test_missing_category_declines() {
  let perimeter = square_perimeter(1.0);
  assert!(calculator()
    .pick(&perimeter, PointType::Enforcer, PointClassification::Common)
    .is_none());
}

// =============================================================================
// Batch 2: The rear y-invariant
// =============================================================================

#[test]
fn test_rear_y_invariant_on_various_loops() {
  let loops = vec![
    // Diamond.
    vec![
      DVec2::new(1.0, 0.0),
      DVec2::new(2.0, 1.0),
      DVec2::new(1.0, 2.0),
      DVec2::new(0.0, 1.0),
    ],
    // Octagon.
    vec![
      DVec2::new(1.0, 0.0),
      DVec2::new(2.0, 0.0),
      DVec2::new(3.0, 1.0),
      DVec2::new(3.0, 2.0),
      DVec2::new(2.0, 3.0),
      DVec2::new(1.0, 3.0),
      DVec2::new(0.0, 2.0),
      DVec2::new(0.0, 1.0),
    ],
    // Wide, flat rectangle.
    vec![
      DVec2::new(0.0, 0.0),
      DVec2::new(10.0, 0.0),
      DVec2::new(10.0, 0.5),
      DVec2::new(0.0, 0.5),
    ],
  ];

  for positions in loops {
    let rear_tolerance = 0.2;
    let max_y = positions
      .iter()
      .map(|position| position.y)
      .fold(f64::NEG_INFINITY, f64::max);
    let perimeter = perimeter_from_loop(positions);

    let choice = calculator()
      .pick(&perimeter, PointType::Common, PointClassification::Common)
      .unwrap();
    assert!(
      max_y - choice.position.y <= rear_tolerance + EPSILON,
      "Rear seam y {} should be within tolerance of the top {}",
      choice.position.y,
      max_y
    );
  }
}

#[test]
fn test_choice_indices_are_valid() {
  let perimeter = square_perimeter(1.0);
  let choice = calculator()
    .pick(&perimeter, PointType::Common, PointClassification::Common)
    .unwrap();
  assert!(choice.previous_index < perimeter.positions.len());
  assert!(choice.next_index < perimeter.positions.len());
}

// =============================================================================
// Batch 3: Object driver
// =============================================================================

#[test]
fn test_object_seams_cover_all_layers() {
  let bounded = || {
    let perimeter = square_perimeter(1.0);
    let bounding_box = BBox2::from_points(perimeter.positions.iter().copied());
    BoundedPerimeter {
      perimeter,
      bounding_box,
    }
  };
  let seams = get_object_seams(vec![vec![bounded()], vec![bounded()]], 0.2, 20.0);

  assert_eq!(seams.len(), 2);
  for layer in &seams {
    assert_eq!(layer.len(), 1);
    assert!((layer[0].choice.position - DVec2::new(0.5, 1.0)).length() < EPSILON);
  }
}

#[test]
fn test_degenerate_perimeter_keeps_first_point() {
  let degenerate = Perimeter::create_degenerate(vec![DVec2::new(7.0, 8.0)], 0.2, 0);
  let bounded = BoundedPerimeter {
    bounding_box: BBox2::from_points(degenerate.positions.iter().copied()),
    perimeter: degenerate,
  };

  let seams = get_object_seams(vec![vec![bounded]], 0.2, 20.0);
  assert!((seams[0][0].choice.position - DVec2::new(7.0, 8.0)).length() < EPSILON);
}
