//! Tests for the 2D geometry utilities.

use glam::DVec2;

use super::*;
use crate::test_utils::{square_loop, EPSILON};
use crate::types::{ExPolygon, Extrusion};

// =============================================================================
// Batch 1: Edge oversampling
// =============================================================================

#[test]
fn test_oversample_edge_counts() {
  let from = DVec2::new(0.0, 0.0);
  let to = DVec2::new(1.0, 0.0);

  let points = oversample_edge(from, to, 0.2);
  assert_eq!(points.len(), 4);
  assert!((points[0] - DVec2::new(0.2, 0.0)).length() < EPSILON);

  let points = oversample_edge(from, to, 0.199);
  assert_eq!(points.len(), 5);
}

#[test]
fn test_oversample_edge_short_edge_is_untouched() {
  let points = oversample_edge(DVec2::new(0.0, 0.0), DVec2::new(0.1, 0.0), 0.2);
  assert!(points.is_empty());
}

// =============================================================================
// Batch 2: Cyclic visitors
// =============================================================================

#[test]
fn test_visit_forward_wraps() {
  let mut visited = Vec::new();
  visit_forward(3, 5, |index| {
    visited.push(index);
    visited.len() == 4
  });
  assert_eq!(visited, vec![3, 4, 0, 1]);
}

#[test]
fn test_visit_backward_starts_before_start() {
  let mut visited = Vec::new();
  visit_backward(1, 5, |index| {
    visited.push(index);
    visited.len() == 3
  });
  assert_eq!(visited, vec![0, 4, 3]);
}

#[test]
fn test_visitors_cap_visits() {
  let mut count = 0;
  visit_forward(0, 3, |_| {
    count += 1;
    false
  });
  assert_eq!(count, 30, "Visitor should stop after the hard cap");
}

// =============================================================================
// Batch 3: Angles and normals
// =============================================================================

#[test]
fn test_square_corner_angles() {
  let angles = vertex_angles(&square_loop(1.0), 0.05);
  assert_eq!(angles.len(), 4);
  for angle in angles {
    assert!(
      (angle + std::f64::consts::FRAC_PI_2).abs() < EPSILON,
      "Square corner angle should be -pi/2, got {}",
      angle
    );
  }
}

#[test]
fn test_angles_zero_when_arms_missing() {
  let points = vec![DVec2::new(0.0, 0.0), DVec2::new(0.01, 0.0)];
  let angles = vertex_angles(&points, 1.0);
  assert_eq!(angles, vec![0.0, 0.0]);
}

#[test]
fn test_polyline_normal_points_outward() {
  let normal = polyline_normal(&square_loop(1.0), 0, 0.05);
  let expected = DVec2::new(-1.0, -1.0).normalize();
  assert!((normal - expected).length() < EPSILON);
}

#[test]
fn test_polyline_normal_zero_without_arms() {
  let points = vec![DVec2::new(0.0, 0.0), DVec2::new(0.01, 0.0)];
  assert_eq!(polyline_normal(&points, 0, 1.0), DVec2::ZERO);
}

#[test]
fn test_signed_angle_quarter_turns() {
  assert!((signed_angle(DVec2::X, DVec2::Y) - std::f64::consts::FRAC_PI_2).abs() < EPSILON);
  assert!((signed_angle(DVec2::Y, DVec2::X) + std::f64::consts::FRAC_PI_2).abs() < EPSILON);
}

// =============================================================================
// Batch 4: Segments and bounding boxes
// =============================================================================

#[test]
fn test_distance_to_segment_clamps_to_endpoints() {
  let a = DVec2::new(0.0, 0.0);
  let b = DVec2::new(1.0, 0.0);

  let (foot, distance_squared) = distance_to_segment_squared(a, b, DVec2::new(0.5, 1.0));
  assert!((foot - DVec2::new(0.5, 0.0)).length() < EPSILON);
  assert!((distance_squared - 1.0).abs() < EPSILON);

  let (foot, _) = distance_to_segment_squared(a, b, DVec2::new(2.0, 1.0));
  assert!((foot - b).length() < EPSILON);
}

#[test]
fn test_bounding_box_distance_uses_corners() {
  let a = BBox2::from_points(square_loop(1.0));
  let b = BBox2::from_points(square_loop(2.0));
  assert!((bounding_box_distance(&a, &b) - 2.0f64.sqrt()).abs() < EPSILON);
}

#[test]
fn test_pick_closest_bounding_box() {
  let target = BBox2::from_points(square_loop(1.0));
  let candidates = vec![
    BBox2::from_points(square_loop(4.0)),
    BBox2::from_points(square_loop(1.1)),
    BBox2::from_points(square_loop(2.0)),
  ];
  let (index, distance) = pick_closest_bounding_box(&target, &candidates).unwrap();
  assert_eq!(index, 1);
  assert!(distance < 0.2);

  assert!(pick_closest_bounding_box(&target, &[]).is_none());
}

#[test]
fn test_is_clockwise() {
  let mut points = square_loop(1.0);
  assert!(!is_clockwise(&points));
  points.reverse();
  assert!(is_clockwise(&points));
}

// =============================================================================
// Batch 5: Loop expansion
// =============================================================================

#[test]
fn test_expand_loop_grows_bounding_box() {
  let expanded = expand_loop(&square_loop(1.0), 0.5).unwrap();
  let bounding_box = BBox2::from_points(expanded.iter().copied());
  assert!(bounding_box.min.x < -0.4);
  assert!(bounding_box.max.x > 1.4);
  assert!(!is_clockwise(&expanded), "Expansion should keep winding");
}

#[test]
fn test_expand_loop_keeps_hole_winding() {
  let mut hole = square_loop(1.0);
  hole.reverse();
  let expanded = expand_loop(&hole, 0.2).unwrap();
  assert!(is_clockwise(&expanded));
}

#[test]
fn test_expand_loop_rejects_degenerate_input() {
  assert!(expand_loop(&[DVec2::ZERO, DVec2::X], 0.5).is_none());
}

// =============================================================================
// Batch 6: Projection to island boundary
// =============================================================================

fn centered_square(half_size: f64) -> Vec<DVec2> {
  vec![
    DVec2::new(-half_size, -half_size),
    DVec2::new(half_size, -half_size),
    DVec2::new(half_size, half_size),
    DVec2::new(-half_size, half_size),
  ]
}

#[test]
fn test_project_to_boundary_matches() {
  let extrusion_width = 0.2;
  let boundary = ExPolygon {
    contour: centered_square(1.0 + extrusion_width / 2.0 + 0.1),
    holes: Vec::new(),
  };
  let extrusions = vec![Extrusion::new(
    centered_square(1.0),
    extrusion_width,
    &boundary,
    Vec::new(),
  )];

  let result = project_to_boundary(&extrusions, 5.0);
  assert_eq!(result.len(), 1);
  assert_eq!(result[0].polygon.len(), 4);
  // The boundary polygon is picked.
  assert!((result[0].polygon[0].x + (1.0 + extrusion_width / 2.0 + 0.1)).abs() < EPSILON);
  assert!(!result[0].is_hole);
}

#[test]
fn test_project_to_boundary_falls_back_to_expansion() {
  let extrusion_width = 0.2;
  // Island boundary is far from the extrusion.
  let boundary = ExPolygon {
    contour: centered_square(5.0),
    holes: Vec::new(),
  };
  let extrusions = vec![Extrusion::new(
    centered_square(1.0),
    extrusion_width,
    &boundary,
    Vec::new(),
  )];

  let result = project_to_boundary(&extrusions, 1.0);
  assert_eq!(result.len(), 1);

  // The extrusion is expanded by half its width and returned.
  let bounding_box = &result[0].bounding_box;
  assert!(bounding_box.max.x > 1.05 && bounding_box.max.x < 1.2);
  assert!(bounding_box.min.y < -1.05 && bounding_box.min.y > -1.2);
}

// =============================================================================
// Batch 7: Nested parallel map
// =============================================================================

#[test]
fn test_flat_index_table() {
  let nested = vec![vec![1, 2], vec![3], Vec::new(), vec![4, 5]];
  assert_eq!(
    flat_index_table(&nested),
    vec![(0, 0), (0, 1), (1, 0), (3, 0), (3, 1)]
  );
}

#[test]
fn test_map_nested_parallel_preserves_shape_and_order() {
  let nested = vec![vec![1, 2, 3], Vec::new(), vec![4]];
  let result = map_nested_parallel(&nested, |parent, index, value| (parent, index, value * 10));
  assert_eq!(
    result,
    vec![
      vec![(0, 0, 10), (0, 1, 20), (0, 2, 30)],
      Vec::new(),
      vec![(2, 0, 40)],
    ]
  );
}
