//! 2D geometry utilities shared by the seam pipeline.
//!
//! Perimeters are cyclic vertex lists; all cyclic access is index arithmetic
//! modulo the loop length. The bounded visitors cap at 30 steps so that
//! pathological loops cannot spin an angle lookup forever.

pub mod mapping;

use geo::{Coord, LineString, Polygon};
use glam::{DVec2, Vec3};
use rayon::prelude::*;

use crate::types::{Extrusion, OverhangRegion};

/// Hard cap on bounded cyclic visits.
const MAX_VISITED: usize = 30;

/// Axis-aligned 2D bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BBox2 {
  pub min: DVec2,
  pub max: DVec2,
}

impl BBox2 {
  /// Create a box with inverted extents (ready for encapsulation).
  pub fn empty() -> Self {
    Self {
      min: DVec2::splat(f64::INFINITY),
      max: DVec2::splat(f64::NEG_INFINITY),
    }
  }

  pub fn from_points(points: impl IntoIterator<Item = DVec2>) -> Self {
    let mut result = Self::empty();
    for point in points {
      result.encapsulate(point);
    }
    result
  }

  #[inline]
  pub fn encapsulate(&mut self, point: DVec2) {
    self.min = self.min.min(point);
    self.max = self.max.max(point);
  }

  pub fn merge(&mut self, other: &BBox2) {
    self.min = self.min.min(other.min);
    self.max = self.max.max(other.max);
  }

  pub fn center(&self) -> DVec2 {
    (self.min + self.max) / 2.0
  }

  pub fn is_valid(&self) -> bool {
    self.min.x <= self.max.x && self.min.y <= self.max.y
  }
}

impl Default for BBox2 {
  fn default() -> Self {
    Self::empty()
  }
}

/// Distance between two bounding boxes: the larger of the corner-to-corner
/// distances, so boxes only count as close when they are close in both size
/// and placement.
pub fn bounding_box_distance(a: &BBox2, b: &BBox2) -> f64 {
  let max_distance = (a.max - b.max).length();
  let min_distance = (a.min - b.min).length();
  max_distance.max(min_distance)
}

/// Index and distance of the bounding box closest to `to`.
pub fn pick_closest_bounding_box(to: &BBox2, choose_from: &[BBox2]) -> Option<(usize, f64)> {
  let mut min_distance = f64::INFINITY;
  let mut chosen_index = None;

  for (index, candidate) in choose_from.iter().enumerate() {
    let distance = bounding_box_distance(candidate, to);
    if distance < min_distance {
      chosen_index = Some(index);
      min_distance = distance;
    }
  }
  chosen_index.map(|index| (index, min_distance))
}

/// Lift a layer-plane point to 3D at the given height.
#[inline]
pub fn to_3d(point: DVec2, z: f64) -> Vec3 {
  Vec3::new(point.x as f32, point.y as f32, z as f32)
}

/// Outward normal of an edge vector.
pub fn edge_normal(edge: DVec2) -> DVec2 {
  DVec2::new(edge.y, -edge.x).normalize_or_zero()
}

/// Signed angle from `from` to `to`, positive counterclockwise.
#[inline]
pub fn signed_angle(from: DVec2, to: DVec2) -> f64 {
  from.perp_dot(to).atan2(from.dot(to))
}

/// Shoelace test. Holes are clockwise.
pub fn is_clockwise(points: &[DVec2]) -> bool {
  let mut doubled_area = 0.0;
  for (index, point) in points.iter().enumerate() {
    let next = points[(index + 1) % points.len()];
    doubled_area += point.perp_dot(next);
  }
  doubled_area < 0.0
}

/// Visit indices forward from `start_index` (inclusive) around a loop of
/// `loop_size` items until the visitor returns true or the visit cap hits.
pub fn visit_forward(start_index: usize, loop_size: usize, mut visitor: impl FnMut(usize) -> bool) {
  let last_index = loop_size - 1;
  let mut index = start_index;
  for _ in 0..MAX_VISITED {
    if visitor(index) {
      return;
    }
    index = if index == last_index { 0 } else { index + 1 };
  }
}

/// Visit indices backward starting one before `start_index`.
pub fn visit_backward(start_index: usize, loop_size: usize, mut visitor: impl FnMut(usize) -> bool) {
  let last_index = loop_size - 1;
  let mut index = if start_index == 0 {
    last_index
  } else {
    start_index - 1
  };
  for _ in 0..MAX_VISITED {
    if visitor(index) {
      return;
    }
    index = if index == 0 { last_index } else { index - 1 };
  }
}

/// Find the arm endpoints around `index`: the nearest vertex in each
/// direction further than `min_arm_length` away.
fn find_arms(
  points: &[DVec2],
  index: usize,
  min_arm_length: f64,
) -> Option<(usize, usize)> {
  let mut previous_index = None;
  let mut next_index = None;

  visit_forward(index, points.len(), |index_candidate| {
    if index == index_candidate {
      return false;
    }
    let distance = (points[index_candidate] - points[index]).length();
    if distance > min_arm_length {
      next_index = Some(index_candidate);
      return true;
    }
    false
  });
  visit_backward(index, points.len(), |index_candidate| {
    let distance = (points[index_candidate] - points[index]).length();
    if distance > min_arm_length {
      previous_index = Some(index_candidate);
      return true;
    }
    false
  });

  match (previous_index, next_index) {
    (Some(previous), Some(next)) => Some((previous, next)),
    _ => None,
  }
}

/// Outward vertex normal at `index`, averaged from two arms of at least
/// `min_arm_length`. Returns zero when either arm cannot be found, which
/// callers treat as "no reliable normal".
pub fn polyline_normal(points: &[DVec2], index: usize, min_arm_length: f64) -> DVec2 {
  match find_arms(points, index, min_arm_length) {
    Some((previous, next)) => {
      let previous_normal = edge_normal(points[index] - points[previous]);
      let next_normal = edge_normal(points[next] - points[index]);
      (previous_normal + next_normal).normalize_or_zero()
    }
    None => DVec2::ZERO,
  }
}

/// Signed vertex angles, measured from outside; convex is positive.
pub fn vertex_angles(points: &[DVec2], min_arm_length: f64) -> Vec<f64> {
  (0..points.len())
    .map(|index| match find_arms(points, index, min_arm_length) {
      Some((previous, next)) => {
        let point = points[index];
        -signed_angle(point - points[previous], points[next] - point)
      }
      None => 0.0,
    })
    .collect()
}

/// Nearest point on the segment `(a, b)` to `point`, with the squared
/// distance to it.
pub fn distance_to_segment_squared(a: DVec2, b: DVec2, point: DVec2) -> (DVec2, f64) {
  let edge = b - a;
  let length_squared = edge.length_squared();
  let foot = if length_squared == 0.0 {
    a
  } else {
    let t = ((point - a).dot(edge) / length_squared).clamp(0.0, 1.0);
    a + t * edge
  };
  (foot, (point - foot).length_squared())
}

/// The interior lattice of points splitting the edge `from -> to` into
/// pieces no longer than `max_distance`. Excludes both endpoints.
pub fn oversample_edge(from: DVec2, to: DVec2, max_distance: f64) -> Vec<DVec2> {
  let total_distance = (from - to).length();
  let points_count = (total_distance / max_distance).ceil() as usize + 1;
  if points_count < 3 {
    return Vec::new();
  }
  let step_size = total_distance / (points_count - 1) as f64;
  let step_vector = step_size * (to - from).normalize();
  (1..points_count - 1)
    .map(|i| from + i as f64 * step_vector)
    .collect()
}

/// Expand a closed loop outward by `offset`. Returns `None` when the offset
/// produces no polygons; the caller falls back to the input.
pub fn expand_loop(points: &[DVec2], offset: f64) -> Option<Vec<DVec2>> {
  if points.len() < 3 || offset <= 0.0 {
    return None;
  }
  let was_clockwise = is_clockwise(points);
  let mut coords: Vec<Coord<f64>> = points
    .iter()
    .map(|point| Coord {
      x: point.x,
      y: point.y,
    })
    .collect();
  if was_clockwise {
    coords.reverse();
  }
  let polygon = Polygon::new(LineString::from(coords), Vec::new());
  let expanded = geo_buf::buffer_polygon(&polygon, offset);

  let largest = expanded
    .0
    .iter()
    .max_by(|a, b| {
      use geo::Area;
      a.unsigned_area().total_cmp(&b.unsigned_area())
    })?;

  let mut result: Vec<DVec2> = largest
    .exterior()
    .coords()
    .map(|coord| DVec2::new(coord.x, coord.y))
    .collect();
  // geo rings repeat the first point at the end; perimeters do not.
  if result.len() > 1 && result.first() == result.last() {
    result.pop();
  }
  if result.len() < 3 {
    return None;
  }
  if was_clockwise != is_clockwise(&result) {
    result.reverse();
  }
  Some(result)
}

/// A closed loop ready for perimeter construction, with its bounding box and
/// the overhang regions the slicer attributed to it.
#[derive(Clone, Debug)]
pub struct BoundedPolygon {
  pub polygon: Vec<DVec2>,
  pub bounding_box: BBox2,
  pub is_hole: bool,
  pub overhangs: Vec<OverhangRegion>,
}

/// Project external perimeter extrusions onto their island boundary.
///
/// For each extrusion the closest island boundary loop (contour or hole, by
/// bounding box distance) is used; when even the closest one is further than
/// `max_bb_distance`, the extrusion itself is expanded outward by half its
/// width instead.
pub fn project_to_boundary(
  external_perimeters: &[Extrusion],
  max_bb_distance: f64,
) -> Vec<BoundedPolygon> {
  external_perimeters
    .iter()
    .map(|external_perimeter| {
      let boundary_boxes = &external_perimeter.island_boundary_bounding_boxes;
      let (chosen_index, distance) =
        pick_closest_bounding_box(&external_perimeter.bounding_box, boundary_boxes)
          .unwrap_or((0, f64::INFINITY));

      if distance > max_bb_distance {
        if let Some(expanded) =
          expand_loop(&external_perimeter.polygon, external_perimeter.width / 2.0)
        {
          return BoundedPolygon {
            bounding_box: BBox2::from_points(expanded.iter().copied()),
            is_hole: is_clockwise(&external_perimeter.polygon),
            polygon: expanded,
            overhangs: external_perimeter.overhangs.clone(),
          };
        }
      }

      let is_hole = chosen_index != 0;
      let adjacent_boundary = if is_hole {
        &external_perimeter.island_boundary.holes[chosen_index - 1]
      } else {
        &external_perimeter.island_boundary.contour
      };
      BoundedPolygon {
        polygon: adjacent_boundary.clone(),
        bounding_box: boundary_boxes
          .get(chosen_index)
          .copied()
          .unwrap_or(external_perimeter.bounding_box),
        is_hole,
        overhangs: external_perimeter.overhangs.clone(),
      }
    })
    .collect()
}

/// Keep the raw extrusion loops. The random strategy samples the printed
/// path itself rather than the island boundary.
pub fn convert_to_geometry(external_perimeters: &[Extrusion]) -> Vec<BoundedPolygon> {
  external_perimeters
    .iter()
    .map(|extrusion| BoundedPolygon {
      polygon: extrusion.polygon.clone(),
      bounding_box: extrusion.bounding_box,
      is_hole: is_clockwise(&extrusion.polygon),
      overhangs: extrusion.overhangs.clone(),
    })
    .collect()
}

/// Flattened `(parent, nested)` index table of a list of lists.
pub fn flat_index_table<T>(nested: &[Vec<T>]) -> Vec<(usize, usize)> {
  let mut result = Vec::with_capacity(nested.iter().map(Vec::len).sum());
  for (parent_index, vector) in nested.iter().enumerate() {
    for nested_index in 0..vector.len() {
      result.push((parent_index, nested_index));
    }
  }
  result
}

/// Map every item of a nested list in parallel, preserving the nesting.
///
/// The work is distributed over the flattened index table so that uneven
/// inner lists still balance across workers. Output order is deterministic.
pub fn map_nested_parallel<T, R, F>(nested: &[Vec<T>], function: F) -> Vec<Vec<R>>
where
  T: Sync,
  R: Send,
  F: Fn(usize, usize, &T) -> R + Sync,
{
  let table = flat_index_table(nested);
  let flat: Vec<R> = table
    .par_iter()
    .map(|&(parent_index, nested_index)| {
      function(parent_index, nested_index, &nested[parent_index][nested_index])
    })
    .collect();

  let mut result: Vec<Vec<R>> = nested
    .iter()
    .map(|vector| Vec::with_capacity(vector.len()))
    .collect();
  for (&(parent_index, _), item) in table.iter().zip(flat) {
    result[parent_index].push(item);
  }
  result
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod mod_test;
