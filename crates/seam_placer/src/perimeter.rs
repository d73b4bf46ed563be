//! Per-layer perimeter construction.
//!
//! Each closed extrusion loop becomes a [`Perimeter`]: an immutable cyclic
//! vertex list with parallel arrays of angles, painted point types,
//! overhang/embedding classifications and angle types, plus one vertex tree
//! per (type, classification) category so choosers can query by category.
//!
//! Types and classifications are assigned before redundant point removal,
//! and the removal never crosses a category change, so category runs
//! survive simplification.

use std::collections::BTreeMap;

use geo::{Coord, LineString, Simplify};
use glam::DVec2;
use rayon::prelude::*;
use rstar::primitives::GeomWithData;
use rstar::RTree;

use crate::distancer::LineDistancer;
use crate::geometry::{
  self, expand_loop, is_clockwise, map_nested_parallel, to_3d, vertex_angles, BBox2,
  BoundedPolygon,
};
use crate::painting::Painting;
use crate::params::PerimeterParams;
use crate::types::{OverhangRegion, SlicedLayer};

/// Painted state of a perimeter point.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PointType {
  Enforcer,
  Blocker,
  #[default]
  Common,
}

/// Geometric classification of a perimeter point.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PointClassification {
  /// Hangs over the previous layer.
  Overhang,

  /// Deep inside the current layer outline, surrounded by more material.
  Embedded,

  #[default]
  Common,
}

/// Corner shape at a perimeter point.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AngleType {
  Convex,
  Concave,
  Smooth,
}

/// Priority of a (type, classification) category; higher is better.
pub fn point_value(point_type: PointType, point_classification: PointClassification) -> u32 {
  // Better be explicit than smart.
  match point_type {
    PointType::Enforcer => match point_classification {
      PointClassification::Embedded => 9,
      PointClassification::Common => 8,
      PointClassification::Overhang => 7,
    },
    PointType::Common => match point_classification {
      PointClassification::Embedded => 6,
      PointClassification::Common => 5,
      PointClassification::Overhang => 4,
    },
    PointType::Blocker => match point_classification {
      PointClassification::Embedded => 3,
      PointClassification::Common => 2,
      PointClassification::Overhang => 1,
    },
  }
}

/// Outline lookup for one layer: the current layer's islands and, when it
/// exists, the previous layer's.
pub struct LayerInfo {
  pub distancer: LineDistancer,
  pub previous_distancer: Option<LineDistancer>,
  pub index: usize,
  pub height: f64,
  pub slice_z: f64,
  pub elephant_foot_compensation: f64,
}

fn boundary_loops(layer: &SlicedLayer) -> Vec<Vec<DVec2>> {
  layer
    .islands
    .iter()
    .flat_map(|island| island.boundary.loops().cloned())
    .collect()
}

impl LayerInfo {
  pub fn create(layers: &[SlicedLayer], index: usize, elephant_foot_compensation: f64) -> Self {
    let layer = &layers[index];
    let distancer = LineDistancer::new(&boundary_loops(layer));
    let previous_distancer = if index > 0 {
      Some(LineDistancer::new(&boundary_loops(&layers[index - 1])))
    } else {
      None
    };
    Self {
      distancer,
      previous_distancer,
      index,
      height: layer.height,
      slice_z: layer.slice_z,
      elephant_foot_compensation: if index == 0 {
        elephant_foot_compensation
      } else {
        0.0
      },
    }
  }
}

/// Construct a [`LayerInfo`] for each layer, in parallel.
pub fn layer_infos(layers: &[SlicedLayer], elephant_foot_compensation: f64) -> Vec<LayerInfo> {
  (0..layers.len())
    .into_par_iter()
    .map(|index| LayerInfo::create(layers, index, elephant_foot_compensation))
    .collect()
}

/// Working representation of a perimeter point during construction.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct PerimeterPoint {
  pub position: DVec2,
  pub point_type: PointType,
  pub classification: PointClassification,
}

impl PerimeterPoint {
  fn new(position: DVec2) -> Self {
    Self {
      position,
      ..Self::default()
    }
  }
}

pub type PointTree = RTree<GeomWithData<[f64; 2], usize>>;
pub type OptionalPointTree = Option<PointTree>;

/// Vertex trees of one point type, split by classification.
#[derive(Default)]
pub struct PointTrees {
  pub overhanging_points: OptionalPointTree,
  pub embedded_points: OptionalPointTree,
  pub common_points: OptionalPointTree,
}

fn build_tree(positions: &[DVec2], indexes: Vec<usize>) -> OptionalPointTree {
  if indexes.is_empty() {
    return None;
  }
  Some(PointTree::bulk_load(
    indexes
      .into_iter()
      .map(|index| {
        let position = positions[index];
        GeomWithData::new([position.x, position.y], index)
      })
      .collect(),
  ))
}

fn get_point_trees(
  point_type: PointType,
  all_point_types: &[PointType],
  point_classifications: &[PointClassification],
  positions: &[DVec2],
) -> PointTrees {
  let mut overhang_indexes = Vec::new();
  let mut embedded_indexes = Vec::new();
  let mut common_indexes = Vec::new();
  for (index, current_type) in all_point_types.iter().enumerate() {
    if *current_type == point_type {
      match point_classifications[index] {
        PointClassification::Overhang => overhang_indexes.push(index),
        PointClassification::Embedded => embedded_indexes.push(index),
        PointClassification::Common => common_indexes.push(index),
      }
    }
  }
  PointTrees {
    overhanging_points: build_tree(positions, overhang_indexes),
    embedded_points: build_tree(positions, embedded_indexes),
    common_points: build_tree(positions, common_indexes),
  }
}

/// One closed, processed perimeter loop. The parallel arrays share indexing
/// and indices are cyclic modulo their length.
pub struct Perimeter {
  pub is_degenerate: bool,
  pub slice_z: f64,
  pub is_hole: bool,
  pub layer_index: usize,
  pub positions: Vec<DVec2>,
  pub angles: Vec<f64>,
  pub point_types: Vec<PointType>,
  pub point_classifications: Vec<PointClassification>,
  pub angle_types: Vec<AngleType>,

  pub enforced_points: PointTrees,
  pub common_points: PointTrees,
  pub blocked_points: PointTrees,
}

impl Perimeter {
  pub fn new(
    slice_z: f64,
    layer_index: usize,
    is_hole: bool,
    positions: Vec<DVec2>,
    angles: Vec<f64>,
    point_types: Vec<PointType>,
    point_classifications: Vec<PointClassification>,
    angle_types: Vec<AngleType>,
  ) -> Self {
    let enforced_points = get_point_trees(
      PointType::Enforcer,
      &point_types,
      &point_classifications,
      &positions,
    );
    let common_points = get_point_trees(
      PointType::Common,
      &point_types,
      &point_classifications,
      &positions,
    );
    let blocked_points = get_point_trees(
      PointType::Blocker,
      &point_types,
      &point_classifications,
      &positions,
    );
    Self {
      is_degenerate: false,
      slice_z,
      is_hole,
      layer_index,
      positions,
      angles,
      point_types,
      point_classifications,
      angle_types,
      enforced_points,
      common_points,
      blocked_points,
    }
  }

  /// A perimeter for loops with fewer than 3 points: everything common and
  /// smooth, no usable geometry.
  pub fn create_degenerate(points: Vec<DVec2>, slice_z: f64, layer_index: usize) -> Self {
    let count = points.len();
    let mut perimeter = Self::new(
      slice_z,
      layer_index,
      false,
      points,
      vec![0.0; count],
      vec![PointType::Common; count],
      vec![PointClassification::Common; count],
      vec![AngleType::Smooth; count],
    );
    perimeter.is_degenerate = true;
    perimeter
  }

  pub fn create(
    bounded_polygon: &BoundedPolygon,
    painting: &Painting,
    layer_info: &LayerInfo,
    params: &PerimeterParams,
  ) -> Self {
    if bounded_polygon.polygon.len() < 3 {
      return Self::create_degenerate(
        bounded_polygon.polygon.clone(),
        layer_info.slice_z,
        layer_info.index,
      );
    }

    let points = if layer_info.elephant_foot_compensation > 0.0 {
      expand_loop(&bounded_polygon.polygon, layer_info.elephant_foot_compensation)
        .unwrap_or_else(|| bounded_polygon.polygon.clone())
    } else {
      bounded_polygon.polygon.clone()
    };

    let is_hole = is_clockwise(&bounded_polygon.polygon);

    let mut perimeter_points: Vec<PerimeterPoint> =
      points.into_iter().map(PerimeterPoint::new).collect();

    perimeter_points = classify_points(
      perimeter_points,
      &bounded_polygon.overhangs,
      params.embedding_threshold,
      layer_info,
      params.overhang_threshold,
    );

    let is_painted = |point: glam::Vec3, radius: f64| {
      painting.is_enforced(point, radius as f32) || painting.is_blocked(point, radius as f32)
    };
    perimeter_points = oversample_painted(
      &perimeter_points,
      &is_painted,
      layer_info.slice_z,
      params.oversampling_max_distance,
    );

    perimeter_points = get_point_types(
      perimeter_points,
      painting,
      layer_info.slice_z,
      params.painting_radius,
    );

    perimeter_points = remove_redundant_points(&perimeter_points, params.simplification_epsilon);

    let mut positions = Vec::with_capacity(perimeter_points.len());
    let mut point_types = Vec::with_capacity(perimeter_points.len());
    let mut point_classifications = Vec::with_capacity(perimeter_points.len());
    for point in &perimeter_points {
      positions.push(point.position);
      point_types.push(point.point_type);
      point_classifications.push(point.classification);
    }

    let smooth_angles = vertex_angles(&positions, params.smooth_angle_arm_length);
    let angles = vertex_angles(&positions, params.sharp_angle_arm_length);
    let angle_types = get_angle_types(&angles, params.convex_threshold, params.concave_threshold);
    let smooth_angle_types =
      get_angle_types(&smooth_angles, params.convex_threshold, params.concave_threshold);
    let angle_types = merge_angle_types(
      &angle_types,
      &smooth_angle_types,
      &positions,
      params.smooth_angle_arm_length,
    );

    Self::new(
      layer_info.slice_z,
      layer_info.index,
      is_hole,
      positions,
      angles,
      point_types,
      point_classifications,
      angle_types,
    )
  }
}

/// Positions of all points with the given type.
pub fn extract_points(perimeter: &Perimeter, point_type: PointType) -> Vec<DVec2> {
  perimeter
    .positions
    .iter()
    .zip(&perimeter.point_types)
    .filter(|(_, current_type)| **current_type == point_type)
    .map(|(position, _)| *position)
    .collect()
}

/// A perimeter with its bounding box, ready for shell linking.
pub struct BoundedPerimeter {
  pub perimeter: Perimeter,
  pub bounding_box: BBox2,
}

/// Build all perimeters of all layers, parallel over the flattened
/// `(layer, polygon)` table.
pub fn create_perimeters(
  polygons: &[Vec<BoundedPolygon>],
  layer_infos: &[LayerInfo],
  painting: &Painting,
  params: &PerimeterParams,
) -> Vec<Vec<BoundedPerimeter>> {
  map_nested_parallel(polygons, |layer_index, _, bounded_polygon| {
    BoundedPerimeter {
      perimeter: Perimeter::create(bounded_polygon, painting, &layer_infos[layer_index], params),
      bounding_box: bounded_polygon.bounding_box,
    }
  })
}

fn overhang_angle(point: DVec2, previous_distancer: &LineDistancer, layer_height: f64) -> f64 {
  let distance = previous_distancer.signed_distance(point);
  if distance > 0.0 {
    std::f64::consts::FRAC_PI_2 - (layer_height / distance).atan()
  } else {
    0.0
  }
}

/// Splice an overhang arc's endpoints into the loop as two category
/// breaks: (common, overhang) at the start, (overhang, common) at the end.
fn project_overhang(
  points_distancer: &LineDistancer,
  start: DVec2,
  end: DVec2,
  output: &mut BTreeMap<usize, Vec<PerimeterPoint>>,
) {
  if let Some((start_line_index, start_point, _)) = points_distancer.nearest(start) {
    let mut common_start = PerimeterPoint::new(start_point);
    common_start.classification = PointClassification::Common;
    output.entry(start_line_index).or_default().push(common_start);

    let mut overhang_start = PerimeterPoint::new(start_point);
    overhang_start.classification = PointClassification::Overhang;
    output
      .entry(start_line_index)
      .or_default()
      .push(overhang_start);
  }

  if let Some((end_line_index, end_point, _)) = points_distancer.nearest(end) {
    let mut overhang_end = PerimeterPoint::new(end_point);
    overhang_end.classification = PointClassification::Overhang;
    output.entry(end_line_index).or_default().push(overhang_end);

    let mut common_end = PerimeterPoint::new(end_point);
    common_end.classification = PointClassification::Common;
    output.entry(end_line_index).or_default().push(common_end);
  }
}

fn classify_overhangs(
  mut points: Vec<PerimeterPoint>,
  overhangs: &[OverhangRegion],
  layer_info: &LayerInfo,
  overhang_threshold: f64,
) -> Vec<PerimeterPoint> {
  let Some(previous_distancer) = &layer_info.previous_distancer else {
    return points;
  };

  let loop_positions: Vec<DVec2> = points.iter().map(|point| point.position).collect();
  let points_distancer = LineDistancer::new(&[loop_positions]);

  let mut points_to_add_to_lines: BTreeMap<usize, Vec<PerimeterPoint>> = BTreeMap::new();
  for overhang in overhangs {
    match overhang {
      OverhangRegion::Arc { start, end } => {
        project_overhang(&points_distancer, *start, *end, &mut points_to_add_to_lines);
      }
      OverhangRegion::FullLoop => {
        for point in &mut points {
          point.classification = PointClassification::Overhang;
        }
      }
    }
  }

  let mut result = Vec::with_capacity(points.len());
  for (index, mut point) in points.into_iter().enumerate() {
    if point.classification != PointClassification::Overhang {
      let angle = overhang_angle(point.position, previous_distancer, layer_info.height);
      if angle > overhang_threshold {
        point.classification = PointClassification::Overhang;
      }
    }
    result.push(point);
    if let Some(extra_points) = points_to_add_to_lines.get(&index) {
      result.extend(extra_points.iter().copied());
    }
  }
  result
}

pub(crate) fn classify_points(
  points: Vec<PerimeterPoint>,
  overhangs: &[OverhangRegion],
  embedding_threshold: f64,
  layer_info: &LayerInfo,
  overhang_threshold: f64,
) -> Vec<PerimeterPoint> {
  let mut result = classify_overhangs(points, overhangs, layer_info, overhang_threshold);

  for point in &mut result {
    if point.classification != PointClassification::Common {
      continue;
    }
    let embedding_distance = layer_info.distancer.signed_distance(point.position);
    if embedding_distance <= -embedding_threshold {
      point.classification = PointClassification::Embedded;
    }
  }
  result
}

/// Split edges with painted points anywhere on them into pieces no more
/// than `max_distance` apart. Inserted points inherit the stricter of the
/// edge endpoint classifications.
pub(crate) fn oversample_painted(
  points: &[PerimeterPoint],
  is_painted: &dyn Fn(glam::Vec3, f64) -> bool,
  slice_z: f64,
  max_distance: f64,
) -> Vec<PerimeterPoint> {
  let mut result = Vec::with_capacity(points.len());

  for (index, point) in points.iter().enumerate() {
    result.push(*point);

    let next_index = if index == points.len() - 1 { 0 } else { index + 1 };
    let next_point = points[next_index].position;
    let next_point_distance = (point.position - next_point).length();
    let middle_point = (point.position + next_point) / 2.0;
    if is_painted(to_3d(middle_point, slice_z), next_point_distance / 2.0) {
      for edge_point in geometry::oversample_edge(point.position, next_point, max_distance) {
        let mut perimeter_point = PerimeterPoint::new(edge_point);
        if points[next_index].classification != PointClassification::Common {
          perimeter_point.classification = points[next_index].classification;
        }
        if points[index].classification != PointClassification::Common {
          perimeter_point.classification = points[index].classification;
        }
        result.push(perimeter_point);
      }
    }
  }
  result
}

fn get_point_types(
  perimeter_points: Vec<PerimeterPoint>,
  painting: &Painting,
  slice_z: f64,
  painting_radius: f64,
) -> Vec<PerimeterPoint> {
  perimeter_points
    .into_iter()
    .map(|mut point| {
      let point3d = to_3d(point.position, slice_z);
      point.point_type = if painting.is_blocked(point3d, painting_radius as f32) {
        PointType::Blocker
      } else if painting.is_enforced(point3d, painting_radius as f32) {
        PointType::Enforcer
      } else {
        PointType::Common
      };
      point
    })
    .collect()
}

/// Douglas-Peucker limited to runs of equal (type, classification). Run
/// endpoints are always kept, so the ordered category runs are preserved.
pub(crate) fn remove_redundant_points(
  points: &[PerimeterPoint],
  tolerance: f64,
) -> Vec<PerimeterPoint> {
  let mut result = Vec::new();
  let mut range_start = 0usize;

  for index in 0..points.len() {
    let run_ends = index + 1 == points.len()
      || points[index].point_type != points[index + 1].point_type
      || points[index].classification != points[index + 1].classification;
    if !run_ends {
      continue;
    }

    let run = &points[range_start..=index];
    if run.len() <= 2 {
      result.extend_from_slice(run);
    } else {
      let line: LineString<f64> = run
        .iter()
        .map(|point| Coord {
          x: point.position.x,
          y: point.position.y,
        })
        .collect();
      let simplified = line.simplify(&tolerance);
      for coord in simplified.coords() {
        let mut point = run[0];
        point.position = DVec2::new(coord.x, coord.y);
        result.push(point);
      }
    }
    range_start = index + 1;
  }
  result
}

pub(crate) fn get_angle_types(
  angles: &[f64],
  convex_threshold: f64,
  concave_threshold: f64,
) -> Vec<AngleType> {
  angles
    .iter()
    .map(|&angle| {
      if angle > convex_threshold {
        AngleType::Convex
      } else if angle < -concave_threshold {
        AngleType::Concave
      } else {
        AngleType::Smooth
      }
    })
    .collect()
}

/// Merge sharp-arm and smooth-arm classifications. The smooth arm wins when
/// it found a corner the sharp arm missed, unless a matching sharp corner
/// exists nearby, in which case that corner is the real one.
pub(crate) fn merge_angle_types(
  angle_types: &[AngleType],
  smooth_angle_types: &[AngleType],
  points: &[DVec2],
  min_arm_length: f64,
) -> Vec<AngleType> {
  let mut result = Vec::with_capacity(angle_types.len());
  for index in 0..angle_types.len() {
    let angle_type = angle_types[index];
    let smooth_angle_type = smooth_angle_types[index];

    let mut resulting_type = angle_type;
    if smooth_angle_type != angle_type && smooth_angle_type != AngleType::Smooth {
      resulting_type = smooth_angle_type;

      let mut check_vicinity = |neighbor_index: usize| -> bool {
        let distance = (points[neighbor_index] - points[index]).length();
        if distance > min_arm_length {
          return true;
        }
        if angle_types[neighbor_index] == smooth_angle_type {
          resulting_type = angle_type;
        }
        false
      };
      geometry::visit_forward(index, angle_types.len(), &mut check_vicinity);
      geometry::visit_backward(index, angle_types.len(), &mut check_vicinity);
    }
    result.push(resulting_type);
  }
  result
}

#[cfg(test)]
#[path = "perimeter_test.rs"]
mod perimeter_test;
