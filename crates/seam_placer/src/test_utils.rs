//! Shared fixtures for unit tests.

use glam::{DMat4, DVec2, Vec3};

use crate::mesh::TriangleSet;
use crate::params::SeamPosition;
use crate::perimeter::{AngleType, Perimeter, PointClassification, PointType};
use crate::types::{
  ExPolygon, ExternalPerimeter, Island, ModelVolume, SlicedLayer, SlicedObject, VolumeKind,
};

pub const EPSILON: f64 = 1e-6;

/// Counterclockwise square loop with corners at `(0, 0)` and
/// `(side, side)`.
pub fn square_loop(side: f64) -> Vec<DVec2> {
  vec![
    DVec2::new(0.0, 0.0),
    DVec2::new(side, 0.0),
    DVec2::new(side, side),
    DVec2::new(0.0, side),
  ]
}

/// A plain square perimeter: all points common, all corners concave.
pub fn square_perimeter(side: f64) -> Perimeter {
  let positions = square_loop(side);
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

/// The five-point unit square used by the chooser tests: four concave
/// corners plus a smooth midpoint on the left edge.
pub fn notched_square_perimeter() -> Perimeter {
  let positions = vec![
    DVec2::new(0.0, 0.0),
    DVec2::new(1.0, 0.0),
    DVec2::new(1.0, 1.0),
    DVec2::new(0.0, 1.0),
    DVec2::new(0.0, 0.5),
  ];
  let mut angles = vec![-std::f64::consts::FRAC_PI_2; positions.len()];
  angles[4] = 0.0;
  let mut angle_types = vec![AngleType::Concave; positions.len()];
  angle_types[4] = AngleType::Smooth;

  Perimeter::new(
    1.0,
    0,
    false,
    positions,
    angles,
    vec![PointType::Common; 5],
    vec![PointClassification::Common; 5],
    angle_types,
  )
}

/// Axis-aligned closed box mesh with outward-facing triangles.
pub fn box_mesh(min: Vec3, max: Vec3) -> TriangleSet {
  let positions = vec![
    Vec3::new(min.x, min.y, min.z),
    Vec3::new(max.x, min.y, min.z),
    Vec3::new(max.x, max.y, min.z),
    Vec3::new(min.x, max.y, min.z),
    Vec3::new(min.x, min.y, max.z),
    Vec3::new(max.x, min.y, max.z),
    Vec3::new(max.x, max.y, max.z),
    Vec3::new(min.x, max.y, max.z),
  ];
  let indices = vec![
    // bottom (-z)
    [0, 2, 1],
    [0, 3, 2],
    // top (+z)
    [4, 5, 6],
    [4, 6, 7],
    // front (-y)
    [0, 1, 5],
    [0, 5, 4],
    // right (+x)
    [1, 2, 6],
    [1, 6, 5],
    // back (+y)
    [2, 3, 7],
    [2, 7, 6],
    // left (-x)
    [3, 0, 4],
    [3, 4, 7],
  ];
  TriangleSet::new(positions, indices)
}

/// A sliced object: a stack of square layers around one cube volume, no
/// painting.
pub fn square_object(side: f64, layer_count: usize, strategy: SeamPosition) -> SlicedObject {
  let layer_height = 0.2;
  let layers = (0..layer_count)
    .map(|index| {
      let polygon = square_loop(side);
      SlicedLayer {
        slice_z: (index + 1) as f64 * layer_height,
        height: layer_height,
        perimeter_count: 1,
        islands: vec![Island {
          boundary: ExPolygon {
            contour: polygon.clone(),
            holes: Vec::new(),
          },
          external_perimeters: vec![ExternalPerimeter {
            polygon,
            width: 0.4,
            overhangs: Vec::new(),
          }],
        }],
      }
    })
    .collect();

  SlicedObject {
    transform: DMat4::IDENTITY,
    volumes: vec![ModelVolume {
      kind: VolumeKind::ModelPart,
      mesh: box_mesh(
        Vec3::ZERO,
        Vec3::new(side as f32, side as f32, layer_count as f32 * layer_height as f32),
      ),
      transform: DMat4::IDENTITY,
      seam_enforcers: TriangleSet::default(),
      seam_blockers: TriangleSet::default(),
    }],
    layers,
    strategy,
  }
}
