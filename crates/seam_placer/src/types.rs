//! Input data model.
//!
//! The crate is a library consumed by a slicer pipeline: it receives sliced
//! objects (triangle meshes with painted facets plus per-layer islands and
//! external perimeter loops) and hands back one seam point per extrusion
//! loop. Everything here is millimeters in the layer coordinate frame.

use glam::{DMat4, DVec2};

use crate::geometry::BBox2;
use crate::mesh::TriangleSet;
use crate::params::SeamPosition;

/// What a model volume contributes to the printed object.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VolumeKind {
  /// Solid printed geometry.
  ModelPart,

  /// Carved-out geometry. Participates in visibility as void space.
  NegativeVolume,

  /// Anything else (modifiers, support volumes). Ignored by this crate
  /// except for its painted facets.
  Other,
}

/// One mesh of the source model, with its painted seam regions.
#[derive(Clone, Debug)]
pub struct ModelVolume {
  pub kind: VolumeKind,
  pub mesh: TriangleSet,

  /// Volume-local transform, applied before the object transform.
  pub transform: DMat4,

  /// Facets painted as seam enforcers, in volume-local coordinates.
  pub seam_enforcers: TriangleSet,

  /// Facets painted as seam blockers, in volume-local coordinates.
  pub seam_blockers: TriangleSet,
}

/// Island boundary: one contour and any number of holes. Loops do not
/// repeat their first point.
#[derive(Clone, Debug, Default)]
pub struct ExPolygon {
  pub contour: Vec<DVec2>,
  pub holes: Vec<Vec<DVec2>>,
}

impl ExPolygon {
  /// All loops of the boundary, contour first.
  pub fn loops(&self) -> impl Iterator<Item = &Vec<DVec2>> {
    std::iter::once(&self.contour).chain(self.holes.iter())
  }
}

/// Overhang region the slicer attributed to an external perimeter.
#[derive(Clone, Debug)]
pub enum OverhangRegion {
  /// An open arc of the loop hangs over the previous layer.
  Arc { start: DVec2, end: DVec2 },

  /// The whole loop floats over the previous layer.
  FullLoop,
}

/// One external perimeter loop of an island.
#[derive(Clone, Debug)]
pub struct ExternalPerimeter {
  /// Closed loop; the first point is not repeated at the end.
  pub polygon: Vec<DVec2>,

  /// Extrusion width of the external perimeter flow.
  pub width: f64,

  pub overhangs: Vec<OverhangRegion>,
}

/// A maximal connected group of perimeters sharing one boundary.
#[derive(Clone, Debug)]
pub struct Island {
  pub boundary: ExPolygon,
  pub external_perimeters: Vec<ExternalPerimeter>,
}

/// One sliced layer of an object.
#[derive(Clone, Debug)]
pub struct SlicedLayer {
  /// Height of the slicing plane.
  pub slice_z: f64,

  /// Layer height above the previous layer.
  pub height: f64,

  /// Total number of perimeter loops printed on this layer, inner ones
  /// included. Drives the hole-vs-contour seam heuristic.
  pub perimeter_count: usize,

  pub islands: Vec<Island>,
}

/// A sliced object ready for seam placement.
#[derive(Clone, Debug)]
pub struct SlicedObject {
  /// Centered object transform, applied after each volume transform.
  pub transform: DMat4,

  pub volumes: Vec<ModelVolume>,

  /// Layers in print order; `layers[i - 1]` is below `layers[i]`.
  pub layers: Vec<SlicedLayer>,

  pub strategy: SeamPosition,
}

/// Role of the loop the seam is queried for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopRole {
  ExternalPerimeter,

  /// Inner perimeter; eligible for seam staggering.
  InnerPerimeter,
}

/// The extrusion loop a seam is queried for at G-code export time.
#[derive(Clone, Debug)]
pub struct ExtrusionLoop {
  /// Closed loop; the first point is not repeated at the end.
  pub polygon: Vec<DVec2>,
  pub width: f64,
  pub role: LoopRole,
}

/// An external perimeter extrusion, bundled with the island boundary it
/// belongs to.
#[derive(Clone, Debug)]
pub struct Extrusion<'a> {
  pub polygon: Vec<DVec2>,
  pub bounding_box: BBox2,
  pub width: f64,
  pub island_boundary: &'a ExPolygon,

  /// Bounding box of the contour first, then of each hole in order.
  pub island_boundary_bounding_boxes: Vec<BBox2>,
  pub overhangs: Vec<OverhangRegion>,
}

impl<'a> Extrusion<'a> {
  pub fn new(
    polygon: Vec<DVec2>,
    width: f64,
    island_boundary: &'a ExPolygon,
    overhangs: Vec<OverhangRegion>,
  ) -> Self {
    let bounding_box = BBox2::from_points(polygon.iter().copied());
    let island_boundary_bounding_boxes = island_boundary
      .loops()
      .map(|boundary_loop| BBox2::from_points(boundary_loop.iter().copied()))
      .collect();
    Self {
      polygon,
      bounding_box,
      width,
      island_boundary,
      island_boundary_bounding_boxes,
      overhangs,
    }
  }
}

/// Gather external perimeter extrusions per layer.
pub fn get_extrusions(layers: &[SlicedLayer]) -> Vec<Vec<Extrusion<'_>>> {
  layers
    .iter()
    .map(|layer| {
      let mut extrusions = Vec::new();
      for island in &layer.islands {
        for external_perimeter in &island.external_perimeters {
          extrusions.push(Extrusion::new(
            external_perimeter.polygon.clone(),
            external_perimeter.width,
            &island.boundary,
            external_perimeter.overhangs.clone(),
          ));
        }
      }
      extrusions
    })
    .collect()
}
