//! Seam placement façade.
//!
//! `Placer::init` does all the heavy lifting per object: painting lookup,
//! perimeter construction and, for every strategy except nearest, the full
//! seam precomputation. `place_seam` then answers per-loop queries by
//! projecting the chosen seam onto the actual extrusion loop, optionally
//! staggering inner perimeter seams away from the outer one.

use glam::DVec2;
use tracing::debug;

use crate::aligned::{self, Nearest, VisibilityCalculator};
use crate::cancel::{ensure_not_cancelled, CancelCallback, Cancelled};
use crate::choice::{
  choose_seam_point, maybe_choose_seam_point, SeamChoice, SeamPerimeterChoice, SeamPicker,
};
use crate::distancer::LineDistancer;
use crate::geometry::{
  convert_to_geometry, edge_normal, pick_closest_bounding_box, polyline_normal,
  project_to_boundary, visit_forward, BBox2, BoundedPolygon,
};
use crate::painting::Painting;
use crate::params::{Params, SeamPosition};
use crate::perimeter::{
  self, create_perimeters, AngleType, BoundedPerimeter, Perimeter, PointClassification, PointType,
};
use crate::random;
use crate::rear;
use crate::shells::create_shells;
use crate::types::{get_extrusions, ExtrusionLoop, LoopRole, SlicedObject};
use crate::visibility::Visibility;

/// Arm length for the vertex normal used when projecting a seam inward.
const PROJECTION_NORMAL_ARM_LENGTH: f64 = 0.1;

/// Picks the non-smooth qualifying vertex closest to a preferred position.
/// Used by the nearest strategy before falling back to edge feet.
struct NearestCorner {
  prefered_position: DVec2,
}

impl SeamPicker for NearestCorner {
  fn pick(
    &mut self,
    perimeter: &Perimeter,
    point_type: PointType,
    point_classification: PointClassification,
  ) -> Option<SeamChoice> {
    let mut corner_candidate: Option<SeamChoice> = None;
    let mut min_distance = f64::INFINITY;
    for index in 0..perimeter.positions.len() {
      if perimeter.point_types[index] == point_type
        && perimeter.point_classifications[index] == point_classification
        && perimeter.angle_types[index] != AngleType::Smooth
      {
        let point = perimeter.positions[index];
        let distance = (self.prefered_position - point).length();
        if corner_candidate.is_none() || distance < min_distance {
          corner_candidate = Some(SeamChoice::at_vertex(index, point));
          min_distance = distance;
        }
      }
    }
    corner_candidate
  }
}

fn choose_closest_seam<'a>(
  seams: &'a [SeamPerimeterChoice],
  loop_polygon: &[DVec2],
) -> Option<&'a SeamPerimeterChoice> {
  let choose_from: Vec<BBox2> = seams.iter().map(|choice| choice.bounding_box).collect();
  let loop_bounding_box = BBox2::from_points(loop_polygon.iter().copied());
  let (choice_index, _) = pick_closest_bounding_box(&loop_bounding_box, &choose_from)?;
  Some(&seams[choice_index])
}

/// Shoot from the chosen perimeter point inward and land on the extrusion
/// loop. Returns the loop line hit and the foot point on it.
fn project_to_extrusion_loop(
  seam_choice: &SeamChoice,
  perimeter: &Perimeter,
  loop_distancer: &LineDistancer,
) -> Option<(usize, DVec2)> {
  let edge =
    perimeter.positions[seam_choice.next_index] - perimeter.positions[seam_choice.previous_index];
  let normal = if seam_choice.is_at_vertex() {
    polyline_normal(
      &perimeter.positions,
      seam_choice.previous_index,
      PROJECTION_NORMAL_ARM_LENGTH,
    )
  } else {
    edge_normal(edge)
  };

  let depth = loop_distancer.distance(seam_choice.position);
  let final_position = seam_choice.position - normal * depth;

  loop_distancer
    .nearest(final_position)
    .map(|(loop_line_index, loop_point, _)| (loop_line_index, loop_point))
}

fn offset_along_loop_lines(
  point: DVec2,
  loop_line_index: usize,
  loop_distancer: &LineDistancer,
  offset: f64,
) -> Option<DVec2> {
  let mut distance = 0.0;
  let mut previous_point = point;
  let mut offset_point = None;
  visit_forward(loop_line_index, loop_distancer.line_count(), |index| {
    let next_point = loop_distancer.line(index).1;
    let edge = next_point - previous_point;

    if distance + edge.length() > offset {
      let remaining_distance = offset - distance;
      offset_point = Some(previous_point + remaining_distance * edge.normalize_or_zero());
      return true;
    }

    distance += edge.length();
    previous_point = next_point;
    false
  });
  offset_point
}

fn get_angle(seam_choice: &SeamChoice, perimeter: &Perimeter) -> f64 {
  if seam_choice.is_at_vertex() {
    perimeter.angles[seam_choice.previous_index]
  } else {
    0.0
  }
}

/// Land the chosen seam on the physical extrusion loop.
pub fn finalize_seam_position(
  loop_polygon: &[DVec2],
  seam_choice: &SeamChoice,
  perimeter: &Perimeter,
  loop_width: f64,
  do_staggering: bool,
) -> DVec2 {
  let loop_loops = [loop_polygon.to_vec()];
  let loop_distancer = LineDistancer::new(&loop_loops);
  let Some((loop_line_index, loop_point)) =
    project_to_extrusion_loop(seam_choice, perimeter, &loop_distancer)
  else {
    return seam_choice.position;
  };

  if do_staggering {
    let depth = (loop_point - seam_choice.position).length() - loop_width / 2.0;
    let angle = get_angle(seam_choice, perimeter);
    let initial_offset = if angle > 0.0 { angle / 2.0 * depth } else { 0.0 };
    let additional_offset = if angle < 0.0 {
      (angle / 2.0).cos() * depth
    } else {
      depth
    };
    let staggering_offset = initial_offset + additional_offset;

    if let Some(staggered_point) = offset_along_loop_lines(
      loop_point,
      loop_line_index,
      &loop_distancer,
      staggering_offset,
    ) {
      return staggered_point;
    }
  }

  loop_point
}

fn place_seam_near(
  layer_perimeters: &[BoundedPerimeter],
  loop_polygon: &[DVec2],
  position: DVec2,
  max_detour: f64,
) -> Option<(SeamChoice, usize)> {
  let choose_from: Vec<BBox2> = layer_perimeters
    .iter()
    .map(|bounded_perimeter| bounded_perimeter.bounding_box)
    .collect();
  let loop_bounding_box = BBox2::from_points(loop_polygon.iter().copied());
  let (choice_index, _) = pick_closest_bounding_box(&loop_bounding_box, &choose_from)?;
  let perimeter = &layer_perimeters[choice_index].perimeter;

  let mut nearest_corner = NearestCorner {
    prefered_position: position,
  };
  if let Some(corner_choice) = maybe_choose_seam_point(perimeter, &mut nearest_corner) {
    return Some((corner_choice, choice_index));
  }

  let mut nearest = Nearest {
    prefered_position: position,
    max_detour,
  };
  Some((choose_seam_point(perimeter, &mut nearest), choice_index))
}

enum ObjectSeamData {
  /// Per-layer seams computed at init.
  Precalculated(Vec<Vec<SeamPerimeterChoice>>),

  /// Per-layer perimeters kept for query-time nearest placement.
  Deferred(Vec<Vec<BoundedPerimeter>>),
}

struct ObjectSeams {
  perimeter_counts: Vec<usize>,
  data: ObjectSeamData,
}

/// The seam placement façade. Build once with [`Placer::init`], then query
/// freely; a fully initialized placer only reads.
pub struct Placer {
  params: Params,
  objects: Vec<ObjectSeams>,
}

impl Placer {
  pub fn init(
    objects: &[SlicedObject],
    params: Params,
    cancel: &CancelCallback,
  ) -> Result<Self, Cancelled> {
    debug!("seam placer init: start");

    let mut object_seams = Vec::with_capacity(objects.len());
    for object in objects {
      let painting = Painting::new(&object.transform, &object.volumes);
      ensure_not_cancelled(cancel)?;

      let extrusions = get_extrusions(&object.layers);
      let layer_infos =
        perimeter::layer_infos(&object.layers, params.perimeter.elephant_foot_compensation);
      let projected: Vec<Vec<BoundedPolygon>> = extrusions
        .iter()
        .map(|layer| match object.strategy {
          SeamPosition::Random => convert_to_geometry(layer),
          _ => project_to_boundary(layer, params.max_distance),
        })
        .collect();
      let perimeters = create_perimeters(&projected, &layer_infos, &painting, &params.perimeter);
      ensure_not_cancelled(cancel)?;

      let data = match object.strategy {
        SeamPosition::Nearest => ObjectSeamData::Deferred(perimeters),
        SeamPosition::Aligned => {
          let visibility =
            Visibility::new(&object.transform, &object.volumes, &params.visibility, cancel)?;
          let visibility_calculator = VisibilityCalculator {
            points_visibility: &visibility,
            convex_visibility_modifier: params.convex_visibility_modifier,
            concave_visibility_modifier: params.concave_visibility_modifier,
          };
          let shells = create_shells(perimeters, params.max_distance);
          ensure_not_cancelled(cancel)?;
          ObjectSeamData::Precalculated(aligned::get_object_seams(
            shells,
            &visibility_calculator,
            &params.aligned,
          ))
        }
        SeamPosition::Rear => ObjectSeamData::Precalculated(rear::get_object_seams(
          perimeters,
          params.rear_tolerance,
          params.rear_y_offset,
        )),
        SeamPosition::Random => ObjectSeamData::Precalculated(random::get_object_seams(
          perimeters,
          params.random_seed,
        )),
      };
      ensure_not_cancelled(cancel)?;

      object_seams.push(ObjectSeams {
        perimeter_counts: object.layers.iter().map(|layer| layer.perimeter_count).collect(),
        data,
      });
    }

    debug!("seam placer init: end");
    Ok(Self {
      params,
      objects: object_seams,
    })
  }

  /// The start-of-loop point for one extrusion loop, in the layer frame.
  pub fn place_seam(
    &self,
    object_index: usize,
    layer_index: usize,
    extrusion_loop: &ExtrusionLoop,
    last_pos: DVec2,
  ) -> DVec2 {
    let object = &self.objects[object_index];
    let loop_polygon = &extrusion_loop.polygon;
    let fallback = loop_polygon.first().copied().unwrap_or(last_pos);

    let do_staggering =
      self.params.staggered_inner_seams && extrusion_loop.role == LoopRole::InnerPerimeter;
    let loop_width = extrusion_loop.width;

    match &object.data {
      ObjectSeamData::Deferred(perimeters) => {
        let Some(layer_perimeters) = perimeters.get(layer_index) else {
          return fallback;
        };
        let Some((seam_choice, perimeter_index)) = place_seam_near(
          layer_perimeters,
          loop_polygon,
          last_pos,
          self.params.max_nearest_detour,
        ) else {
          return fallback;
        };
        finalize_seam_position(
          loop_polygon,
          &seam_choice,
          &layer_perimeters[perimeter_index].perimeter,
          loop_width,
          do_staggering,
        )
      }
      ObjectSeamData::Precalculated(seams) => {
        let Some(seams_on_perimeters) = seams.get(layer_index) else {
          return fallback;
        };

        // With two or three perimeters total and exactly one hole among the
        // externals, put the visible seam on the contour rather than inside
        // the pocket.
        let perimeter_count = object.perimeter_counts.get(layer_index).copied().unwrap_or(0);
        let has_2_or_3_perimeters = perimeter_count == 2 || perimeter_count == 3;
        if has_2_or_3_perimeters
          && seams_on_perimeters.len() == 2
          && seams_on_perimeters[0].perimeter.is_hole != seams_on_perimeters[1].perimeter.is_hole
        {
          let seam_perimeter_choice = if seams_on_perimeters[0].perimeter.is_hole {
            &seams_on_perimeters[1]
          } else {
            &seams_on_perimeters[0]
          };
          return finalize_seam_position(
            loop_polygon,
            &seam_perimeter_choice.choice,
            &seam_perimeter_choice.perimeter,
            loop_width,
            do_staggering,
          );
        }

        let Some(seam_perimeter_choice) = choose_closest_seam(seams_on_perimeters, loop_polygon)
        else {
          return fallback;
        };
        finalize_seam_position(
          loop_polygon,
          &seam_perimeter_choice.choice,
          &seam_perimeter_choice.perimeter,
          loop_width,
          do_staggering,
        )
      }
    }
  }
}

#[cfg(test)]
#[path = "placer_test.rs"]
mod placer_test;
