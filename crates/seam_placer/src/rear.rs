//! Rear seam strategy.
//!
//! Seams go to the back of the perimeter: the qualifying edge closest to a
//! point well behind the bounding box. Within `rear_tolerance` of the box
//! top the pick blends toward the box centerline; an edge falling short of
//! the top by more than the tolerance loses to the highest qualifying
//! vertex.

use glam::DVec2;
use rstar::primitives::{GeomWithData, Line};
use rstar::RTree;

use crate::choice::{
  choose_degenerate_seam_point, choose_seam_point, SeamChoice, SeamPerimeterChoice, SeamPicker,
};
use crate::geometry::{distance_to_segment_squared, BBox2};
use crate::perimeter::{BoundedPerimeter, Perimeter, PointClassification, PointType};

#[derive(Clone, Copy)]
struct PerimeterLine {
  a: DVec2,
  b: DVec2,
  previous_index: usize,
  next_index: usize,
}

fn nearest_on_lines(
  tree: &RTree<GeomWithData<Line<[f64; 2]>, usize>>,
  lines: &[PerimeterLine],
  point: DVec2,
) -> Option<(usize, DVec2)> {
  let found = tree.nearest_neighbor(&[point.x, point.y])?;
  let line = lines[found.data];
  let (foot, _) = distance_to_segment_squared(line.a, line.b, point);
  Some((found.data, foot))
}

/// The rear chooser.
pub struct RearestPointCalculator {
  pub rear_tolerance: f64,
  pub rear_y_offset: f64,
}

impl SeamPicker for RearestPointCalculator {
  fn pick(
    &mut self,
    perimeter: &Perimeter,
    point_type: PointType,
    point_classification: PointClassification,
  ) -> Option<SeamChoice> {
    let positions = &perimeter.positions;

    let mut possible_lines = Vec::new();
    for i in 0..positions.len() - 1 {
      if perimeter.point_types[i] != point_type
        || perimeter.point_classifications[i] != point_classification
        || perimeter.point_types[i + 1] != point_type
        || perimeter.point_classifications[i + 1] != point_classification
      {
        continue;
      }
      possible_lines.push(PerimeterLine {
        a: positions[i],
        b: positions[i + 1],
        previous_index: i,
        next_index: i + 1,
      });
    }
    if possible_lines.is_empty() {
      return None;
    }

    let tree = RTree::bulk_load(
      possible_lines
        .iter()
        .enumerate()
        .map(|(index, line)| {
          GeomWithData::new(Line::new([line.a.x, line.a.y], [line.b.x, line.b.y]), index)
        })
        .collect(),
    );

    let bounding_box = BBox2::from_points(positions.iter().copied());
    let center_x = bounding_box.center().x;
    let prefered_position = DVec2::new(center_x, bounding_box.max.y + self.rear_y_offset);
    let (mut line_index, point) = nearest_on_lines(&tree, &possible_lines, prefered_position)?;
    let location_at_bb = DVec2::new(center_x, bounding_box.max.y);
    let (line_index_at_bb, point_bb) = nearest_on_lines(&tree, &possible_lines, location_at_bb)?;
    let y_distance = point.y - point_bb.y;

    let mut result = point;
    if y_distance < 0.0 {
      result = point_bb;
      line_index = line_index_at_bb;
    } else if y_distance <= self.rear_tolerance {
      let factor = y_distance / self.rear_tolerance;
      result = factor * point + (1.0 - factor) * point_bb;
    }

    let mut previous_index = possible_lines[line_index].previous_index;
    let mut next_index = possible_lines[line_index].next_index;

    if bounding_box.max.y - result.y > self.rear_tolerance {
      for line in &possible_lines {
        if line.a.y > result.y {
          result = line.a;
          previous_index = line.previous_index;
          next_index = line.previous_index;
        }
        if line.b.y > result.y {
          result = line.b;
          previous_index = line.next_index;
          next_index = line.next_index;
        }
      }
    }

    Some(SeamChoice {
      previous_index,
      next_index,
      position: result,
    })
  }
}

/// Choose a rear seam on every perimeter of every layer.
pub fn get_object_seams(
  perimeters: Vec<Vec<BoundedPerimeter>>,
  rear_tolerance: f64,
  rear_y_offset: f64,
) -> Vec<Vec<SeamPerimeterChoice>> {
  let mut result = Vec::with_capacity(perimeters.len());

  for layer in perimeters {
    let mut layer_seams = Vec::with_capacity(layer.len());
    for bounded_perimeter in layer {
      let perimeter = bounded_perimeter.perimeter;
      let choice = if perimeter.is_degenerate {
        choose_degenerate_seam_point(&perimeter).unwrap_or_default()
      } else {
        let mut calculator = RearestPointCalculator {
          rear_tolerance,
          rear_y_offset,
        };
        choose_seam_point(&perimeter, &mut calculator)
      };
      layer_seams.push(SeamPerimeterChoice::new(choice, perimeter));
    }
    result.push(layer_seams);
  }

  result
}

#[cfg(test)]
#[path = "rear_test.rs"]
mod rear_test;
