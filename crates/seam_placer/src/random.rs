//! Random seam strategy.
//!
//! Collects the maximal contiguous arclength segments of the qualifying
//! category, samples a segment proportionally to its length and a point
//! uniformly within it. One seeded generator drives the whole object, so a
//! fixed seed reproduces the seams exactly.

use glam::DVec2;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::choice::{
  choose_degenerate_seam_point, choose_seam_point, SeamChoice, SeamPerimeterChoice, SeamPicker,
};
use crate::perimeter::{BoundedPerimeter, Perimeter, PointClassification, PointType};

/// A contiguous run of qualifying points, in arclength coordinates along
/// the perimeter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct PerimeterSegment {
  pub begin: f64,
  pub end: f64,
  pub begin_index: usize,
}

impl PerimeterSegment {
  fn length(&self) -> f64 {
    self.end - self.begin
  }
}

pub(crate) fn get_segments(
  perimeter: &Perimeter,
  point_type: PointType,
  point_classification: PointClassification,
) -> Vec<PerimeterSegment> {
  let positions = &perimeter.positions;

  let mut current_begin: Option<f64> = None;
  let mut current_begin_index: Option<usize> = None;
  let mut previous_position = positions[0];
  let mut distance = 0.0;
  let mut result = Vec::new();

  for i in 0..=positions.len() {
    let index = if i == positions.len() { 0 } else { i };
    let previous_distance = distance;
    distance += (positions[index] - previous_position).length();
    previous_position = positions[index];

    if perimeter.point_types[index] == point_type
      && perimeter.point_classifications[index] == point_classification
    {
      if current_begin.is_none() {
        current_begin = Some(distance);
        current_begin_index = Some(index);
      }
    } else {
      if let (Some(begin), Some(begin_index)) = (current_begin, current_begin_index) {
        result.push(PerimeterSegment {
          begin,
          end: previous_distance,
          begin_index,
        });
      }
      current_begin = None;
      current_begin_index = None;
    }
  }

  if let (Some(begin), Some(begin_index)) = (current_begin, current_begin_index) {
    result.push(PerimeterSegment {
      begin,
      end: distance,
      begin_index,
    });
  }
  result
}

fn pick_random_segment(
  segments: &[PerimeterSegment],
  random_engine: &mut ChaCha8Rng,
) -> PerimeterSegment {
  let total_length: f64 = segments.iter().map(PerimeterSegment::length).sum();
  let random_distance = random_engine.random_range(0.0..=total_length);

  let mut distance = 0.0;
  for segment in segments {
    if random_distance >= distance && random_distance <= distance + segment.length() {
      return *segment;
    }
    distance += segment.length();
  }
  segments[segments.len() - 1]
}

fn pick_random_point(
  segment: &PerimeterSegment,
  perimeter: &Perimeter,
  random_engine: &mut ChaCha8Rng,
) -> SeamChoice {
  let positions = &perimeter.positions;

  if segment.length() < f64::EPSILON {
    return SeamChoice::at_vertex(segment.begin_index, positions[segment.begin_index]);
  }

  let random_distance = random_engine.random_range(0.0..=segment.length());

  let mut distance = 0.0;
  let mut previous_index = segment.begin_index;
  for i in segment.begin_index + 1..=positions.len() {
    let index = if i == positions.len() { 0 } else { i };
    let edge = positions[index] - positions[previous_index];

    if distance + edge.length() >= random_distance {
      let mut current_index = index;
      if random_distance - distance < f64::EPSILON {
        current_index = previous_index;
      } else if distance + edge.length() - random_distance < f64::EPSILON {
        previous_index = index;
      }

      let remaining_distance = random_distance - distance;
      let position = positions[previous_index] + remaining_distance * edge.normalize_or_zero();
      return SeamChoice {
        previous_index,
        next_index: current_index,
        position,
      };
    }

    distance += edge.length();
    previous_index = index;
  }

  // Should be unreachable.
  SeamChoice::at_vertex(segment.begin_index, positions[segment.begin_index])
}

/// The random chooser. Holds the object's generator.
pub struct Random {
  random_engine: ChaCha8Rng,
}

impl Random {
  pub fn new(random_engine: ChaCha8Rng) -> Self {
    Self { random_engine }
  }
}

impl SeamPicker for Random {
  fn pick(
    &mut self,
    perimeter: &Perimeter,
    point_type: PointType,
    point_classification: PointClassification,
  ) -> Option<SeamChoice> {
    let segments = get_segments(perimeter, point_type, point_classification);

    if segments.is_empty() {
      return None;
    }
    let segment = pick_random_segment(&segments, &mut self.random_engine);
    Some(pick_random_point(&segment, perimeter, &mut self.random_engine))
  }
}

/// Choose a random seam on every perimeter of every layer.
pub fn get_object_seams(
  perimeters: Vec<Vec<BoundedPerimeter>>,
  fixed_seed: u64,
) -> Vec<Vec<SeamPerimeterChoice>> {
  use rand::SeedableRng;
  let mut random = Random::new(ChaCha8Rng::seed_from_u64(fixed_seed));

  let mut result = Vec::with_capacity(perimeters.len());
  for layer in perimeters {
    let mut layer_seams = Vec::with_capacity(layer.len());
    for bounded_perimeter in layer {
      let perimeter = bounded_perimeter.perimeter;
      let choice = if perimeter.is_degenerate {
        choose_degenerate_seam_point(&perimeter).unwrap_or_default()
      } else {
        choose_seam_point(&perimeter, &mut random)
      };
      layer_seams.push(SeamPerimeterChoice::new(choice, perimeter));
    }
    result.push(layer_seams);
  }
  result
}

#[cfg(test)]
#[path = "random_test.rs"]
mod random_test;
