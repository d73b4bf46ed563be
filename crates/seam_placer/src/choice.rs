//! Seam choice and the chooser dispatch.
//!
//! Points on a perimeter fall into 3x3 = 9 categories (painted type x
//! classification), searched in a fixed priority order. An enforced
//! overhanging point always beats a common embedded point, and so on. The
//! first category a picker succeeds on wins.

use glam::DVec2;

use crate::geometry::BBox2;
use crate::perimeter::{extract_points, Perimeter, PointClassification, PointType};

/// A chosen seam location on a perimeter.
///
/// When `previous_index == next_index` the seam sits exactly on that
/// vertex; otherwise it lies on the edge between the two consecutive
/// vertices.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SeamChoice {
  pub previous_index: usize,
  pub next_index: usize,
  pub position: DVec2,
}

impl SeamChoice {
  pub fn at_vertex(index: usize, position: DVec2) -> Self {
    Self {
      previous_index: index,
      next_index: index,
      position,
    }
  }

  pub fn is_at_vertex(&self) -> bool {
    self.previous_index == self.next_index
  }
}

/// A seam choice bundled with the perimeter it was made on.
pub struct SeamPerimeterChoice {
  pub choice: SeamChoice,
  pub perimeter: Perimeter,
  pub bounding_box: BBox2,
}

impl SeamPerimeterChoice {
  pub fn new(choice: SeamChoice, perimeter: Perimeter) -> Self {
    let bounding_box = BBox2::from_points(perimeter.positions.iter().copied());
    Self {
      choice,
      perimeter,
      bounding_box,
    }
  }
}

/// A seam-picking policy: given a category, propose a point or decline.
pub trait SeamPicker {
  fn pick(
    &mut self,
    perimeter: &Perimeter,
    point_type: PointType,
    point_classification: PointClassification,
  ) -> Option<SeamChoice>;
}

const TYPE_SEARCH_ORDER: [PointType; 3] =
  [PointType::Enforcer, PointType::Common, PointType::Blocker];
const CLASSIFICATION_SEARCH_ORDER: [PointClassification; 3] = [
  PointClassification::Embedded,
  PointClassification::Common,
  PointClassification::Overhang,
];

/// Search the categories in priority order.
///
/// A point type that has points but yields no pick under any classification
/// ends the search with no choice: a painted region must not silently
/// degrade to a weaker type.
pub fn maybe_choose_seam_point(
  perimeter: &Perimeter,
  seam_picker: &mut impl SeamPicker,
) -> Option<SeamChoice> {
  for point_type in TYPE_SEARCH_ORDER {
    for point_classification in CLASSIFICATION_SEARCH_ORDER {
      if let Some(seam_choice) = seam_picker.pick(perimeter, point_type, point_classification) {
        return Some(seam_choice);
      }
    }
    if !extract_points(perimeter, point_type).is_empty() {
      return None;
    }
  }
  None
}

/// Like [`maybe_choose_seam_point`], falling back to the perimeter's first
/// vertex when nothing reasonable could be picked.
pub fn choose_seam_point(perimeter: &Perimeter, seam_picker: &mut impl SeamPicker) -> SeamChoice {
  if let Some(seam_choice) = maybe_choose_seam_point(perimeter, seam_picker) {
    return seam_choice;
  }

  // Failed to choose any reasonable point!
  match perimeter.positions.first() {
    Some(position) => SeamChoice::at_vertex(0, *position),
    None => SeamChoice::default(),
  }
}

/// Degenerate perimeters always seam at their first point, if they have
/// one.
pub fn choose_degenerate_seam_point(perimeter: &Perimeter) -> Option<SeamChoice> {
  perimeter
    .positions
    .first()
    .map(|position| SeamChoice::at_vertex(0, *position))
}

#[cfg(test)]
#[path = "choice_test.rs"]
mod choice_test;
