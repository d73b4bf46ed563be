//! The aligned seam optimizer.
//!
//! Works per shell: precomputes the visibility of every perimeter vertex,
//! finds the least visible anchor of every slice, then traces one candidate
//! chain per starting position with the nearest picker, jumping to the
//! anchor when the chain drifts too far or gets too exposed. The cheapest
//! chain wins; a bonus rewards chains that continue the previous layer's
//! seam.

use glam::DVec2;
use rstar::primitives::GeomWithData;

use crate::choice::{
  choose_degenerate_seam_point, choose_seam_point, SeamChoice, SeamPerimeterChoice, SeamPicker,
};
use crate::geometry::{distance_to_segment_squared, map_nested_parallel, to_3d};
use crate::params::AlignedParams;
use crate::perimeter::{
  extract_points, point_value, AngleType, OptionalPointTree, Perimeter, PointClassification,
  PointTree, PointTrees, PointType,
};
use crate::shells::{layer_count, Shell, Shells};
use crate::visibility::Visibility;

/// Visibility of a seam choice on a perimeter. Lower is better.
pub trait ChoiceVisibility: Sync {
  fn evaluate(&self, choice: &SeamChoice, perimeter: &Perimeter) -> f64;
}

/// Combines the raycast visibility field with a corner preference: sharp
/// corners hide the seam, so they lower the effective visibility.
pub struct VisibilityCalculator<'a> {
  pub points_visibility: &'a Visibility,
  pub convex_visibility_modifier: f64,
  pub concave_visibility_modifier: f64,
}

impl VisibilityCalculator<'_> {
  /// Smooth weight in `[-weight_max, 0]`: at angle 0 the slope equals the
  /// linear weight, at a right angle the slope is 0 and the value is the
  /// full weight.
  fn angle_visibility_modifier(
    angle: f64,
    convex_visibility_modifier: f64,
    concave_visibility_modifier: f64,
  ) -> f64 {
    let weight_max = if angle > 0.0 {
      convex_visibility_modifier
    } else {
      concave_visibility_modifier
    };
    let angle = angle.abs();
    let right_angle = std::f64::consts::FRAC_PI_2;
    if angle > right_angle {
      return -weight_max;
    }
    let angle_linear_weight = angle / right_angle;
    let angle_smooth_weight =
      angle / right_angle * weight_max + (right_angle - angle) / right_angle * angle_linear_weight;
    -angle_smooth_weight
  }
}

impl ChoiceVisibility for VisibilityCalculator<'_> {
  fn evaluate(&self, choice: &SeamChoice, perimeter: &Perimeter) -> f64 {
    let mut visibility = self
      .points_visibility
      .point_visibility(to_3d(choice.position, perimeter.slice_z)) as f64;

    let angle = if choice.is_at_vertex() {
      perimeter.angles[choice.previous_index]
    } else {
      0.0
    };
    visibility += Self::angle_visibility_modifier(
      angle,
      self.convex_visibility_modifier,
      self.concave_visibility_modifier,
    );
    visibility
  }
}

pub(crate) fn pick_trees(perimeter: &Perimeter, point_type: PointType) -> &PointTrees {
  match point_type {
    PointType::Enforcer => &perimeter.enforced_points,
    PointType::Blocker => &perimeter.blocked_points,
    PointType::Common => &perimeter.common_points,
  }
}

pub(crate) fn pick_tree(
  point_trees: &PointTrees,
  point_classification: PointClassification,
) -> &OptionalPointTree {
  match point_classification {
    PointClassification::Overhang => &point_trees.overhanging_points,
    PointClassification::Embedded => &point_trees.embedded_points,
    PointClassification::Common => &point_trees.common_points,
  }
}

/// Ingredients of a nearest pick: the closest qualifying vertex, the better
/// of its two adjacent edges, a possible corner snap and the foot point on
/// the edge.
#[derive(Clone, Debug)]
pub struct SeamOptions {
  pub closest: usize,
  pub adjacent: usize,
  pub adjacent_forward: bool,
  pub snapped: Option<usize>,
  pub on_edge: DVec2,
}

fn scan_for_angle(
  perimeter: &Perimeter,
  point: DVec2,
  search_start: usize,
  max_detour: f64,
  angle_type: AngleType,
  matched: &mut Option<usize>,
  min_distance: &mut f64,
) {
  let positions = &perimeter.positions;
  let mut visitor = |index: usize| -> bool {
    let distance = (positions[index] - point).length();
    if distance > max_detour {
      return true;
    }
    if perimeter.angle_types[index] == angle_type && distance < *min_distance {
      *matched = Some(index);
      *min_distance = distance;
      return true;
    }
    false
  };
  crate::geometry::visit_backward(search_start, positions.len(), &mut visitor);
  crate::geometry::visit_forward(search_start, positions.len(), &mut visitor);
}

/// Snap onto a nearby convex vertex, falling back to concave, within
/// `max_detour` of `point`.
pub fn snap_to_angle(
  point: DVec2,
  search_start: usize,
  perimeter: &Perimeter,
  max_detour: f64,
) -> Option<usize> {
  let mut matched = None;
  let mut min_distance = f64::INFINITY;
  scan_for_angle(
    perimeter,
    point,
    search_start,
    max_detour,
    AngleType::Convex,
    &mut matched,
    &mut min_distance,
  );
  if matched.is_some() {
    return matched;
  }

  let mut min_distance = f64::INFINITY;
  scan_for_angle(
    perimeter,
    point,
    search_start,
    max_detour,
    AngleType::Concave,
    &mut matched,
    &mut min_distance,
  );
  matched
}

pub fn get_seam_options(
  perimeter: &Perimeter,
  prefered_position: DVec2,
  points_tree: &PointTree,
  max_detour: f64,
) -> Option<SeamOptions> {
  let positions = &perimeter.positions;

  let closest = points_tree
    .nearest_neighbor(&[prefered_position.x, prefered_position.y])?
    .data;
  let previous = if closest == 0 {
    positions.len() - 1
  } else {
    closest - 1
  };
  let next = if closest == positions.len() - 1 {
    0
  } else {
    closest + 1
  };

  let (previous_point, previous_distance) =
    distance_to_segment_squared(positions[previous], positions[closest], prefered_position);
  let (next_point, next_distance) =
    distance_to_segment_squared(positions[closest], positions[next], prefered_position);

  let adjacent_forward = next_distance < previous_distance;
  let nearest_point = if adjacent_forward {
    next_point
  } else {
    previous_point
  };
  let adjacent = if adjacent_forward { next } else { previous };

  let snapped = snap_to_angle(nearest_point, closest, perimeter, max_detour);

  Some(SeamOptions {
    closest,
    adjacent,
    adjacent_forward,
    snapped,
    on_edge: nearest_point,
  })
}

/// Arbitrate between the nearest foot point and the snapped corner by
/// category priority.
pub fn pick_seam_option(perimeter: &Perimeter, options: &SeamOptions) -> SeamChoice {
  let types = &perimeter.point_types;
  let classifications = &perimeter.point_classifications;
  let positions = &perimeter.positions;

  let closest_point_value = point_value(types[options.closest], classifications[options.closest]);

  if let Some(snapped) = options.snapped {
    let snapped_point_value = point_value(types[snapped], classifications[snapped]);
    if snapped_point_value >= closest_point_value {
      return SeamChoice::at_vertex(snapped, positions[snapped]);
    }
  }

  let adjacent_point_value =
    point_value(types[options.adjacent], classifications[options.adjacent]);
  if adjacent_point_value < closest_point_value {
    return SeamChoice::at_vertex(options.closest, positions[options.closest]);
  }

  let next_index = if options.adjacent_forward {
    options.adjacent
  } else {
    options.closest
  };
  let previous_index = if options.adjacent_forward {
    options.closest
  } else {
    options.adjacent
  };
  SeamChoice {
    previous_index,
    next_index,
    position: options.on_edge,
  }
}

/// Picks the qualifying point closest to a preferred position, snapping to
/// nearby corners when that does not lose category priority.
pub struct Nearest {
  pub prefered_position: DVec2,
  pub max_detour: f64,
}

impl SeamPicker for Nearest {
  fn pick(
    &mut self,
    perimeter: &Perimeter,
    point_type: PointType,
    point_classification: PointClassification,
  ) -> Option<SeamChoice> {
    let trees = pick_trees(perimeter, point_type);
    let tree = pick_tree(trees, point_classification).as_ref()?;
    let options = get_seam_options(perimeter, self.prefered_position, tree, self.max_detour)?;
    Some(pick_seam_option(perimeter, &options))
  }
}

/// Picks the qualifying vertex with the lowest precomputed visibility.
pub struct LeastVisible<'a> {
  pub precalculated_visibility: &'a [f64],
}

impl SeamPicker for LeastVisible<'_> {
  fn pick(
    &mut self,
    perimeter: &Perimeter,
    point_type: PointType,
    point_classification: PointClassification,
  ) -> Option<SeamChoice> {
    let mut chosen_index = None;
    let mut visibility = f64::INFINITY;

    for index in 0..perimeter.positions.len() {
      if perimeter.point_types[index] != point_type
        || perimeter.point_classifications[index] != point_classification
      {
        continue;
      }
      let point_visibility = self.precalculated_visibility[index];
      if point_visibility < visibility {
        visibility = point_visibility;
        chosen_index = Some(index);
      }
    }

    chosen_index.map(|index| SeamChoice::at_vertex(index, perimeter.positions[index]))
  }
}

/// Where candidate chains may start: enforcers of the first slice if any,
/// else commons, else every vertex.
fn get_starting_positions(shell: &Shell) -> Vec<DVec2> {
  let perimeter = &shell[0].boundary;

  let enforcers = extract_points(perimeter, PointType::Enforcer);
  if !enforcers.is_empty() {
    return enforcers;
  }
  let common = extract_points(perimeter, PointType::Common);
  if !common.is_empty() {
    return common;
  }
  perimeter.positions.clone()
}

#[derive(Clone, Copy, Default)]
struct LeastVisiblePoint {
  choice: SeamChoice,
  visibility: f64,
}

struct SeamCandidate {
  choices: Vec<SeamChoice>,
  visibilities: Vec<f64>,
}

/// Trace one candidate chain through the shell.
fn get_seam_candidate(
  shell: &Shell,
  starting_position: DVec2,
  visibility_calculator: &impl ChoiceVisibility,
  params: &AlignedParams,
  precalculated_visibility: &[Vec<f64>],
  least_visible_points: &[LeastVisiblePoint],
) -> SeamCandidate {
  let mut choice_visibilities = vec![1.0; shell.len()];
  let mut choices = Vec::with_capacity(shell.len());
  let mut previous_position = starting_position;

  for (slice_index, slice) in shell.iter().enumerate() {
    let perimeter = &slice.boundary;
    if perimeter.is_degenerate {
      choices.push(choose_degenerate_seam_point(perimeter).unwrap_or_default());
      continue;
    }

    let mut nearest = Nearest {
      prefered_position: previous_position,
      max_detour: params.max_detour,
    };
    let mut candidate = choose_seam_point(perimeter, &mut nearest);

    let is_too_far = (candidate.position - previous_position).length() > params.max_detour;
    let least_visible = &least_visible_points[slice_index];

    let is_on_edge = candidate.is_at_vertex()
      && perimeter.angle_types[candidate.next_index] != AngleType::Smooth;
    choice_visibilities[slice_index] = if is_on_edge {
      precalculated_visibility[slice_index][candidate.previous_index]
    } else {
      visibility_calculator.evaluate(&candidate, perimeter)
    };

    let is_too_visible = choice_visibilities[slice_index]
      > least_visible.visibility + params.jump_visibility_threshold;
    let can_be_on_edge =
      perimeter.angle_types[least_visible.choice.next_index] != AngleType::Smooth;
    if is_too_far || (can_be_on_edge && is_too_visible) {
      candidate = least_visible.choice;
    }
    previous_position = candidate.position;
    choices.push(candidate);
  }

  SeamCandidate {
    choices,
    visibilities: choice_visibilities,
  }
}

/// Visibility of every vertex of every slice, `[shell][slice][vertex]`.
fn get_shells_vertex_visibility(
  shells: &Shells,
  visibility_calculator: &impl ChoiceVisibility,
) -> Vec<Vec<Vec<f64>>> {
  map_nested_parallel(shells, |_, _, slice| {
    let positions = &slice.boundary.positions;
    (0..positions.len())
      .map(|point_index| {
        visibility_calculator.evaluate(
          &SeamChoice::at_vertex(point_index, positions[point_index]),
          &slice.boundary,
        )
      })
      .collect()
  })
}

fn get_shells_least_visible_points(
  shells: &Shells,
  precalculated_visibility: &[Vec<Vec<f64>>],
) -> Vec<Vec<LeastVisiblePoint>> {
  map_nested_parallel(shells, |shell_index, slice_index, slice| {
    let vertex_visibility = &precalculated_visibility[shell_index][slice_index];
    let mut least_visible = LeastVisible {
      precalculated_visibility: vertex_visibility,
    };
    let choice = choose_seam_point(&slice.boundary, &mut least_visible);
    LeastVisiblePoint {
      choice,
      visibility: vertex_visibility[choice.previous_index],
    }
  })
}

fn get_shells_seam_candidates(
  shells: &Shells,
  starting_positions: &[Vec<DVec2>],
  visibility_calculator: &impl ChoiceVisibility,
  precalculated_visibility: &[Vec<Vec<f64>>],
  least_visible_points: &[Vec<LeastVisiblePoint>],
  params: &AlignedParams,
) -> Vec<Vec<SeamCandidate>> {
  map_nested_parallel(starting_positions, |shell_index, _, starting_position| {
    get_seam_candidate(
      &shells[shell_index],
      *starting_position,
      visibility_calculator,
      params,
      &precalculated_visibility[shell_index],
      &least_visible_points[shell_index],
    )
  })
}

/// Score every candidate chain of a shell and keep the cheapest.
fn get_shell_seam(
  shell: &Shell,
  seam_candidates: Vec<SeamCandidate>,
  previous_points: Option<&PointTree>,
  params: &AlignedParams,
) -> Vec<SeamChoice> {
  let mut seam = Vec::new();
  let mut visibility = f64::INFINITY;

  for seam_candidate in seam_candidates {
    let first_point = seam_candidate.choices[0].position;

    let closest_point = previous_points
      .and_then(|tree| tree.nearest_neighbor(&[first_point.x, first_point.y]))
      .map(|found| DVec2::new(found.geom()[0], found.geom()[1]));
    let previous_distance = closest_point.map(|point| (point - first_point).length());
    let is_near_previous = previous_distance.is_some_and(|distance| distance < params.max_detour);

    let mut seam_candidate_visibility = if is_near_previous {
      let distance = previous_distance.unwrap_or(params.max_detour);
      -params.continuity_modifier * (params.max_detour - distance) / params.max_detour
    } else {
      0.0
    };
    for slice_index in 0..shell.len() {
      seam_candidate_visibility += seam_candidate.visibilities[slice_index];
    }

    if seam_candidate_visibility < visibility {
      seam = seam_candidate.choices;
      visibility = seam_candidate_visibility;
    }
  }

  seam
}

/// Optimize all shells of an object and scatter the winning chains into a
/// per-layer seam list.
pub fn get_object_seams(
  shells: Shells,
  visibility_calculator: &impl ChoiceVisibility,
  params: &AlignedParams,
) -> Vec<Vec<SeamPerimeterChoice>> {
  let precalculated_visibility = get_shells_vertex_visibility(&shells, visibility_calculator);
  let least_visible_points = get_shells_least_visible_points(&shells, &precalculated_visibility);
  let starting_positions: Vec<Vec<DVec2>> = shells
    .iter()
    .map(|shell| get_starting_positions(shell))
    .collect();
  let mut seam_candidates = get_shells_seam_candidates(
    &shells,
    &starting_positions,
    visibility_calculator,
    &precalculated_visibility,
    &least_visible_points,
    params,
  );

  let mut layer_seams: Vec<Vec<SeamPerimeterChoice>> =
    (0..layer_count(&shells)).map(|_| Vec::new()).collect();

  for (shell_index, shell) in shells.into_iter().enumerate() {
    if shell.is_empty() {
      continue;
    }

    let layer_index = shell[0].layer_index;
    let previous_seams_positions: Vec<DVec2> = if layer_index == 0 {
      Vec::new()
    } else {
      layer_seams[layer_index - 1]
        .iter()
        .map(|seam| seam.choice.position)
        .collect()
    };
    let previous_seams_tree = if previous_seams_positions.is_empty() {
      None
    } else {
      Some(PointTree::bulk_load(
        previous_seams_positions
          .iter()
          .enumerate()
          .map(|(index, position)| GeomWithData::new([position.x, position.y], index))
          .collect(),
      ))
    };

    let candidates = std::mem::take(&mut seam_candidates[shell_index]);
    let seam = get_shell_seam(&shell, candidates, previous_seams_tree.as_ref(), params);

    for (slice, choice) in shell.into_iter().zip(seam) {
      layer_seams[slice.layer_index].push(SeamPerimeterChoice::new(choice, slice.boundary));
    }
  }
  layer_seams
}

#[cfg(test)]
#[path = "aligned_test.rs"]
mod aligned_test;
