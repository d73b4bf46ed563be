//! Grouping of matching perimeters across layers into shells.
//!
//! A shell is a vertical chain of perimeters, one per layer, linked by
//! nearest bounding box. The aligned optimizer walks shells to keep seams
//! vertically coherent.

use crate::geometry::{self, mapping, BBox2};
use crate::perimeter::{BoundedPerimeter, Perimeter};

/// One perimeter of a shell with the layer it lives on.
pub struct Slice {
  pub boundary: Perimeter,
  pub layer_index: usize,
}

/// Consecutive slices differ in `layer_index` by exactly 1.
pub type Shell = Vec<Slice>;

pub type Shells = Vec<Shell>;

/// Highest `layer_index` in any shell, plus one.
pub fn layer_count(shells: &Shells) -> usize {
  let mut result = 0;
  for shell in shells {
    for slice in shell {
      if slice.layer_index >= result {
        result = slice.layer_index + 1;
      }
    }
  }
  result
}

fn map_to_shells(
  layers: Vec<Vec<BoundedPerimeter>>,
  shell_mapping: &[Vec<usize>],
  shell_count: usize,
) -> Shells {
  let mut result: Shells = (0..shell_count).map(|_| Shell::new()).collect();
  for (layer_index, perimeters) in layers.into_iter().enumerate() {
    for (perimeter_index, bounded_perimeter) in perimeters.into_iter().enumerate() {
      result[shell_mapping[layer_index][perimeter_index]].push(Slice {
        boundary: bounded_perimeter.perimeter,
        layer_index,
      });
    }
  }
  result
}

/// Link perimeters layer to layer by nearest bounding box. Links further
/// than `max_distance` are refused, which starts a new shell.
pub fn create_shells(perimeters: Vec<Vec<BoundedPerimeter>>, max_distance: f64) -> Shells {
  let layer_sizes: Vec<usize> = perimeters.iter().map(Vec::len).collect();

  let (shell_mapping, shell_count) = mapping::bucket_mapping(&layer_sizes, |layer_index, item_index| {
    let layer = &perimeters[layer_index];
    let next_layer = &perimeters[layer_index + 1];
    if next_layer.is_empty() {
      return None;
    }

    let next_layer_bounding_boxes: Vec<BBox2> = next_layer
      .iter()
      .map(|bounded_perimeter| bounded_perimeter.bounding_box)
      .collect();

    let (perimeter_index, distance) = geometry::pick_closest_bounding_box(
      &layer[item_index].bounding_box,
      &next_layer_bounding_boxes,
    )?;

    if distance > max_distance {
      return None;
    }
    Some((perimeter_index, 1.0 / distance))
  });

  map_to_shells(perimeters, &shell_mapping, shell_count)
}

#[cfg(test)]
#[path = "shells_test.rs"]
mod shells_test;
