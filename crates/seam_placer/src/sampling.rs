//! Uniform surface sampling of a triangle set.
//!
//! Sample density is proportional to triangle area. Placement is
//! deterministic: samples walk the cumulative area table and land on a
//! low-discrepancy barycentric sequence, so repeated runs produce identical
//! visibility fields without a seed.

use glam::Vec3;
use rayon::prelude::*;

use crate::mesh::TriangleSet;

// The R2 sequence constants (inverse powers of the plastic number).
const R2_ALPHA_1: f64 = 0.754_877_666_246_692_7;
const R2_ALPHA_2: f64 = 0.569_840_290_998_053_2;

/// Surface samples of a triangle set. All arrays have equal length.
#[derive(Clone, Debug, Default)]
pub struct TriangleSetSamples {
  pub total_area: f32,
  pub positions: Vec<Vec3>,
  pub normals: Vec<Vec3>,
  pub triangle_indices: Vec<usize>,
}

impl TriangleSetSamples {
  pub fn len(&self) -> usize {
    self.positions.len()
  }

  pub fn is_empty(&self) -> bool {
    self.positions.is_empty()
  }
}

/// Sample `samples_count` points uniformly over the surface.
pub fn sample_uniform(samples_count: usize, triangles: &TriangleSet) -> TriangleSetSamples {
  if triangles.is_empty() || samples_count == 0 {
    return TriangleSetSamples::default();
  }

  let mut cumulative_areas = Vec::with_capacity(triangles.triangle_count());
  let mut total_area = 0.0f64;
  for index in 0..triangles.triangle_count() {
    total_area += triangles.triangle_area(index) as f64;
    cumulative_areas.push(total_area);
  }
  if total_area <= 0.0 {
    return TriangleSetSamples::default();
  }

  let samples: Vec<(Vec3, Vec3, usize)> = (0..samples_count)
    .into_par_iter()
    .map(|sample_index| {
      let target = (sample_index as f64 + 0.5) / samples_count as f64 * total_area;
      let triangle_index = cumulative_areas
        .partition_point(|&area| area < target)
        .min(triangles.triangle_count() - 1);

      let mut u = (sample_index as f64 * R2_ALPHA_1).fract() as f32;
      let mut v = (sample_index as f64 * R2_ALPHA_2).fract() as f32;
      if u + v > 1.0 {
        u = 1.0 - u;
        v = 1.0 - v;
      }

      let [a, b, c] = triangles.triangle(triangle_index);
      let position = a + u * (b - a) + v * (c - a);
      (position, triangles.face_normal(triangle_index), triangle_index)
    })
    .collect();

  let mut result = TriangleSetSamples {
    total_area: total_area as f32,
    positions: Vec::with_capacity(samples_count),
    normals: Vec::with_capacity(samples_count),
    triangle_indices: Vec::with_capacity(samples_count),
  };
  for (position, normal, triangle_index) in samples {
    result.positions.push(position);
    result.normals.push(normal);
    result.triangle_indices.push(triangle_index);
  }
  result
}

#[cfg(test)]
#[path = "sampling_test.rs"]
mod sampling_test;
