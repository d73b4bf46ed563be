//! Indexed triangle sets for the visibility and painting fields.
//!
//! Holds plain vertex/index buffers; spatial queries go through the parry
//! tree built on top. Decimation is a short-edge collapse: cheap, and good
//! enough for an occlusion mesh that only answers ray queries.

use glam::{DMat4, Vec3};

/// An indexed triangle set in object space.
#[derive(Clone, Debug, Default)]
pub struct TriangleSet {
  pub positions: Vec<Vec3>,
  pub indices: Vec<[u32; 3]>,
}

impl TriangleSet {
  pub fn new(positions: Vec<Vec3>, indices: Vec<[u32; 3]>) -> Self {
    Self { positions, indices }
  }

  pub fn is_empty(&self) -> bool {
    self.indices.is_empty()
  }

  pub fn triangle_count(&self) -> usize {
    self.indices.len()
  }

  pub fn triangle(&self, index: usize) -> [Vec3; 3] {
    let [a, b, c] = self.indices[index];
    [
      self.positions[a as usize],
      self.positions[b as usize],
      self.positions[c as usize],
    ]
  }

  /// Outward face normal, zero for degenerate triangles.
  pub fn face_normal(&self, index: usize) -> Vec3 {
    let [a, b, c] = self.triangle(index);
    (b - a).cross(c - a).normalize_or_zero()
  }

  pub fn triangle_area(&self, index: usize) -> f32 {
    let [a, b, c] = self.triangle(index);
    (b - a).cross(c - a).length() / 2.0
  }

  pub fn total_area(&self) -> f32 {
    (0..self.triangle_count())
      .map(|index| self.triangle_area(index) as f64)
      .sum::<f64>() as f32
  }

  /// Append another set, remapping its indices.
  pub fn merge(&mut self, other: &TriangleSet) {
    let offset = self.positions.len() as u32;
    self.positions.extend_from_slice(&other.positions);
    self
      .indices
      .extend(other.indices.iter().map(|[a, b, c]| {
        [a + offset, b + offset, c + offset]
      }));
  }

  /// The same set with every vertex transformed.
  pub fn transformed(&self, transform: &DMat4) -> TriangleSet {
    let positions = self
      .positions
      .iter()
      .map(|position| transform.transform_point3(position.as_dvec3()).as_vec3())
      .collect();
    TriangleSet {
      positions,
      indices: self.indices.clone(),
    }
  }

  /// Collapse shortest edges until at most `target_triangle_count`
  /// triangles remain. Each pass collapses an independent set of edges
  /// (midpoint placement) and drops the triangles that degenerate.
  pub fn decimate(&mut self, target_triangle_count: usize) {
    while self.triangle_count() > target_triangle_count {
      let needed = self.triangle_count() - target_triangle_count;
      // Every collapse removes at least one triangle, usually two.
      let max_collapses = needed.div_ceil(2).max(1);

      let mut edges: Vec<(f32, u32, u32)> = Vec::with_capacity(self.indices.len() * 3);
      for [a, b, c] in &self.indices {
        for (from, to) in [(*a, *b), (*b, *c), (*c, *a)] {
          let (from, to) = (from.min(to), from.max(to));
          let length = (self.positions[from as usize] - self.positions[to as usize]).length();
          edges.push((length, from, to));
        }
      }
      edges.sort_unstable_by(|lhs, rhs| {
        lhs
          .0
          .total_cmp(&rhs.0)
          .then(lhs.1.cmp(&rhs.1))
          .then(lhs.2.cmp(&rhs.2))
      });
      edges.dedup_by(|lhs, rhs| lhs.1 == rhs.1 && lhs.2 == rhs.2);

      let mut remap: Vec<u32> = (0..self.positions.len() as u32).collect();
      let mut touched = vec![false; self.positions.len()];
      let mut collapsed = 0usize;

      for (_, from, to) in edges {
        if collapsed >= max_collapses {
          break;
        }
        if touched[from as usize] || touched[to as usize] {
          continue;
        }
        let midpoint =
          (self.positions[from as usize] + self.positions[to as usize]) / 2.0;
        self.positions[from as usize] = midpoint;
        remap[to as usize] = from;
        touched[from as usize] = true;
        touched[to as usize] = true;
        collapsed += 1;
      }

      if collapsed == 0 {
        break;
      }

      self.indices.retain_mut(|triangle| {
        for index in triangle.iter_mut() {
          *index = remap[*index as usize];
        }
        let [a, b, c] = *triangle;
        a != b && b != c && c != a
      });
    }
  }
}

#[cfg(test)]
#[path = "mesh_test.rs"]
mod mesh_test;
