//! Nearest-line queries over closed loops.
//!
//! Backs perimeter classification (embedding depth, overhang distance),
//! overhang arc projection and the final projection of a seam onto the
//! extrusion loop. Signed distance is negative inside the filled region;
//! the sign comes from the edge normal, or from an averaged pseudonormal
//! when the nearest feature is a shared vertex.

use glam::DVec2;
use rstar::primitives::{GeomWithData, Line};
use rstar::RTree;

use crate::geometry::{distance_to_segment_squared, edge_normal};

type IndexedLine = GeomWithData<Line<[f64; 2]>, usize>;

const VERTEX_SNAP_EPSILON: f64 = 1e-9;

/// R-tree of the edges of one or more closed loops.
pub struct LineDistancer {
  tree: RTree<IndexedLine>,
  lines: Vec<(DVec2, DVec2)>,
  edge_normals: Vec<DVec2>,
  start_normals: Vec<DVec2>,
  end_normals: Vec<DVec2>,
}

impl LineDistancer {
  /// Build from closed loops (first point not repeated). Contours are
  /// expected counterclockwise and holes clockwise, so edge normals point
  /// out of the filled region.
  pub fn new(loops: &[Vec<DVec2>]) -> Self {
    let mut lines = Vec::new();
    let mut edge_normals = Vec::new();
    let mut start_normals = Vec::new();
    let mut end_normals = Vec::new();

    for loop_points in loops {
      if loop_points.len() < 2 {
        continue;
      }
      let count = loop_points.len();
      let loop_edge_normals: Vec<DVec2> = (0..count)
        .map(|index| {
          let a = loop_points[index];
          let b = loop_points[(index + 1) % count];
          edge_normal(b - a)
        })
        .collect();
      for index in 0..count {
        let previous = if index == 0 { count - 1 } else { index - 1 };
        let next = (index + 1) % count;
        lines.push((loop_points[index], loop_points[next]));
        edge_normals.push(loop_edge_normals[index]);
        start_normals
          .push((loop_edge_normals[previous] + loop_edge_normals[index]).normalize_or_zero());
        end_normals.push((loop_edge_normals[index] + loop_edge_normals[next]).normalize_or_zero());
      }
    }

    let elements: Vec<IndexedLine> = lines
      .iter()
      .enumerate()
      .map(|(index, (a, b))| {
        GeomWithData::new(Line::new([a.x, a.y], [b.x, b.y]), index)
      })
      .collect();

    Self {
      tree: RTree::bulk_load(elements),
      lines,
      edge_normals,
      start_normals,
      end_normals,
    }
  }

  pub fn is_empty(&self) -> bool {
    self.lines.is_empty()
  }

  pub fn line_count(&self) -> usize {
    self.lines.len()
  }

  pub fn line(&self, index: usize) -> (DVec2, DVec2) {
    self.lines[index]
  }

  /// Nearest line index, the foot point on it and the unsigned distance.
  pub fn nearest(&self, point: DVec2) -> Option<(usize, DVec2, f64)> {
    let nearest = self.tree.nearest_neighbor(&[point.x, point.y])?;
    let index = nearest.data;
    let (a, b) = self.lines[index];
    let (foot, distance_squared) = distance_to_segment_squared(a, b, point);
    Some((index, foot, distance_squared.sqrt()))
  }

  /// Unsigned distance to the closest line; infinity when there are none.
  pub fn distance(&self, point: DVec2) -> f64 {
    self
      .nearest(point)
      .map(|(_, _, distance)| distance)
      .unwrap_or(f64::INFINITY)
  }

  /// Signed distance: positive outside the filled region, negative inside.
  pub fn signed_distance(&self, point: DVec2) -> f64 {
    let Some((index, foot, distance)) = self.nearest(point) else {
      return f64::INFINITY;
    };
    let (a, b) = self.lines[index];
    let normal = if (foot - a).length_squared() < VERTEX_SNAP_EPSILON {
      self.start_normals[index]
    } else if (foot - b).length_squared() < VERTEX_SNAP_EPSILON {
      self.end_normals[index]
    } else {
      self.edge_normals[index]
    };
    if (point - foot).dot(normal) >= 0.0 {
      distance
    } else {
      -distance
    }
  }
}

#[cfg(test)]
#[path = "distancer_test.rs"]
mod distancer_test;
