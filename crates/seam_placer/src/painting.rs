//! Painted seam regions.
//!
//! Users paint enforcer and blocker triangles on the model. Both sets are
//! kept in world space (volume and object transforms baked in) behind
//! triangle trees so perimeter points can ask "is anything painted within
//! this radius of me".

use glam::{DMat4, Vec3};
use nalgebra::Point3;
use parry3d::query::PointQuery;
use parry3d::shape::TriMesh;

use crate::mesh::TriangleSet;
use crate::types::ModelVolume;

fn build_tree(triangles: &TriangleSet) -> Option<TriMesh> {
  if triangles.is_empty() {
    return None;
  }
  let vertices = triangles
    .positions
    .iter()
    .map(|position| Point3::new(position.x, position.y, position.z))
    .collect();
  TriMesh::new(vertices, triangles.indices.clone()).ok()
}

/// Enforcer and blocker lookup for one object.
pub struct Painting {
  enforcers: Option<TriMesh>,
  blockers: Option<TriMesh>,
}

impl Painting {
  /// Bake all painted facets of the object's volumes into world space.
  pub fn new(obj_transform: &DMat4, volumes: &[ModelVolume]) -> Self {
    let mut enforcers = TriangleSet::default();
    let mut blockers = TriangleSet::default();

    for volume in volumes {
      if volume.seam_enforcers.is_empty() && volume.seam_blockers.is_empty() {
        continue;
      }
      let transform = *obj_transform * volume.transform;
      enforcers.merge(&volume.seam_enforcers.transformed(&transform));
      blockers.merge(&volume.seam_blockers.transformed(&transform));
    }

    Self {
      enforcers: build_tree(&enforcers),
      blockers: build_tree(&blockers),
    }
  }

  fn is_within(tree: &Option<TriMesh>, position: Vec3, radius: f32) -> bool {
    match tree {
      Some(mesh) => {
        let point = Point3::new(position.x, position.y, position.z);
        mesh.distance_to_local_point(&point, true) <= radius
      }
      None => false,
    }
  }

  /// Any enforcer triangle within `radius` of `position`.
  pub fn is_enforced(&self, position: Vec3, radius: f32) -> bool {
    Self::is_within(&self.enforcers, position, radius)
  }

  /// Any blocker triangle within `radius` of `position`.
  pub fn is_blocked(&self, position: Vec3, radius: f32) -> bool {
    Self::is_within(&self.blockers, position, radius)
  }
}

#[cfg(test)]
#[path = "painting_test.rs"]
mod painting_test;
