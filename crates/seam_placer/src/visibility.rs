//! Model visibility field.
//!
//! One occlusion mesh is assembled from all positive and negative volumes,
//! decimated, and sampled uniformly. Every sample casts a fixed stratified
//! grid of hemisphere rays; each occluded ray lowers the sample's
//! visibility. Seam candidates later look up a weighted average of nearby
//! samples.
//!
//! The ray grid is stratified rather than Monte Carlo and the surface
//! sampling is deterministic, so the field is reproducible for identical
//! inputs.

use glam::{DMat4, Vec3};
use nalgebra::{Point3, Vector3};
use parry3d::query::{Ray, RayCast};
use parry3d::shape::{FeatureId, TriMesh};
use rayon::prelude::*;
use rstar::primitives::GeomWithData;
use rstar::RTree;
use smallvec::SmallVec;
use tracing::debug;

use crate::cancel::{ensure_not_cancelled, CancelCallback, Cancelled};
use crate::mesh::TriangleSet;
use crate::params::VisibilityParams;
use crate::sampling::{sample_uniform, TriangleSetSamples};
use crate::types::{ModelVolume, VolumeKind};

/// Rays start this far above (or below) the sampled surface.
const RAY_ORIGIN_OFFSET: f32 = 0.01;

/// Advance past a hit before recasting in all-hits mode.
const RAY_ADVANCE_EPSILON: f32 = 1e-4;

/// Upper bound on hits collected along a single ray.
const MAX_HITS_PER_RAY: usize = 64;

type SampleTree = RTree<GeomWithData<[f32; 3], usize>>;

/// Orthonormal frame with +Z aligned to a surface normal.
struct Frame {
  x: Vec3,
  y: Vec3,
  z: Vec3,
}

impl Frame {
  fn from_z(z: Vec3) -> Self {
    let z = z.normalize_or_zero();
    let tmp_x = if z.x.abs() > 0.99 { Vec3::Y } else { Vec3::X };
    let y = z.cross(tmp_x).normalize_or_zero();
    let x = y.cross(z);
    Self { x, y, z }
  }

  fn to_world(&self, a: Vec3) -> Vec3 {
    a.x * self.x + a.y * self.y + a.z * self.z
  }
}

fn sample_hemisphere_uniform(sample_x: f32, sample_y: f32) -> Vec3 {
  let term1 = 2.0 * std::f32::consts::PI * sample_x;
  let term2 = 2.0 * (sample_y - sample_y * sample_y).sqrt();
  Vec3::new(
    term1.cos() * term2,
    term1.sin() * term2,
    (1.0 - 2.0 * sample_y).abs(),
  )
}

/// The fixed stratified grid of hemisphere directions, +Z forward.
fn precompute_sample_directions(sqr_rays: usize) -> Vec<Vec3> {
  let step_size = 1.0 / sqr_rays as f32;
  let mut directions = Vec::with_capacity(sqr_rays * sqr_rays);
  for x_idx in 0..sqr_rays {
    let sample_x = x_idx as f32 * step_size + step_size / 2.0;
    for y_idx in 0..sqr_rays {
      let sample_y = y_idx as f32 * step_size + step_size / 2.0;
      directions.push(sample_hemisphere_uniform(sample_x, sample_y));
    }
  }
  directions
}

fn to_na_point(v: Vec3) -> Point3<f32> {
  Point3::new(v.x, v.y, v.z)
}

fn to_na_vector(v: Vec3) -> Vector3<f32> {
  Vector3::new(v.x, v.y, v.z)
}

fn hit_face(tree: &TriMesh, origin: Vec3, direction: Vec3) -> Option<(usize, f32)> {
  let ray = Ray::new(to_na_point(origin), to_na_vector(direction));
  let hit = tree.cast_local_ray_and_get_normal(&ray, f32::MAX, false)?;
  match hit.feature {
    FeatureId::Face(id) => Some((id as usize, hit.time_of_impact)),
    _ => None,
  }
}

/// Collect all faces along the ray, ordered near to far, by marching past
/// each hit.
fn all_hit_faces(tree: &TriMesh, origin: Vec3, direction: Vec3, hits: &mut SmallVec<[usize; 8]>) {
  hits.clear();
  let direction = direction.normalize_or_zero();
  let mut travelled = 0.0f32;
  for _ in 0..MAX_HITS_PER_RAY {
    let Some((face, distance)) = hit_face(tree, origin + direction * travelled, direction) else {
      break;
    };
    hits.push(face);
    travelled += distance + RAY_ADVANCE_EPSILON;
  }
}

fn sign(value: f32) -> i32 {
  ((0.0 < value) as i32) - ((value < 0.0) as i32)
}

/// Cast the ray grid from every sample against a prebuilt tree.
pub(crate) fn raycast_with_tree(
  tree: &TriMesh,
  triangles: &TriangleSet,
  samples: &TriangleSetSamples,
  negative_volumes_start: usize,
  params: &VisibilityParams,
) -> Vec<f32> {
  debug!(
    samples = samples.len(),
    triangles = triangles.triangle_count(),
    "raycast visibility: start"
  );

  let directions = precompute_sample_directions(params.sqr_rays_per_sample_point);
  let decrease_step = 1.0 / directions.len() as f32;
  let model_contains_negative_parts = negative_volumes_start < triangles.triangle_count();

  let result: Vec<f32> = (0..samples.len())
    .into_par_iter()
    .map_init(
      // Hit buffer lives per worker so it is not reallocated per query.
      SmallVec::<[usize; 8]>::new,
      |hits, sample_index| {
        let mut visibility = 1.0f32;
        let center = samples.positions[sample_index];
        let normal = samples.normals[sample_index];
        let frame = Frame::from_z(normal);

        for direction in &directions {
          let mut final_ray_dir = frame.to_world(*direction);
          if !model_contains_negative_parts {
            let ray_origin = center + normal * RAY_ORIGIN_OFFSET;
            if let Some((face, _)) = hit_face(tree, ray_origin, final_ray_dir) {
              if triangles.face_normal(face).dot(final_ray_dir) <= 0.0 {
                visibility -= decrease_step;
              }
            }
          } else {
            let casting_from_negative_volume =
              samples.triangle_indices[sample_index] >= negative_volumes_start;
            let mut ray_origin = center + normal * RAY_ORIGIN_OFFSET;
            if casting_from_negative_volume {
              final_ray_dir = -final_ray_dir;
              ray_origin = center - normal * RAY_ORIGIN_OFFSET;
            }

            all_hit_faces(tree, ray_origin, final_ray_dir, hits);
            if !hits.is_empty() {
              // Walk hits in reverse: past the last hit the ray is known to
              // be outside both the model and any negative volume.
              let mut counter = 0i32;
              for &face in hits.iter().rev() {
                let alignment = sign(triangles.face_normal(face).dot(final_ray_dir));
                if face >= negative_volumes_start {
                  counter -= alignment;
                } else {
                  counter += alignment;
                }
              }
              if counter == 0 {
                visibility -= decrease_step;
              }
            }
          }
        }
        visibility.max(0.0)
      },
    )
    .collect();

  debug!(samples = samples.len(), "raycast visibility: end");
  result
}

/// Convenience entry building the occlusion tree internally. Used by tests
/// and benchmarks; [`Visibility::new`] interleaves cancel checks instead.
pub fn raycast_visibility(
  triangles: &TriangleSet,
  samples: &TriangleSetSamples,
  negative_volumes_start: usize,
  params: &VisibilityParams,
) -> Vec<f32> {
  match build_occlusion_tree(triangles) {
    Some(tree) => raycast_with_tree(&tree, triangles, samples, negative_volumes_start, params),
    None => vec![1.0; samples.len()],
  }
}

fn build_occlusion_tree(triangles: &TriangleSet) -> Option<TriMesh> {
  if triangles.is_empty() {
    return None;
  }
  let vertices = triangles.positions.iter().map(|p| to_na_point(*p)).collect();
  TriMesh::new(vertices, triangles.indices.clone()).ok()
}

/// Occlusion field over one object: surface samples with visibility values
/// and a tree for spatial lookup.
pub struct Visibility {
  samples: TriangleSetSamples,
  visibility: Vec<f32>,
  sample_tree: SampleTree,
  radius: f32,
}

impl Visibility {
  pub fn new(
    obj_transform: &DMat4,
    volumes: &[ModelVolume],
    params: &VisibilityParams,
    cancel: &CancelCallback,
  ) -> Result<Self, Cancelled> {
    debug!("gather occlusion meshes: start");
    let mut triangle_set = TriangleSet::default();
    let mut negative_volumes_set = TriangleSet::default();
    for volume in volumes {
      match volume.kind {
        VolumeKind::ModelPart => {
          triangle_set.merge(&volume.mesh.transformed(&volume.transform));
        }
        VolumeKind::NegativeVolume => {
          negative_volumes_set.merge(&volume.mesh.transformed(&volume.transform));
        }
        VolumeKind::Other => {}
      }
    }
    ensure_not_cancelled(cancel)?;
    debug!("gather occlusion meshes: end");

    debug!("decimate: start");
    triangle_set.decimate(params.fast_decimation_triangle_count_target);
    negative_volumes_set.decimate(params.fast_decimation_triangle_count_target);

    let negative_volumes_start = triangle_set.triangle_count();
    triangle_set.merge(&negative_volumes_set);
    let triangle_set = triangle_set.transformed(obj_transform);
    debug!("decimate: end");

    debug!("compute visibility sample points: start");
    let samples = sample_uniform(params.raycasting_visibility_samples_count, &triangle_set);
    let sample_tree = SampleTree::bulk_load(
      samples
        .positions
        .iter()
        .enumerate()
        .map(|(index, position)| GeomWithData::new([position.x, position.y, position.z], index))
        .collect(),
    );

    // Search area for nearby samples around a query point: with sample
    // placement approximately Poisson, the complementary exponential
    // distribution gives the area containing more than `samples` samples
    // with the wanted probability. P(S > s in A) = e^-(s / (density * A)).
    let probability = 0.9f32;
    let wanted_samples = 4.0f32;
    let radius = if samples.is_empty() {
      0.0
    } else {
      let density = samples.len() as f32 / samples.total_area;
      let search_area = wanted_samples / (-probability.ln() * density);
      (search_area / std::f32::consts::PI).sqrt()
    };
    debug!(radius, "compute visibility sample points: end");
    ensure_not_cancelled(cancel)?;

    debug!("build occlusion tree: start");
    let tree = build_occlusion_tree(&triangle_set);
    debug!("build occlusion tree: end");
    ensure_not_cancelled(cancel)?;

    let visibility = match &tree {
      Some(tree) => raycast_with_tree(
        tree,
        &triangle_set,
        &samples,
        negative_volumes_start,
        params,
      ),
      None => vec![1.0; samples.len()],
    };
    ensure_not_cancelled(cancel)?;

    Ok(Self {
      samples,
      visibility,
      sample_tree,
      radius,
    })
  }

  pub fn radius(&self) -> f32 {
    self.radius
  }

  pub fn sample_visibilities(&self) -> &[f32] {
    &self.visibility
  }

  /// Weighted mean visibility of the samples around `position`; 1.0 when
  /// nothing is in range.
  pub fn point_visibility(&self, position: Vec3) -> f32 {
    let query = [position.x, position.y, position.z];
    let radius = self.radius;
    let mut total_weight = 0.0f32;
    let mut total_visibility = 0.0f32;

    for sample in self
      .sample_tree
      .locate_within_distance(query, radius * radius)
    {
      let sample_index = sample.data;
      let sample_point = self.samples.positions[sample_index];
      let sample_normal = self.samples.normals[sample_index];

      let distance_to_plane = (position - sample_point).dot(sample_normal).abs();
      let mut weight = radius - distance_to_plane;
      weight += radius - (position - sample_point).length();
      total_visibility += weight * self.visibility[sample_index];
      total_weight += weight;
    }

    if total_weight <= 0.0 {
      return 1.0;
    }
    total_visibility / total_weight
  }
}

#[cfg(test)]
#[path = "visibility_test.rs"]
mod visibility_test;
