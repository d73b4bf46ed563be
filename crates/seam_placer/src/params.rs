//! Configuration for seam placement.
//!
//! All lengths are millimeters, all angles radians. The defaults are the
//! production values; callers converting user-facing degree settings are
//! expected to pass radians.

/// Which seam strategy drives an object.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeamPosition {
  /// Chain seams vertically through matching perimeters, preferring the
  /// least visible spots.
  Aligned,

  /// Put seams at the rear (maximum Y) of each perimeter.
  Rear,

  /// Scatter seams uniformly along each perimeter.
  Random,

  /// Place each seam as close as possible to the previous print position,
  /// decided at query time.
  Nearest,
}

/// Per-perimeter construction parameters.
#[derive(Clone, Debug)]
pub struct PerimeterParams {
  /// Outward offset applied to layer 0 polygons to undo first-layer squish.
  pub elephant_foot_compensation: f64,

  /// Maximum point spacing inserted along painted edges.
  pub oversampling_max_distance: f64,

  /// Minimum depth inside the layer outline for a point to count as
  /// embedded.
  pub embedding_threshold: f64,

  /// Overhang angle (radians) above which a point counts as overhanging.
  pub overhang_threshold: f64,

  /// Vertex angle (radians) above which a corner counts as convex.
  pub convex_threshold: f64,

  /// Vertex angle (radians) below the negation of which a corner counts as
  /// concave.
  pub concave_threshold: f64,

  /// Radius used when looking up painted enforcer/blocker triangles.
  pub painting_radius: f64,

  /// Douglas-Peucker epsilon for redundant point removal.
  pub simplification_epsilon: f64,

  /// Arm length used for the smoothed vertex angle.
  pub smooth_angle_arm_length: f64,

  /// Arm length used for the sharp vertex angle.
  pub sharp_angle_arm_length: f64,
}

impl Default for PerimeterParams {
  fn default() -> Self {
    Self {
      elephant_foot_compensation: 0.0,
      oversampling_max_distance: 0.2,
      embedding_threshold: 0.5,
      overhang_threshold: 55.0_f64.to_radians(),
      convex_threshold: 10.0_f64.to_radians(),
      concave_threshold: 15.0_f64.to_radians(),
      painting_radius: 0.1,
      simplification_epsilon: 0.001,
      smooth_angle_arm_length: 0.2,
      sharp_angle_arm_length: 0.05,
    }
  }
}

/// Model visibility raycasting parameters.
#[derive(Clone, Debug)]
pub struct VisibilityParams {
  /// Number of samples generated on the mesh surface. Each sample casts
  /// `sqr_rays_per_sample_point²` rays.
  pub raycasting_visibility_samples_count: usize,

  /// Triangle count the occlusion meshes are decimated to before the AABB
  /// tree is built.
  pub fast_decimation_triangle_count_target: usize,

  /// Square root of the number of rays cast per sample point.
  pub sqr_rays_per_sample_point: usize,
}

impl Default for VisibilityParams {
  fn default() -> Self {
    Self {
      raycasting_visibility_samples_count: 30_000,
      fast_decimation_triangle_count_target: 16_000,
      sqr_rays_per_sample_point: 5,
    }
  }
}

/// Parameters of the aligned (shell chaining) optimizer.
#[derive(Clone, Debug)]
pub struct AlignedParams {
  /// Maximum XY drift of a chained seam between consecutive layers.
  pub max_detour: f64,

  /// Extra visibility tolerated before jumping to the least visible point.
  pub jump_visibility_threshold: f64,

  /// Score bonus for starting a chain near the previous layer's seams.
  pub continuity_modifier: f64,
}

impl Default for AlignedParams {
  fn default() -> Self {
    Self {
      max_detour: 1.0,
      jump_visibility_threshold: 0.6,
      continuity_modifier: 2.0,
    }
  }
}

/// The closed parameter set consumed by [`crate::placer::Placer`].
#[derive(Clone, Debug)]
pub struct Params {
  /// Maximum detour for the query-time nearest strategy.
  pub max_nearest_detour: f64,

  /// Tolerance band below the bounding box top for the rear strategy.
  pub rear_tolerance: f64,

  /// How far behind the bounding box the rear preferred position sits.
  pub rear_y_offset: f64,

  pub aligned: AlignedParams,

  /// Maximum bounding box distance for shell linking and for preferring the
  /// projected island boundary over the expanded extrusion.
  pub max_distance: f64,

  /// Seed of the random strategy. Same seed, same seams.
  pub random_seed: u64,

  /// Visibility penalty weight of convex corners.
  pub convex_visibility_modifier: f64,

  /// Visibility penalty weight of concave corners.
  pub concave_visibility_modifier: f64,

  pub perimeter: PerimeterParams,
  pub visibility: VisibilityParams,

  /// Offset inner perimeter seams along the loop so they do not stack
  /// vertically with the outer seam.
  pub staggered_inner_seams: bool,
}

impl Default for Params {
  fn default() -> Self {
    Self {
      max_nearest_detour: 1.0,
      rear_tolerance: 0.2,
      rear_y_offset: 20.0,
      aligned: AlignedParams::default(),
      max_distance: 5.0,
      random_seed: 1_653_710_332,
      convex_visibility_modifier: 1.1,
      concave_visibility_modifier: 0.9,
      perimeter: PerimeterParams::default(),
      visibility: VisibilityParams::default(),
      staggered_inner_seams: false,
    }
  }
}
