//! seam_placer - Seam placement core for fused-filament slicing
//!
//! Given a sliced object (a stack of layers, each with closed external
//! perimeter loops), this crate decides the single point on every loop at
//! which extrusion starts and ends - the visible Z-seam.
//!
//! # Features
//!
//! - **Model visibility**: hemisphere raycasting over a decimated occlusion
//!   mesh, so seams can hide in the least visible spots
//! - **Seam painting**: user-painted enforcer and blocker regions looked up
//!   per perimeter vertex
//! - **Shell alignment**: matching perimeters are chained across layers and
//!   seams optimized per chain, so the seam reads as one vertical stripe
//! - **Four strategies**: aligned, rear, random and query-time nearest
//!
//! # Example
//!
//! ```ignore
//! use seam_placer::{Placer, Params};
//!
//! let placer = Placer::init(&objects, Params::default(), &|| false)?;
//!
//! // At G-code export time, once per extrusion loop:
//! let seam = placer.place_seam(object_index, layer_index, &loop, last_pos);
//! ```

pub mod params;
pub use params::{AlignedParams, Params, PerimeterParams, SeamPosition, VisibilityParams};

// Cooperative cancellation of init.
pub mod cancel;
pub use cancel::{CancelCallback, Cancelled};

// Input data model.
pub mod types;
pub use types::{
  ExPolygon, ExternalPerimeter, ExtrusionLoop, Island, LoopRole, ModelVolume, OverhangRegion,
  SlicedLayer, SlicedObject, VolumeKind,
};

// Geometry utilities and nearest-line queries.
pub mod geometry;
pub mod distancer;

// Triangle sets, surface sampling and the occlusion field.
pub mod mesh;
pub mod sampling;
pub mod visibility;
pub use mesh::TriangleSet;
pub use visibility::Visibility;

// Painted enforcer/blocker lookup.
pub mod painting;
pub use painting::Painting;

// Per-layer perimeters and cross-layer shells.
pub mod perimeter;
pub mod shells;
pub use perimeter::{AngleType, Perimeter, PointClassification, PointType};

// Seam choosers and the per-strategy optimizers.
pub mod choice;
pub mod aligned;
pub mod random;
pub mod rear;
pub use choice::{SeamChoice, SeamPerimeterChoice, SeamPicker};

// The façade.
pub mod placer;
pub use placer::Placer;

// Shared test fixtures.
#[cfg(test)]
pub(crate) mod test_utils;
