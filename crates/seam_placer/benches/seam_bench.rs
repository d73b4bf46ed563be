//! Benchmarks for the expensive seam placement phases: visibility
//! raycasting and the full aligned pipeline on a synthetic box.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use glam::{DMat4, DVec2, Vec3};
use seam_placer::mesh::TriangleSet;
use seam_placer::sampling::sample_uniform;
use seam_placer::visibility::raycast_visibility;
use seam_placer::{
  ExPolygon, ExternalPerimeter, Island, Params, Placer, SeamPosition, SlicedLayer, SlicedObject,
  VisibilityParams, VolumeKind,
};

fn box_mesh(min: Vec3, max: Vec3) -> TriangleSet {
  let positions = vec![
    Vec3::new(min.x, min.y, min.z),
    Vec3::new(max.x, min.y, min.z),
    Vec3::new(max.x, max.y, min.z),
    Vec3::new(min.x, max.y, min.z),
    Vec3::new(min.x, min.y, max.z),
    Vec3::new(max.x, min.y, max.z),
    Vec3::new(max.x, max.y, max.z),
    Vec3::new(min.x, max.y, max.z),
  ];
  let indices = vec![
    [0, 2, 1],
    [0, 3, 2],
    [4, 5, 6],
    [4, 6, 7],
    [0, 1, 5],
    [0, 5, 4],
    [1, 2, 6],
    [1, 6, 5],
    [2, 3, 7],
    [2, 7, 6],
    [3, 0, 4],
    [3, 4, 7],
  ];
  TriangleSet::new(positions, indices)
}

fn square_loop(side: f64) -> Vec<DVec2> {
  vec![
    DVec2::new(0.0, 0.0),
    DVec2::new(side, 0.0),
    DVec2::new(side, side),
    DVec2::new(0.0, side),
  ]
}

fn box_object(side: f64, layer_count: usize) -> SlicedObject {
  let layer_height = 0.2;
  let layers = (0..layer_count)
    .map(|index| SlicedLayer {
      slice_z: (index + 1) as f64 * layer_height,
      height: layer_height,
      perimeter_count: 1,
      islands: vec![Island {
        boundary: ExPolygon {
          contour: square_loop(side),
          holes: Vec::new(),
        },
        external_perimeters: vec![ExternalPerimeter {
          polygon: square_loop(side),
          width: 0.4,
          overhangs: Vec::new(),
        }],
      }],
    })
    .collect();

  SlicedObject {
    transform: DMat4::IDENTITY,
    volumes: vec![seam_placer::ModelVolume {
      kind: VolumeKind::ModelPart,
      mesh: box_mesh(
        Vec3::ZERO,
        Vec3::new(side as f32, side as f32, layer_count as f32 * 0.2),
      ),
      transform: DMat4::IDENTITY,
      seam_enforcers: TriangleSet::default(),
      seam_blockers: TriangleSet::default(),
    }],
    layers,
    strategy: SeamPosition::Aligned,
  }
}

fn bench_raycast_visibility(c: &mut Criterion) {
  let mesh = box_mesh(Vec3::ZERO, Vec3::new(20.0, 20.0, 20.0));
  let params = VisibilityParams {
    raycasting_visibility_samples_count: 5_000,
    fast_decimation_triangle_count_target: 16_000,
    sqr_rays_per_sample_point: 5,
  };
  let samples = sample_uniform(params.raycasting_visibility_samples_count, &mesh);

  c.bench_function("raycast_visibility (20mm box, 5k samples)", |b| {
    b.iter(|| {
      let visibility =
        raycast_visibility(&mesh, &samples, mesh.triangle_count(), black_box(&params));
      black_box(visibility)
    })
  });
}

fn bench_aligned_init(c: &mut Criterion) {
  let object = box_object(20.0, 50);
  let params = Params {
    visibility: VisibilityParams {
      raycasting_visibility_samples_count: 2_000,
      fast_decimation_triangle_count_target: 16_000,
      sqr_rays_per_sample_point: 3,
    },
    ..Params::default()
  };

  c.bench_function("Placer::init (aligned, 50 layers)", |b| {
    b.iter(|| {
      let placer = Placer::init(
        black_box(std::slice::from_ref(&object)),
        params.clone(),
        &|| false,
      )
      .unwrap();
      black_box(placer)
    })
  });
}

criterion_group!(benches, bench_raycast_visibility, bench_aligned_init);
criterion_main!(benches);
