use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use rom_die_reader::die_pipeline::classify::{ClusterConfig, read_with_clusters};
use rom_die_reader::die_pipeline::{
    CalibrationDescriptor, CancelFlag, FeatureMap, Photograph, ReferenceDiscriminant, sampling,
};

/// Full-size lattice over a synthetic photograph with alternating cell
/// signatures, at `pitch` pixels per cell.
fn synthetic_photo(pitch: usize) -> Photograph {
    let (rows, cols) = (80, 352);
    let width = cols * pitch + pitch;
    let height = rows * pitch + pitch;
    let half = pitch as f64 / 2.0;
    let descriptor = CalibrationDescriptor::synthetic(
        "bench.png",
        width,
        height,
        (rows, cols),
        (half + pitch as f64 / 2.0, half + pitch as f64 / 2.0),
        (pitch as f64, pitch as f64),
    );
    let feature = FeatureMap::from_fn(width, height, |x, y| {
        let cell = (x / pitch + y / pitch) % 3;
        if cell == 0 { -40.0 } else { ((x * 7 + y * 13) % 17) as f32 }
    });
    Photograph::from_feature_map(descriptor, feature)
}

fn benchmark_patch_sampling(c: &mut Criterion) {
    let mut group = c.benchmark_group("patch_sampling");
    let photo = synthetic_photo(12);

    for (radius, normalize) in [(3, false), (3, true), (6, false)] {
        let label = format!("r{radius}{}", if normalize { "_norm" } else { "" });
        group.bench_with_input(BenchmarkId::from_parameter(label), &(radius, normalize), |b, &(r, n)| {
            b.iter(|| sampling::sample(black_box(&photo), 40, 176, r, n));
        });
    }

    group.finish();
}

fn benchmark_whole_lattice(c: &mut Criterion) {
    let mut group = c.benchmark_group("whole_lattice");
    group.sample_size(10);
    let photo = synthetic_photo(12);
    let cancel = CancelFlag::new();

    group.bench_function("discriminant_mk51", |b| {
        let discriminant = ReferenceDiscriminant::mk51();
        b.iter(|| discriminant.read_bits(black_box(&photo), &cancel));
    });

    group.bench_function("tile_cluster", |b| {
        let config = ClusterConfig { radius: Some(3), ..ClusterConfig::default() };
        b.iter(|| read_with_clusters(black_box(&photo), &config, &cancel));
    });

    group.finish();
}

criterion_group!(benches, benchmark_patch_sampling, benchmark_whole_lattice);
criterion_main!(benches);
