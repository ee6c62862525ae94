use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pathgen::test_backends::{LaneWorld, LaneMesh, TestAgent, CELL_SIZE};
use pathgen::{PathGenerator, Vec3};

fn bench_path_generation(c: &mut Criterion) {
    let mesh = LaneMesh::flat(16);
    let world = LaneWorld::dry();
    let agent = TestAgent::creature();
    let dest = Vec3::new(15.0 * CELL_SIZE + 5.0, 0.0, 5.0);

    let mut group = c.benchmark_group("pathgen/lane");

    group.bench_function("plan_fresh", |b| {
        b.iter(|| {
            let mut generator = PathGenerator::new(&agent, &world, &mesh);
            generator.calculate_path(black_box(dest), false);
            black_box(generator.path_points().len());
        })
    });

    let mut generator = PathGenerator::new(&agent, &world, &mesh);
    generator.calculate_path(dest, false);
    group.bench_function("plan_reuse_corridor", |b| {
        b.iter(|| {
            generator.calculate_path_from(
                black_box(Vec3::new(15.0, 0.5, 5.0)),
                black_box(Vec3::new(13.0 * CELL_SIZE + 5.0, 0.0, 5.0)),
                false,
            );
            black_box(generator.path_points().len());
        })
    });

    let mut shortened = PathGenerator::new(&agent, &world, &mesh);
    shortened.calculate_path(dest, false);
    group.bench_function("shorten_until_dist", |b| {
        b.iter(|| {
            shortened.shorten_path_until_dist(black_box(dest + Vec3::new(5.0, 0.0, 0.0)), 6.0);
            black_box(shortened.path_points().len());
        })
    });

    group.finish();
}

criterion_group!(benches, bench_path_generation);
criterion_main!(benches);
