use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use stackcount::{
    cluster_box_roi_constrained, BoundingBox, ClusterConfig, Detection, PileTemplate,
    StackProcessor, TemplateDb,
};

/// Synthetic stack: `tiers` rows of `per_tier` cartons with seeded
/// sub-pixel jitter, wrapped in a pile outline detection.
fn make_scene(tiers: usize, per_tier: usize, seed: u64) -> Vec<Detection> {
    let mut rng = StdRng::seed_from_u64(seed);
    let width = 1200.0f32;
    let tier_height = 180.0f32;
    let pitch = width / per_tier as f32;

    let mut detections = vec![Detection::new(
        "pile",
        0.97,
        BoundingBox::new(0.0, 0.0, width, tiers as f32 * tier_height + 40.0),
    )];

    for t in 0..tiers {
        let y = 20.0 + t as f32 * tier_height;
        for i in 0..per_tier {
            let jx: f32 = rng.gen_range(-2.0..2.0);
            let jy: f32 = rng.gen_range(-3.0..3.0);
            let x = i as f32 * pitch + 4.0 + jx;
            detections.push(Detection::new(
                "carton",
                rng.gen_range(0.7..0.99),
                BoundingBox::new(x, y + jy, x + pitch - 8.0, y + tier_height - 20.0 + jy),
            ));
        }
    }

    detections
}

fn bench_process_stack(c: &mut Criterion) {
    let templates = TemplateDb::new(vec![PileTemplate {
        pile_id: 1,
        name: "bench-12x5".to_string(),
        layer_counts: vec![12; 5],
    }])
    .expect("valid template");
    let processor = StackProcessor::new(templates);

    let scene_small = make_scene(3, 8, 11);
    let scene_large = make_scene(5, 12, 13);

    c.bench_function("process_stack_3x8", |b| {
        b.iter(|| {
            let result = processor.process_stack(black_box(&scene_small), 1);
            black_box(result.map(|r| r.total_count))
        })
    });

    c.bench_function("process_stack_5x12", |b| {
        b.iter(|| {
            let result = processor.process_stack(black_box(&scene_large), 1);
            black_box(result.map(|r| r.total_count))
        })
    });
}

fn bench_clustering(c: &mut Criterion) {
    let scene = make_scene(5, 12, 17);
    let roi = scene[0].bbox;
    let boxes: Vec<BoundingBox> = scene[1..].iter().map(|d| d.bbox).collect();
    let cfg = ClusterConfig::default();

    c.bench_function("cluster_box_roi_5x12", |b| {
        b.iter(|| {
            let out = cluster_box_roi_constrained(black_box(&boxes), black_box(&roi), &cfg);
            black_box(out.layers.len())
        })
    });
}

criterion_group!(pipeline, bench_process_stack, bench_clustering);
criterion_main!(pipeline);
