use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use inference::processing::PostProcessor;
use ndarray::{Array, IxDyn};

const NUM_CLASSES: usize = 80;

/// YOLOv3 at 416x416 emits 507, 2028 and 8112 rows across its three heads
fn create_layer(rows: usize, seed: usize) -> Array<f32, IxDyn> {
    let row_len = 5 + NUM_CLASSES;
    let mut data = vec![0.0f32; rows * row_len];
    for (r, row) in data.chunks_mut(row_len).enumerate() {
        let k = r + seed;
        row[0] = (k % 13) as f32 / 13.0;
        row[1] = (k % 17) as f32 / 17.0;
        row[2] = 0.05 + (k % 7) as f32 / 20.0;
        row[3] = 0.05 + (k % 5) as f32 / 20.0;
        row[4] = 0.9;
        // roughly one row in ten clears the threshold
        row[5 + k % NUM_CLASSES] = if k % 10 == 0 { 0.8 } else { 0.2 };
    }
    Array::from_shape_vec(IxDyn(&[rows, row_len]), data).unwrap()
}

fn benchmark_postprocess(c: &mut Criterion) {
    let mut group = c.benchmark_group("postprocess");

    let layers = vec![create_layer(507, 0), create_layer(2028, 1), create_layer(8112, 2)];
    let views: Vec<_> = layers.iter().map(|l| l.view()).collect();

    for (conf, nms) in [(0.5, 0.4), (0.1, 0.4), (0.5, 0.9)] {
        let postprocessor = PostProcessor::new(conf, nms);
        group.bench_with_input(
            BenchmarkId::new("decode_nms", format!("conf{}_nms{}", conf, nms)),
            &views,
            |b, views| {
                b.iter(|| {
                    postprocessor
                        .process(black_box(views), black_box(1280), black_box(720))
                        .unwrap()
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, benchmark_postprocess);
criterion_main!(benches);
