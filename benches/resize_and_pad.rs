//! Letterbox benchmarks

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use clip_normalizer::video::{resize_and_pad, Frame};

fn generate_test_frame(width: u32, height: u32) -> Frame {
    let mut frame = Frame::new_black(width, height);
    for y in 0..height {
        for x in 0..width {
            let v = ((x * 7 + y * 3) % 256) as u8;
            frame.set_pixel(x, y, [v, v.wrapping_add(85), v.wrapping_add(170)]);
        }
    }
    frame
}

fn bench_resize_and_pad(c: &mut Criterion) {
    let mut group = c.benchmark_group("resize_and_pad_768");

    for (width, height, name) in &[(1920u32, 1080u32, "1080p"), (1280, 720, "720p"), (1080, 1920, "portrait")] {
        let frame = generate_test_frame(*width, *height);
        group.throughput(Throughput::Elements((*width as u64) * (*height as u64)));

        group.bench_function(*name, |b| b.iter(|| black_box(resize_and_pad(black_box(&frame), 768))));
    }

    group.finish();
}

fn bench_exact_fit(c: &mut Criterion) {
    let frame = generate_test_frame(768, 768);
    c.bench_function("resize_and_pad_exact_fit", |b| b.iter(|| black_box(resize_and_pad(black_box(&frame), 768))));
}

criterion_group!(benches, bench_resize_and_pad, bench_exact_fit);
criterion_main!(benches);
