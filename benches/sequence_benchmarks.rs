//! Benchmarks for sequence ordering, preflight, and movie encoding.
//!
//! Run with: cargo bench
//! Run with all features: cargo bench --all-features

use std::path::{Path, PathBuf};

use criterion::Criterion;
use ffmpeg_next::codec::Id;
use image::{Rgb, RgbImage};
use imgseq::{
    FfmpegLogLevel, FrameDuration, ImageSequence, SequenceBuilder, SequenceOptions, preflight,
};

fn shuffled_paths(count: usize) -> Vec<PathBuf> {
    // Multiplicative stride over a prime-sized range gives a fixed permutation.
    let modulus = 10_007;
    (0..count)
        .map(|index| {
            let shuffled = (index * 7_919) % modulus;
            PathBuf::from(format!("frames/shot{shuffled:05}.png"))
        })
        .collect()
}

fn write_frames(directory: &Path, count: usize, width: u32, height: u32) -> Vec<PathBuf> {
    (0..count)
        .map(|index| {
            let path = directory.join(format!("shot{index:04}.png"));
            let shade = (index * 255 / count.max(1)) as u8;
            RgbImage::from_pixel(width, height, Rgb([shade, 255 - shade, 128]))
                .save(&path)
                .unwrap();
            path
        })
        .collect()
}

fn benchmark_ordering(criterion: &mut Criterion) {
    let paths = shuffled_paths(10_000);

    criterion.bench_function("sort 10k image paths", |bencher| {
        bencher.iter(|| ImageSequence::new(paths.iter().cloned()));
    });

    criterion.bench_function("parse frame durations", |bencher| {
        bencher.iter(|| {
            for text in ["1/15", "20/600", "1001/30000", "2"] {
                let _duration: FrameDuration = text.parse().unwrap();
            }
        });
    });
}

fn benchmark_preflight(criterion: &mut Criterion) {
    let directory = tempfile::tempdir().unwrap();
    let sequence = ImageSequence::new(write_frames(directory.path(), 50, 320, 240));

    #[cfg(not(feature = "rayon"))]
    let name = "preflight 50 images (sequential)";
    #[cfg(feature = "rayon")]
    let name = "preflight 50 images (parallel)";

    criterion.bench_function(name, |bencher| {
        bencher.iter(|| preflight(&sequence));
    });
}

fn benchmark_encoding(criterion: &mut Criterion) {
    imgseq::set_ffmpeg_log_level(FfmpegLogLevel::Error);
    if imgseq::ffmpeg::initialize().is_err() || ffmpeg_next::encoder::find(Id::MPEG4).is_none() {
        eprintln!("Skipping benchmark: MPEG-4 encoder not available");
        return;
    }

    let directory = tempfile::tempdir().unwrap();
    let images = write_frames(directory.path(), 30, 320, 240);
    let output = directory.path().join("movie.mov");
    let builder = SequenceBuilder::new(SequenceOptions::new());

    let mut group = criterion.benchmark_group("encoding");
    group.sample_size(10);
    group.bench_function("build 30 frames 320x240 (mpeg4)", |bencher| {
        bencher.iter(|| builder.build(&output, images.iter().cloned()).unwrap());
    });
    group.finish();
}

criterion::criterion_group!(
    benches,
    benchmark_ordering,
    benchmark_preflight,
    benchmark_encoding,
);
criterion::criterion_main!(benches);
