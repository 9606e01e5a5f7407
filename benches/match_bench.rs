//! vbm4d 块匹配性能基准测试.
//!
//! 覆盖块差异计算、单次预测搜索以及整张网格的并行/串行体构建.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use vbm4d::core::{LumaFrame, StageParams};
use vbm4d::matching::{
    PixelBlock, ReferenceGrid, TemporalView, TrajectorySearch, Velocity, VolumeBuilder,
};

/// 生成整体平移 (dx, dy) 的纹理帧
fn textured_frame(width: usize, height: usize, t: usize, dx: isize, dy: isize) -> LumaFrame {
    LumaFrame::from_fn(width, height, t as u64, |x, y| {
        let sx = x as isize - dx * t as isize;
        let sy = y as isize - dy * t as isize;
        ((sx * 37 + sy * 91).rem_euclid(251)) as f32 / 251.0
    })
    .unwrap()
}

fn bench_block_difference(c: &mut Criterion) {
    let a = textured_frame(64, 64, 0, 0, 0);
    let b = textured_frame(64, 64, 1, 1, 0);
    let ra = PixelBlock::new(16, 16, 8, &a).unwrap();
    let rb = PixelBlock::new(17, 16, 8, &b).unwrap();
    c.bench_function("nsd_8x8", |bench| {
        bench.iter(|| black_box(ra.normalized_squared_difference(black_box(&rb))))
    });
}

fn bench_find_next(c: &mut Criterion) {
    let params = StageParams::hard_threshold(20.0);
    let search = TrajectorySearch::new(&params);
    let f0 = textured_frame(128, 128, 0, 2, 1);
    let f1 = textured_frame(128, 128, 1, 2, 1);
    let reference = PixelBlock::new(60, 60, params.block_size, &f0).unwrap();
    c.bench_function("find_next_ns11", |bench| {
        bench.iter(|| black_box(search.find_next(&reference, &f1, Velocity::new(2, 1))))
    });
}

fn bench_volume_build(c: &mut Criterion) {
    let params = StageParams::hard_threshold(20.0);
    let frames: Vec<LumaFrame> = (0..9).map(|t| textured_frame(176, 144, t, 1, 1)).collect();
    let view = TemporalView::new(
        &frames[4],
        frames[5..].iter().collect(),
        frames[..4].iter().rev().collect(),
    );
    let grid = ReferenceGrid::new(176, 144, &params).unwrap();

    let parallel = VolumeBuilder::new(&params);
    c.bench_function("volume_qcif_parallel", |bench| {
        bench.iter(|| black_box(parallel.build(&view, &grid)))
    });

    let serial = VolumeBuilder::new(&params).with_parallel(false);
    c.bench_function("volume_qcif_serial", |bench| {
        bench.iter(|| black_box(serial.build(&view, &grid)))
    });
}

criterion_group!(
    benches,
    bench_block_difference,
    bench_find_next,
    bench_volume_build
);
criterion_main!(benches);
