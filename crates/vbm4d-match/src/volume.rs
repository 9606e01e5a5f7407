//! 体 (轨迹) 构建.
//!
//! 对参考网格上的每个位置, 分别向前、向后沿预测运动路径逐帧搜索,
//! 组成一条轨迹. 各网格位置之间互不依赖, 默认在 rayon 线程池上并行计算.

use rayon::prelude::*;
use vbm4d_core::{StageParams, Vbm4dError, Vbm4dResult};

use crate::block::{PixelBlock, Position};
use crate::grid::ReferenceGrid;
use crate::search::{TrajectorySearch, Velocity};
use crate::trajectory::{Direction, GridIndex, Trajectory};
use crate::window::TemporalView;

/// 体构建器
#[derive(Debug, Clone, Copy)]
pub struct VolumeBuilder {
    search: TrajectorySearch,
    extent: usize,
    parallel: bool,
}

impl VolumeBuilder {
    pub fn new(params: &StageParams) -> Self {
        Self {
            search: TrajectorySearch::new(params),
            extent: params.extent,
            parallel: true,
        }
    }

    /// 是否在线程池上并行处理网格位置, 两种方式结果完全一致
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn search(&self) -> &TrajectorySearch {
        &self.search
    }

    /// 为整张网格构建本 tick 的网格索引
    ///
    /// 网格的分辨率与块尺寸必须与视图中的每一帧以及本构建器的参数一致,
    /// 否则返回 [`Vbm4dError::InvalidArgument`].
    pub fn build(&self, view: &TemporalView<'_>, grid: &ReferenceGrid) -> Vbm4dResult<GridIndex> {
        self.check_layout(view, grid)?;
        let positions: Vec<Position> = grid.positions().collect();
        let trajectories = if self.parallel {
            positions
                .par_iter()
                .map(|&pos| self.build_trajectory(view, pos))
                .collect()
        } else {
            positions
                .iter()
                .map(|&pos| self.build_trajectory(view, pos))
                .collect()
        };
        Ok(GridIndex::new(trajectories))
    }

    /// 网格位置与逐帧搜索都假定块完全落在帧内, 在并行计算之前统一检查一次
    fn check_layout(&self, view: &TemporalView<'_>, grid: &ReferenceGrid) -> Vbm4dResult<()> {
        if grid.block_size() != self.search.block_size() {
            return Err(Vbm4dError::InvalidArgument(format!(
                "网格块尺寸 {} 与搜索块尺寸 {} 不一致",
                grid.block_size(),
                self.search.block_size()
            )));
        }
        let expected = (grid.width(), grid.height());
        if let Some(frame) = view.frames().find(|f| f.dimensions() != expected) {
            let (w, h) = frame.dimensions();
            return Err(Vbm4dError::InvalidArgument(format!(
                "帧 #{} 尺寸 {w}x{h} 与网格尺寸 {}x{} 不一致",
                frame.index(),
                expected.0,
                expected.1
            )));
        }
        Ok(())
    }

    /// 构建以 `origin` 为锚点的单条轨迹, 前后两个方向互相独立
    fn build_trajectory(&self, view: &TemporalView<'_>, origin: Position) -> Trajectory {
        let mut trajectory = Trajectory::new(origin, self.extent);
        self.extend(view, &mut trajectory, Direction::Forward);
        self.extend(view, &mut trajectory, Direction::Backward);
        trajectory
    }

    /// 沿一个方向逐帧延伸, 第一次匹配失败后停止
    fn extend(&self, view: &TemporalView<'_>, trajectory: &mut Trajectory, direction: Direction) {
        let block_size = self.search.block_size();
        let mut current = trajectory.origin();
        let mut velocity = Velocity::ZERO;

        for step in 1..=self.extent {
            let (Some(anchor), Some(target)) = (
                view.frame_at(direction.offset(step - 1)),
                view.frame_at(direction.offset(step)),
            ) else {
                break;
            };
            let reference = PixelBlock::new_unchecked(current, block_size, anchor);
            let Some(found) = self.search.find_next(&reference, target, velocity) else {
                break;
            };
            trajectory.push(direction, found.position);
            velocity = Velocity::between(current, found.position);
            current = found.position;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vbm4d_core::LumaFrame;

    fn params(extent: usize, tau_traj: f64) -> StageParams {
        StageParams {
            block_size: 4,
            extent,
            step: 4,
            gamma_p: 1.0,
            gamma_d: 0.0,
            search_size: 7,
            gamma_w: 0.5,
            sigma_w: 1.0,
            tau_traj,
        }
    }

    /// 纹理随帧整体平移 (dx, dy) 像素
    fn shifted(t: usize, dx: isize, dy: isize) -> LumaFrame {
        LumaFrame::from_fn(32, 32, t as u64, |x, y| {
            let sx = x as isize - dx * t as isize;
            let sy = y as isize - dy * t as isize;
            (((sx * 31 + sy * 17).rem_euclid(29)) as f32) / 29.0
        })
        .unwrap()
    }

    #[test]
    fn test_匀速平移_轨迹跟随() {
        let frames: Vec<LumaFrame> = (0..5).map(|t| shifted(t, 2, 1)).collect();
        let view = TemporalView::new(
            &frames[2],
            vec![&frames[3], &frames[4]],
            vec![&frames[1], &frames[0]],
        );
        let builder = VolumeBuilder::new(&params(2, 1e-6));
        let t = builder.build_trajectory(&view, Position::new(12, 12));
        assert_eq!(t.at(1), Some(Position::new(14, 13)));
        assert_eq!(t.at(2), Some(Position::new(16, 14)));
        assert_eq!(t.at(-1), Some(Position::new(10, 11)));
        assert_eq!(t.at(-2), Some(Position::new(8, 10)));
    }

    #[test]
    fn test_缓存帧不足时截断() {
        let frames: Vec<LumaFrame> = (0..2).map(|t| shifted(t, 1, 0)).collect();
        let view = TemporalView::new(&frames[0], vec![&frames[1]], Vec::new());
        let builder = VolumeBuilder::new(&params(3, 1e-6));
        let t = builder.build_trajectory(&view, Position::new(8, 8));
        assert_eq!(t.forward_extent(), 1);
        assert_eq!(t.backward_extent(), 0);
        assert_eq!(t.at(2), None);
    }

    #[test]
    fn test_前向失败不影响后向() {
        // 后向帧与当前帧相同, 前向帧为完全不同的纹理
        let cur = shifted(0, 0, 0);
        let prev = shifted(0, 0, 0);
        let next = LumaFrame::filled(32, 32, 1, 1.0).unwrap();
        let view = TemporalView::new(&cur, vec![&next], vec![&prev]);
        let builder = VolumeBuilder::new(&params(1, 1e-6));
        let t = builder.build_trajectory(&view, Position::new(4, 4));
        assert_eq!(t.forward_extent(), 0);
        assert_eq!(t.at(-1), Some(Position::new(4, 4)));
    }

    #[test]
    fn test_并行与串行一致() {
        let frames: Vec<LumaFrame> = (0..5).map(|t| shifted(t, 1, -1)).collect();
        let view = TemporalView::new(
            &frames[2],
            vec![&frames[3], &frames[4]],
            vec![&frames[1], &frames[0]],
        );
        let p = params(2, 0.05);
        let grid = ReferenceGrid::new(32, 32, &p).unwrap();
        let parallel = VolumeBuilder::new(&p).build(&view, &grid).unwrap();
        let serial = VolumeBuilder::new(&p)
            .with_parallel(false)
            .build(&view, &grid)
            .unwrap();
        assert_eq!(parallel, serial);
        assert_eq!(parallel.len(), grid.len());
        for (t, pos) in parallel.iter().zip(grid.positions()) {
            assert_eq!(t.at(0), Some(pos));
        }
    }

    #[test]
    fn test_网格与帧不一致_报错() {
        let p = params(1, 0.05);
        let small = shifted(0, 0, 0);
        let big = LumaFrame::filled(48, 48, 1, 0.5).unwrap();
        let grid = ReferenceGrid::new(48, 48, &p).unwrap();
        let builder = VolumeBuilder::new(&p);

        let view = TemporalView::new(&small, Vec::new(), Vec::new());
        assert!(matches!(
            builder.build(&view, &grid),
            Err(Vbm4dError::InvalidArgument(_))
        ));

        // 当前帧匹配, 但前向帧更小
        let view = TemporalView::new(&big, vec![&small], Vec::new());
        assert!(builder.build(&view, &grid).is_err());

        let other = ReferenceGrid::new(48, 48, &StageParams { block_size: 8, ..p }).unwrap();
        let view = TemporalView::new(&big, Vec::new(), Vec::new());
        assert!(builder.build(&view, &other).is_err());
        assert!(builder.build(&view, &grid).is_ok());
    }
}
