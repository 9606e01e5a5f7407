//! 轨迹计算驱动.
//!
//! 每个 tick: 在帧窗口当前持有的帧上重新计算整张网格索引, 交给调用方消费,
//! 检查取消标志, 然后前进一帧. 网格索引只在下一次前进之前有效.

use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, info, warn};
use vbm4d_core::{FrameSource, LumaFrame, StageParams, Vbm4dError, Vbm4dResult};

use crate::grid::ReferenceGrid;
use crate::trajectory::{GridIndex, TrajectoryStats};
use crate::volume::VolumeBuilder;
use crate::window::FrameWindow;

/// 单个 tick 交给回调的结果
#[derive(Debug, Clone, Copy)]
pub struct TickReport<'a> {
    /// tick 序号, 从 0 开始
    pub tick: u64,
    /// 本 tick 的当前帧
    pub frame: &'a LumaFrame,
    pub index: &'a GridIndex,
    pub stats: TrajectoryStats,
}

/// 一次完整运行的汇总
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RunSummary {
    pub ticks: u64,
    /// 是否因取消标志提前结束
    pub cancelled: bool,
    pub trajectories: usize,
    pub forward_matches: usize,
    pub backward_matches: usize,
    pub complete: usize,
}

impl RunSummary {
    fn record(&mut self, stats: &TrajectoryStats) {
        self.ticks += 1;
        self.trajectories += stats.trajectories;
        self.forward_matches += stats.forward_matches;
        self.backward_matches += stats.backward_matches;
        self.complete += stats.complete;
    }

    /// 全部 tick 的平均轨迹长度 (含参考块)
    pub fn mean_length(&self) -> f64 {
        TrajectoryStats {
            trajectories: self.trajectories,
            forward_matches: self.forward_matches,
            backward_matches: self.backward_matches,
            complete: self.complete,
        }
        .mean_length()
    }
}

/// 轨迹计算引擎
///
/// 持有一个帧窗口、一张参考网格和一个体构建器, 参数在创建时针对视频分辨率
/// 校验一次.
pub struct TrajectoryEngine<S: FrameSource> {
    window: FrameWindow<S>,
    grid: Option<ReferenceGrid>,
    builder: VolumeBuilder,
    params: StageParams,
    /// 当前 tick 的网格索引, 前进后失效
    index: Option<GridIndex>,
    ticks: u64,
}

impl<S: FrameSource> TrajectoryEngine<S> {
    /// 创建引擎并完成帧窗口的初始填充
    ///
    /// 块尺寸超出视频分辨率返回 [`Vbm4dError::OutOfBounds`], 其余非法参数返回
    /// [`Vbm4dError::InvalidArgument`]. 空流不是错误, 引擎直接处于结束状态.
    pub fn new(source: S, params: StageParams) -> Vbm4dResult<Self> {
        params.validate_settings()?;
        let window = FrameWindow::new(source, &params)?;
        let grid = match window.dimensions() {
            Some((width, height)) => {
                params.validate(width, height)?;
                let grid = ReferenceGrid::new(width, height, &params)?;
                info!(
                    "参考网格: {}x{} = {} 个位置 (N={}, S={})",
                    grid.columns().len(),
                    grid.rows().len(),
                    grid.len(),
                    params.block_size,
                    params.step,
                );
                Some(grid)
            }
            None => {
                warn!("帧源没有任何帧, 不会产生网格索引");
                None
            }
        };
        Ok(Self {
            window,
            grid,
            builder: VolumeBuilder::new(&params),
            params,
            index: None,
            ticks: 0,
        })
    }

    /// 切换并行/串行计算
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.builder = self.builder.with_parallel(parallel);
        self
    }

    pub fn params(&self) -> &StageParams {
        &self.params
    }

    pub fn window(&self) -> &FrameWindow<S> {
        &self.window
    }

    pub fn grid(&self) -> Option<&ReferenceGrid> {
        self.grid.as_ref()
    }

    /// 已完成 (已前进) 的 tick 数
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn has_current(&self) -> bool {
        self.window.has_current()
    }

    pub fn current_frame(&self) -> Option<&LumaFrame> {
        self.window.current()
    }

    /// 本 tick 已计算的网格索引, 尚未调用 [`compute`](Self::compute) 时为 None
    pub fn current_grid_index(&self) -> Option<&GridIndex> {
        self.index.as_ref()
    }

    /// 计算本 tick 的网格索引, 同一 tick 内重复调用直接返回缓存结果
    pub fn compute(&mut self) -> Vbm4dResult<&GridIndex> {
        let index = match self.index.take() {
            Some(index) => index,
            None => {
                let view = self.window.temporal_view().ok_or_else(|| {
                    Vbm4dError::InvalidArgument("帧窗口已结束, 没有当前帧".into())
                })?;
                let grid = self.grid.as_ref().ok_or_else(|| {
                    Vbm4dError::InvalidArgument("参考网格尚未建立".into())
                })?;
                let index = self.builder.build(&view, grid)?;
                debug!(
                    "tick {}: 帧 #{}, 前向 {} 帧, 后向 {} 帧",
                    self.ticks,
                    view.current().index(),
                    view.forward_len(),
                    view.backward_len(),
                );
                index
            }
        };
        Ok(self.index.insert(index))
    }

    /// 丢弃本 tick 的网格索引并前进一帧
    pub fn advance(&mut self) -> Vbm4dResult<()> {
        self.index = None;
        self.window.advance()?;
        self.ticks += 1;
        Ok(())
    }

    /// 逐 tick 运行到帧源耗尽
    ///
    /// 每个 tick 计算网格索引后调用 `on_tick`, 回调返回错误时中止运行.
    /// 取消标志在回调之后、前进之前检查一次.
    pub fn run<F>(&mut self, cancel: &AtomicBool, mut on_tick: F) -> Vbm4dResult<RunSummary>
    where
        F: FnMut(&TickReport<'_>) -> Vbm4dResult<()>,
    {
        let mut summary = RunSummary::default();
        if let Some(grid) = &self.grid {
            info!(
                "开始轨迹计算: {} 个网格位置, h={}, τ={:.4}",
                grid.len(),
                self.params.extent,
                self.params.tau_traj,
            );
        }

        while self.has_current() {
            self.compute()?;
            let (Some(frame), Some(index)) = (self.window.current(), self.index.as_ref()) else {
                break;
            };
            let stats = index.stats();
            summary.record(&stats);
            debug!(
                "tick {}: {} 条轨迹, 前向 {}, 后向 {}, 平均长度 {:.2}",
                self.ticks,
                stats.trajectories,
                stats.forward_matches,
                stats.backward_matches,
                stats.mean_length(),
            );
            on_tick(&TickReport {
                tick: self.ticks,
                frame,
                index,
                stats,
            })?;

            if cancel.load(Ordering::Relaxed) {
                info!("收到取消请求, 在第 {} 个 tick 后停止", self.ticks);
                summary.cancelled = true;
                break;
            }
            self.advance()?;
        }

        info!(
            "轨迹计算结束: {} 个 tick, 平均轨迹长度 {:.2}",
            summary.ticks,
            summary.mean_length()
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vbm4d_core::MemorySource;

    fn params() -> StageParams {
        StageParams {
            block_size: 4,
            extent: 1,
            step: 4,
            gamma_p: 0.0,
            gamma_d: 0.0,
            search_size: 3,
            gamma_w: 0.5,
            sigma_w: 1.0,
            tau_traj: 1e9,
        }
    }

    fn frames(count: usize, width: usize, height: usize) -> Vec<LumaFrame> {
        (0..count)
            .map(|t| LumaFrame::filled(width, height, t as u64, 0.5).unwrap())
            .collect()
    }

    #[test]
    fn test_空流_不产生tick() {
        let mut engine = TrajectoryEngine::new(MemorySource::new(Vec::new()), params()).unwrap();
        assert!(!engine.has_current());
        assert!(engine.grid().is_none());
        let summary = engine.run(&AtomicBool::new(false), |_| Ok(())).unwrap();
        assert_eq!(summary, RunSummary::default());
    }

    #[test]
    fn test_块大于帧_启动失败() {
        let source = MemorySource::new(frames(2, 3, 16));
        assert!(matches!(
            TrajectoryEngine::new(source, params()),
            Err(Vbm4dError::OutOfBounds(_))
        ));
    }

    #[test]
    fn test_非法参数_不读取帧源() {
        let source = MemorySource::new(frames(2, 8, 8));
        let huge = StageParams {
            extent: usize::MAX / 4,
            ..params()
        };
        assert!(matches!(
            TrajectoryEngine::new(source, huge),
            Err(Vbm4dError::InvalidArgument(_))
        ));

        // 空流时无法校验分辨率, 但其余参数仍会被拒绝
        let zero_step = StageParams { step: 0, ..params() };
        assert!(matches!(
            TrajectoryEngine::new(MemorySource::new(Vec::new()), zero_step),
            Err(Vbm4dError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_compute_缓存_advance_清除() {
        let mut engine = TrajectoryEngine::new(MemorySource::new(frames(3, 8, 8)), params()).unwrap();
        assert!(engine.current_grid_index().is_none());
        let first = engine.compute().unwrap().clone();
        assert_eq!(first.len(), 4);
        assert_eq!(engine.compute().unwrap(), &first);
        engine.advance().unwrap();
        assert!(engine.current_grid_index().is_none());
        assert_eq!(engine.ticks(), 1);
        assert_eq!(engine.current_frame().map(|f| f.index()), Some(1));
    }

    #[test]
    fn test_运行到结束() {
        let mut engine = TrajectoryEngine::new(MemorySource::new(frames(4, 8, 8)), params()).unwrap();
        let mut seen = Vec::new();
        let summary = engine
            .run(&AtomicBool::new(false), |report| {
                seen.push((report.tick, report.frame.index()));
                assert_eq!(report.index.len(), 4);
                Ok(())
            })
            .unwrap();
        assert_eq!(seen, vec![(0, 0), (1, 1), (2, 2), (3, 3)]);
        assert_eq!(summary.ticks, 4);
        assert!(!summary.cancelled);
        // 首帧无后向帧, 末帧无前向帧
        assert_eq!(summary.forward_matches, 3 * 4);
        assert_eq!(summary.backward_matches, 3 * 4);
        assert!(!engine.has_current());
    }

    #[test]
    fn test_取消_不再前进() {
        let mut engine = TrajectoryEngine::new(MemorySource::new(frames(5, 8, 8)), params()).unwrap();
        let cancel = AtomicBool::new(false);
        let summary = engine
            .run(&cancel, |report| {
                if report.tick == 1 {
                    cancel.store(true, Ordering::Relaxed);
                }
                Ok(())
            })
            .unwrap();
        assert!(summary.cancelled);
        assert_eq!(summary.ticks, 2);
        assert_eq!(engine.current_frame().map(|f| f.index()), Some(1));
        assert!(engine.current_grid_index().is_some());
    }

    #[test]
    fn test_回调错误_中止() {
        let mut engine = TrajectoryEngine::new(MemorySource::new(frames(3, 8, 8)), params()).unwrap();
        let err = engine
            .run(&AtomicBool::new(false), |_| {
                Err(Vbm4dError::InvalidArgument("stop".into()))
            })
            .unwrap_err();
        assert!(matches!(err, Vbm4dError::InvalidArgument(_)));
        assert_eq!(engine.ticks(), 0);
    }
}
