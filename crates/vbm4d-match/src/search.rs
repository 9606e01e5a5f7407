//! 速度自适应的预测块搜索.
//!
//! 给定参考块、目标帧和累计速度, 在预测位置周围的自适应窗口内
//! 做完整的光栅扫描, 取得分最小且低于阈值的候选块:
//!
//! ```text
//! 预测中心:  (xc, yc) = (x + γp·vx, y + γp·vy)
//! 半窗宽:    Npr = Ns/2 · (1 − γw·exp(−(vx² + vy²) / 2σw²))
//! 得分:      nsd(ref, cand) + γd·‖ref − cand‖
//! ```

use vbm4d_core::{LumaFrame, StageParams};

use crate::block::{PixelBlock, Position};

/// 两帧之间的整数位移
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Velocity {
    pub vx: isize,
    pub vy: isize,
}

impl Velocity {
    pub const ZERO: Self = Self { vx: 0, vy: 0 };

    pub const fn new(vx: isize, vy: isize) -> Self {
        Self { vx, vy }
    }

    /// `to − from`
    pub fn between(from: Position, to: Position) -> Self {
        Self {
            vx: to.x as isize - from.x as isize,
            vy: to.y as isize - from.y as isize,
        }
    }

    /// 速度模长的平方
    pub fn norm_sqr(&self) -> f64 {
        let (vx, vy) = (self.vx as f64, self.vy as f64);
        vx * vx + vy * vy
    }
}

/// 已钳制到帧内的闭区间搜索窗口 (块左上角坐标)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SearchWindow {
    pub x_min: usize,
    pub x_max: usize,
    pub y_min: usize,
    pub y_max: usize,
}

impl SearchWindow {
    pub fn contains(&self, pos: Position) -> bool {
        (self.x_min..=self.x_max).contains(&pos.x) && (self.y_min..=self.y_max).contains(&pos.y)
    }

    /// 候选位置数
    pub fn area(&self) -> usize {
        (self.x_max - self.x_min + 1) * (self.y_max - self.y_min + 1)
    }
}

/// 一次成功的块匹配
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockMatch {
    pub position: Position,
    pub score: f64,
}

/// 预测块搜索器
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrajectorySearch {
    block_size: usize,
    gamma_p: f64,
    gamma_d: f64,
    search_size: usize,
    gamma_w: f64,
    sigma_w: f64,
    tau_traj: f64,
}

impl TrajectorySearch {
    pub fn new(params: &StageParams) -> Self {
        Self {
            block_size: params.block_size,
            gamma_p: params.gamma_p,
            gamma_d: params.gamma_d,
            search_size: params.search_size,
            gamma_w: params.gamma_w,
            sigma_w: params.sigma_w,
            tau_traj: params.tau_traj,
        }
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// 自适应半窗宽 Npr, 速度接近 0 时收缩, 速度增大时趋近 Ns/2
    pub fn half_width(&self, velocity: Velocity) -> f64 {
        let decay = (-velocity.norm_sqr() / (2.0 * self.sigma_w * self.sigma_w)).exp();
        self.search_size as f64 / 2.0 * (1.0 - self.gamma_w * decay)
    }

    /// 计算钳制到 `[0, W−N]×[0, H−N]` 内的搜索窗口, 窗口为空时返回 None
    pub fn search_window(
        &self,
        reference: Position,
        velocity: Velocity,
        width: usize,
        height: usize,
    ) -> Option<SearchWindow> {
        let x_limit = width.checked_sub(self.block_size)? as f64;
        let y_limit = height.checked_sub(self.block_size)? as f64;

        let xc = reference.x as f64 + self.gamma_p * velocity.vx as f64;
        let yc = reference.y as f64 + self.gamma_p * velocity.vy as f64;
        let npr = self.half_width(velocity);

        let x_min = (xc - npr).max(0.0).round();
        let y_min = (yc - npr).max(0.0).round();
        let x_max = (xc + npr).min(x_limit).round();
        let y_max = (yc + npr).min(y_limit).round();
        if x_min > x_max || y_min > y_max {
            return None;
        }
        Some(SearchWindow {
            x_min: x_min as usize,
            x_max: x_max as usize,
            y_min: y_min as usize,
            y_max: y_max as usize,
        })
    }

    /// 在目标帧中寻找参考块的下一个匹配块
    ///
    /// 按行优先升序扫描窗口, 保留严格最小的得分 (得分相同时先扫描到的胜出),
    /// 只有得分严格小于 τ_traj 时才返回匹配. 候选块总是落在目标帧内.
    ///
    /// # Panics
    /// 参考块尺寸与搜索参数的块尺寸 N 不同时 panic.
    pub fn find_next(
        &self,
        reference: &PixelBlock<'_>,
        target: &LumaFrame,
        velocity: Velocity,
    ) -> Option<BlockMatch> {
        assert_eq!(
            reference.size(),
            self.block_size,
            "参考块尺寸与搜索块尺寸不一致"
        );
        let window = self.search_window(
            reference.position(),
            velocity,
            target.width(),
            target.height(),
        )?;

        let origin = reference.position();
        let mut best: Option<BlockMatch> = None;
        let mut best_score = self.tau_traj;
        for y in window.y_min..=window.y_max {
            for x in window.x_min..=window.x_max {
                let pos = Position::new(x, y);
                let candidate = PixelBlock::new_unchecked(pos, self.block_size, target);
                let score = reference.normalized_squared_difference(&candidate)
                    + self.gamma_d * origin.distance(pos);
                if score < best_score {
                    best_score = score;
                    best = Some(BlockMatch {
                        position: pos,
                        score,
                    });
                }
            }
        }
        best
    }
}
