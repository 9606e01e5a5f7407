//! 参考块网格.
//!
//! 每个轴上取 `0, S, 2S, …` 直到 `W−N`, 若 `W−N` 不是 S 的倍数则追加
//! `W−N`, 保证网格覆盖到帧的右/下边缘. 每种分辨率只需计算一次.

use vbm4d_core::{StageParams, Vbm4dError, Vbm4dResult};

use crate::block::Position;

/// 参考块网格
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceGrid {
    width: usize,
    height: usize,
    block_size: usize,
    step: usize,
    columns: Vec<usize>,
    rows: Vec<usize>,
}

impl ReferenceGrid {
    /// 为指定分辨率生成网格
    pub fn new(width: usize, height: usize, params: &StageParams) -> Vbm4dResult<Self> {
        let (n, s) = (params.block_size, params.step);
        if n == 0 || n > width || n > height {
            return Err(Vbm4dError::OutOfBounds(format!(
                "块尺寸 {n} 无法放入 {width}x{height} 的帧"
            )));
        }
        if s == 0 {
            return Err(Vbm4dError::InvalidArgument("网格步长不能为 0".into()));
        }
        Ok(Self {
            width,
            height,
            block_size: n,
            step: s,
            columns: axis_positions(width, n, s),
            rows: axis_positions(height, n, s),
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn step(&self) -> usize {
        self.step
    }

    /// 列坐标 (x), 升序
    pub fn columns(&self) -> &[usize] {
        &self.columns
    }

    /// 行坐标 (y), 升序
    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    /// 网格位置总数
    pub fn len(&self) -> usize {
        self.columns.len() * self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 按行优先顺序遍历全部网格位置
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        self.rows
            .iter()
            .flat_map(move |&y| self.columns.iter().map(move |&x| Position::new(x, y)))
    }

    /// 网格位置在行优先顺序中的下标, 不是网格位置时返回 None
    pub fn index_of(&self, pos: Position) -> Option<usize> {
        let col = self.columns.binary_search(&pos.x).ok()?;
        let row = self.rows.binary_search(&pos.y).ok()?;
        Some(row * self.columns.len() + col)
    }
}

/// 单个轴上的参考块坐标
fn axis_positions(len: usize, block_size: usize, step: usize) -> Vec<usize> {
    let last = len - block_size;
    let mut positions: Vec<usize> = (0..=last).step_by(step).collect();
    if positions.last() != Some(&last) {
        positions.push(last);
    }
    positions
}
