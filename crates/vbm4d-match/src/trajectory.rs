//! 轨迹与网格索引.
//!
//! 轨迹只保存坐标, 块视图在需要时通过 [`Trajectory::blocks`] 针对帧窗口重建.
//! 每侧只能按偏移由近及远追加, 因此缺失项总是向外单调延续.

use vbm4d_core::{FrameSource, Vbm4dResult};

use crate::block::{PixelBlock, Position};
use crate::window::FrameWindow;

/// 时间方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// 向未来帧
    Forward,
    /// 向过去帧
    Backward,
}

impl Direction {
    /// 该方向第 `step` 步对应的时间偏移
    pub fn offset(self, step: usize) -> isize {
        match self {
            Self::Forward => step as isize,
            Self::Backward => -(step as isize),
        }
    }
}

/// 以一个网格位置为锚点的时空轨迹
///
/// 共 2h+1 项, 下标对应时间偏移 `[-h, +h]`, 偏移 0 恒为参考坐标.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trajectory {
    origin: Position,
    extent: usize,
    forward: usize,
    backward: usize,
    entries: Vec<Option<Position>>,
}

impl Trajectory {
    /// 只包含参考坐标的轨迹
    pub fn new(origin: Position, extent: usize) -> Self {
        let mut entries = vec![None; 2 * extent + 1];
        entries[extent] = Some(origin);
        Self {
            origin,
            extent,
            forward: 0,
            backward: 0,
            entries,
        }
    }

    /// 在指定方向的下一个偏移上追加匹配坐标
    ///
    /// # Panics
    /// 该方向已达到时间延伸 h 时 panic.
    pub fn push(&mut self, direction: Direction, pos: Position) {
        let step = match direction {
            Direction::Forward => &mut self.forward,
            Direction::Backward => &mut self.backward,
        };
        assert!(*step < self.extent, "轨迹 {direction:?} 方向已满");
        *step += 1;
        let idx = (self.extent as isize + direction.offset(*step)) as usize;
        self.entries[idx] = Some(pos);
    }

    /// 参考坐标 (偏移 0)
    pub fn origin(&self) -> Position {
        self.origin
    }

    pub fn extent(&self) -> usize {
        self.extent
    }

    /// 指定偏移处的坐标, 缺失或越界返回 None
    pub fn at(&self, offset: isize) -> Option<Position> {
        let idx = self.extent.checked_add_signed(offset)?;
        self.entries.get(idx).copied().flatten()
    }

    /// 前向匹配数
    pub fn forward_extent(&self) -> usize {
        self.forward
    }

    /// 后向匹配数
    pub fn backward_extent(&self) -> usize {
        self.backward
    }

    /// 包含参考块在内的块数
    pub fn len(&self) -> usize {
        1 + self.forward + self.backward
    }

    /// 轨迹至少含参考块, 恒为 false
    pub fn is_empty(&self) -> bool {
        false
    }

    /// 全部 2h+1 项, 下标 i 对应偏移 i − h
    pub fn entries(&self) -> &[Option<Position>] {
        &self.entries
    }

    /// 按偏移升序遍历存在的项
    pub fn iter(&self) -> impl Iterator<Item = (isize, Position)> + '_ {
        let h = self.extent as isize;
        self.entries
            .iter()
            .enumerate()
            .filter_map(move |(i, e)| e.map(|p| (i as isize - h, p)))
    }

    /// 针对帧窗口重建整条轨迹的块视图
    pub fn blocks<'w, S: FrameSource>(
        &self,
        window: &'w FrameWindow<S>,
        block_size: usize,
    ) -> Vbm4dResult<Vec<(isize, PixelBlock<'w>)>> {
        self.iter()
            .map(|(offset, pos)| Ok((offset, window.block_at(pos, block_size, offset)?)))
            .collect()
    }
}

/// 单个 tick 的网格索引: 网格位置 → 轨迹
///
/// 轨迹按参考网格的行优先顺序排列.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GridIndex {
    trajectories: Vec<Trajectory>,
}

impl GridIndex {
    pub fn new(trajectories: Vec<Trajectory>) -> Self {
        debug_assert!(
            trajectories
                .windows(2)
                .all(|w| key(w[0].origin()) < key(w[1].origin()))
        );
        Self { trajectories }
    }

    /// 按网格位置查找轨迹
    pub fn get(&self, pos: Position) -> Option<&Trajectory> {
        let idx = self
            .trajectories
            .binary_search_by_key(&key(pos), |t| key(t.origin()))
            .ok()?;
        Some(&self.trajectories[idx])
    }

    pub fn len(&self) -> usize {
        self.trajectories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trajectories.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Trajectory> {
        self.trajectories.iter()
    }

    pub fn trajectories(&self) -> &[Trajectory] {
        &self.trajectories
    }

    /// 统计本 tick 的匹配情况
    pub fn stats(&self) -> TrajectoryStats {
        let mut stats = TrajectoryStats {
            trajectories: self.trajectories.len(),
            ..TrajectoryStats::default()
        };
        for t in &self.trajectories {
            stats.forward_matches += t.forward_extent();
            stats.backward_matches += t.backward_extent();
            if t.forward_extent() == t.extent() && t.backward_extent() == t.extent() {
                stats.complete += 1;
            }
        }
        stats
    }
}

/// 行优先排序键
fn key(pos: Position) -> (usize, usize) {
    (pos.y, pos.x)
}

/// 网格索引统计
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TrajectoryStats {
    /// 轨迹总数
    pub trajectories: usize,
    /// 前向匹配总数
    pub forward_matches: usize,
    /// 后向匹配总数
    pub backward_matches: usize,
    /// 两侧均延伸满 h 的轨迹数
    pub complete: usize,
}

impl TrajectoryStats {
    /// 平均轨迹长度 (含参考块)
    pub fn mean_length(&self) -> f64 {
        if self.trajectories == 0 {
            return 0.0;
        }
        let total = self.trajectories + self.forward_matches + self.backward_matches;
        total as f64 / self.trajectories as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_新轨迹_只有参考块() {
        let t = Trajectory::new(Position::new(4, 8), 3);
        assert_eq!(t.entries().len(), 7);
        assert_eq!(t.at(0), Some(Position::new(4, 8)));
        assert_eq!(t.origin(), Position::new(4, 8));
        for o in [-3, -2, -1, 1, 2, 3] {
            assert_eq!(t.at(o), None);
        }
        assert_eq!(t.at(4), None);
        assert_eq!(t.at(-4), None);
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn test_追加_单调() {
        let mut t = Trajectory::new(Position::new(10, 10), 3);
        t.push(Direction::Forward, Position::new(11, 10));
        t.push(Direction::Forward, Position::new(12, 10));
        t.push(Direction::Backward, Position::new(9, 10));
        assert_eq!(t.forward_extent(), 2);
        assert_eq!(t.backward_extent(), 1);
        assert_eq!(t.at(2), Some(Position::new(12, 10)));
        assert_eq!(t.at(-1), Some(Position::new(9, 10)));
        assert_eq!(t.at(3), None);
        assert_eq!(t.at(-2), None);
        let offsets: Vec<_> = t.iter().map(|(o, _)| o).collect();
        assert_eq!(offsets, vec![-1, 0, 1, 2]);
    }

    #[test]
    #[should_panic(expected = "方向已满")]
    fn test_追加超出延伸_panic() {
        let mut t = Trajectory::new(Position::new(0, 0), 1);
        t.push(Direction::Backward, Position::new(1, 0));
        t.push(Direction::Backward, Position::new(2, 0));
    }

    #[test]
    fn test_网格索引_查找与统计() {
        let mut a = Trajectory::new(Position::new(0, 0), 1);
        a.push(Direction::Forward, Position::new(1, 0));
        a.push(Direction::Backward, Position::new(0, 1));
        let b = Trajectory::new(Position::new(8, 0), 1);
        let c = Trajectory::new(Position::new(0, 8), 1);
        let index = GridIndex::new(vec![a.clone(), b, c]);
        assert_eq!(index.get(Position::new(0, 0)), Some(&a));
        assert!(index.get(Position::new(8, 8)).is_none());
        let stats = index.stats();
        assert_eq!(stats.trajectories, 3);
        assert_eq!(stats.forward_matches, 1);
        assert_eq!(stats.backward_matches, 1);
        assert_eq!(stats.complete, 1);
        assert!((stats.mean_length() - 5.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_空统计() {
        assert_eq!(GridIndex::default().stats().mean_length(), 0.0);
    }
}
