//! 滑动帧窗口.
//!
//! 以单个循环双端队列加游标的方式保存 "当前帧" 前后各最多 `h` 帧:
//!
//! ```text
//! frames: [ t-k .. t-1 | t | t+1 .. t+m ]
//!                        ^ cursor          k <= h, m <= h
//! ```
//!
//! 每个 tick 先在窗口内完成全部轨迹计算, 再调用 [`FrameWindow::advance`]
//! 淘汰最旧的帧并读入一帧新帧.

use std::collections::VecDeque;

use log::{debug, info};
use vbm4d_core::{FrameSource, LumaFrame, StageParams, Vbm4dError, Vbm4dResult};

use crate::block::{PixelBlock, Position};

/// 窗口状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowState {
    /// 初始填充: 读入当前帧与最多 h 帧前向帧
    ///
    /// 只存在于 [`FrameWindow::new`] 内部, 构造完成后窗口至少处于 Steady.
    Warmup,
    /// 正常滑动
    Steady,
    /// 帧源已耗尽, 前向帧逐步减少
    ///
    /// h = 0 时窗口不缓存前向帧, 帧源耗尽由前进时的读取发现, 窗口直接进入 Empty.
    Draining,
    /// 终止状态, 没有当前帧
    Empty,
}

/// 滑动帧窗口
pub struct FrameWindow<S: FrameSource> {
    source: S,
    /// 时间延伸 h
    extent: usize,
    /// 缓存的帧, 按时间升序
    frames: VecDeque<LumaFrame>,
    /// 当前帧在 `frames` 中的位置
    cursor: usize,
    state: WindowState,
    /// 帧源是否已返回流结束
    exhausted: bool,
    /// 视频分辨率, 由第一帧确定
    dimensions: Option<(usize, usize)>,
    /// 从帧源成功读取的帧数
    frames_read: u64,
}

impl<S: FrameSource> FrameWindow<S> {
    /// 创建窗口并完成初始填充
    ///
    /// 读入 1 帧当前帧和最多 `params.extent` 帧前向帧, 流提前结束时停止.
    /// 空流得到的窗口直接处于 [`WindowState::Empty`].
    pub fn new(source: S, params: &StageParams) -> Vbm4dResult<Self> {
        let extent = params.extent;
        let mut window = Self {
            source,
            extent,
            frames: VecDeque::new(),
            cursor: 0,
            state: WindowState::Warmup,
            exhausted: false,
            dimensions: None,
            frames_read: 0,
        };

        match window.pull()? {
            Some(frame) => window.frames.push_back(frame),
            None => {
                info!("帧源为空, 窗口直接结束");
                window.state = WindowState::Empty;
                return Ok(window);
            }
        }
        for _ in 0..extent {
            match window.pull()? {
                Some(frame) => window.frames.push_back(frame),
                None => break,
            }
        }
        window.settle();

        if let Some((w, h)) = window.dimensions {
            info!(
                "帧窗口初始化完成: {w}x{h}, h={extent}, 前向缓存 {} 帧",
                window.forward_len()
            );
        }
        Ok(window)
    }

    /// 从帧源读取一帧, 流结束返回 None, 流结束后不再访问帧源
    fn pull(&mut self) -> Vbm4dResult<Option<LumaFrame>> {
        if self.exhausted {
            return Ok(None);
        }
        let frame = match self.source.receive_frame() {
            Ok(frame) => frame,
            Err(Vbm4dError::Eof) => {
                debug!("帧源结束, 共读取 {} 帧", self.frames_read);
                self.exhausted = true;
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let dims = frame.dimensions();
        match self.dimensions {
            None => self.dimensions = Some(dims),
            Some(expected) if expected != dims => {
                return Err(Vbm4dError::Decode(format!(
                    "第 {} 帧尺寸 {}x{} 与视频尺寸 {}x{} 不一致",
                    self.frames_read, dims.0, dims.1, expected.0, expected.1
                )));
            }
            Some(_) => {}
        }
        self.frames_read += 1;
        Ok(Some(frame))
    }

    /// 是否存在当前帧 (仅在 Empty 状态为 false)
    pub fn has_current(&self) -> bool {
        self.state != WindowState::Empty
    }

    pub fn state(&self) -> WindowState {
        self.state
    }

    pub fn extent(&self) -> usize {
        self.extent
    }

    /// 视频分辨率 (宽, 高), 空流为 None
    pub fn dimensions(&self) -> Option<(usize, usize)> {
        self.dimensions
    }

    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    /// 缓存的前向帧数
    pub fn forward_len(&self) -> usize {
        if self.frames.is_empty() {
            return 0;
        }
        self.frames.len() - self.cursor - 1
    }

    /// 保留的后向帧数
    pub fn backward_len(&self) -> usize {
        if self.frames.is_empty() {
            return 0;
        }
        self.cursor
    }

    pub fn current(&self) -> Option<&LumaFrame> {
        self.frame_at(0)
    }

    /// 按时间偏移取帧: 0 为当前帧, 正数为前向帧, 负数为后向帧
    pub fn frame_at(&self, offset: isize) -> Option<&LumaFrame> {
        if self.state == WindowState::Empty {
            return None;
        }
        let idx = self.cursor.checked_add_signed(offset)?;
        self.frames.get(idx)
    }

    /// 在指定偏移的帧上按需重建块视图
    pub fn block_at(
        &self,
        pos: Position,
        size: usize,
        offset: isize,
    ) -> Vbm4dResult<PixelBlock<'_>> {
        let frame = self.frame_at(offset).ok_or_else(|| {
            Vbm4dError::InvalidArgument(format!("时间偏移 {offset} 不在帧窗口内"))
        })?;
        PixelBlock::new(pos.x, pos.y, size, frame)
    }

    /// 借出当前 tick 的只读帧视图, Empty 状态返回 None
    pub fn temporal_view(&self) -> Option<TemporalView<'_>> {
        let current = self.current()?;
        let forward = self.frames.range(self.cursor + 1..).collect();
        let backward = self.frames.range(..self.cursor).rev().collect();
        Some(TemporalView {
            current,
            forward,
            backward,
        })
    }

    /// 前进一帧
    ///
    /// 后向帧已满 h 帧时淘汰最旧的一帧, 当前帧前移一位, 再尝试从帧源
    /// 读取一帧补充前向缓存. 前向缓存为空且帧源耗尽时进入 Empty 状态.
    pub fn advance(&mut self) -> Vbm4dResult<()> {
        if !self.has_current() {
            return Err(Vbm4dError::InvalidArgument(
                "帧窗口已结束, 不能继续前进".into(),
            ));
        }

        // h = 0 时前向缓存始终为空, 需要先读入下一帧
        if self.forward_len() == 0 {
            if let Some(frame) = self.pull()? {
                self.frames.push_back(frame);
            }
        }
        if self.forward_len() == 0 {
            self.frames.clear();
            self.cursor = 0;
            self.state = WindowState::Empty;
            info!("帧窗口结束, 共读取 {} 帧", self.frames_read);
            return Ok(());
        }

        if self.cursor == self.extent {
            self.frames.pop_front();
        } else {
            self.cursor += 1;
        }

        if self.forward_len() < self.extent {
            if let Some(frame) = self.pull()? {
                self.frames.push_back(frame);
            }
        }

        self.settle();
        Ok(())
    }

    /// 按帧源是否耗尽确定非空窗口的状态
    ///
    /// 只有前向缓存不满时才会读取帧源, 因此耗尽后前向帧必然少于 h.
    fn settle(&mut self) {
        self.state = if self.exhausted {
            WindowState::Draining
        } else {
            WindowState::Steady
        };
    }
}

/// 单个 tick 内的只读帧视图
///
/// 借用帧窗口, 因此在视图存活期间窗口不能前进.
#[derive(Debug, Clone)]
pub struct TemporalView<'a> {
    current: &'a LumaFrame,
    /// 前向帧, 由近及远
    forward: Vec<&'a LumaFrame>,
    /// 后向帧, 由近及远
    backward: Vec<&'a LumaFrame>,
}

impl<'a> TemporalView<'a> {
    /// 由现成的帧引用构造视图, `forward`/`backward` 均按由近及远排列
    pub fn new(
        current: &'a LumaFrame,
        forward: Vec<&'a LumaFrame>,
        backward: Vec<&'a LumaFrame>,
    ) -> Self {
        Self {
            current,
            forward,
            backward,
        }
    }

    pub fn current(&self) -> &'a LumaFrame {
        self.current
    }

    pub fn frame_at(&self, offset: isize) -> Option<&'a LumaFrame> {
        match offset {
            0 => Some(self.current),
            o if o > 0 => self.forward.get(o as usize - 1).copied(),
            o => self.backward.get(o.unsigned_abs() - 1).copied(),
        }
    }

    pub fn forward_len(&self) -> usize {
        self.forward.len()
    }

    pub fn backward_len(&self) -> usize {
        self.backward.len()
    }

    /// 视图中的全部帧: 当前帧、前向帧、后向帧
    pub fn frames(&self) -> impl Iterator<Item = &'a LumaFrame> + '_ {
        std::iter::once(self.current)
            .chain(self.forward.iter().copied())
            .chain(self.backward.iter().copied())
    }
}
