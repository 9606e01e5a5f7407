//! 亮度帧 (LumaFrame).
//!
//! 解码并归一化后的单平面亮度数据, 行优先存储为 `f32`.
//! 帧在解码后不可变, 只能被整体丢弃.

use crate::error::{Vbm4dError, Vbm4dResult};

/// 归一化亮度帧
#[derive(Debug, Clone, PartialEq)]
pub struct LumaFrame {
    /// 宽度 (像素)
    width: usize,
    /// 高度 (像素)
    height: usize,
    /// 帧序号 (由帧源按读取顺序分配, 从 0 开始)
    index: u64,
    /// 行优先的亮度数据, 长度 = width * height
    data: Vec<f32>,
}

impl LumaFrame {
    /// 由现成的像素数据创建帧
    ///
    /// `data` 长度必须等于 `width * height`, 且宽高不能为 0.
    pub fn new(width: usize, height: usize, index: u64, data: Vec<f32>) -> Vbm4dResult<Self> {
        if width == 0 || height == 0 {
            return Err(Vbm4dError::InvalidArgument(format!(
                "帧尺寸不能为 0: {width}x{height}"
            )));
        }
        if data.len() != width * height {
            return Err(Vbm4dError::InvalidArgument(format!(
                "像素数据长度 {} 与帧尺寸 {width}x{height} 不符",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            index,
            data,
        })
    }

    /// 创建填充常量值的帧
    pub fn filled(width: usize, height: usize, index: u64, value: f32) -> Vbm4dResult<Self> {
        Self::new(width, height, index, vec![value; width * height])
    }

    /// 按坐标函数生成帧, `f(x, y)` 返回该像素亮度
    pub fn from_fn(
        width: usize,
        height: usize,
        index: u64,
        mut f: impl FnMut(usize, usize) -> f32,
    ) -> Vbm4dResult<Self> {
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self::new(width, height, index, data)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// (宽, 高)
    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    /// 读取单个像素, 越界返回 None
    pub fn get(&self, x: usize, y: usize) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.data[y * self.width + x])
    }

    /// 第 `y` 行的全部像素
    ///
    /// # Panics
    /// `y >= height` 时 panic.
    pub fn row(&self, y: usize) -> &[f32] {
        let start = y * self.width;
        &self.data[start..start + self.width]
    }

    /// 全部像素 (行优先)
    pub fn data(&self) -> &[f32] {
        &self.data
    }
}
