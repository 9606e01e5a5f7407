//! 像素块视图与相似度度量.
//!
//! [`PixelBlock`] 只借用所在帧的数据, 不复制像素.

use std::fmt;

use vbm4d_core::{LumaFrame, Vbm4dError, Vbm4dResult};

/// 帧内整数坐标 (块左上角)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Position {
    pub x: usize,
    pub y: usize,
}

impl Position {
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    /// 到另一坐标的欧氏距离
    pub fn distance(&self, other: Position) -> f64 {
        let dx = self.x as f64 - other.x as f64;
        let dy = self.y as f64 - other.y as f64;
        (dx * dx + dy * dy).sqrt()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// 方形像素块视图
#[derive(Debug, Clone, Copy)]
pub struct PixelBlock<'a> {
    x: usize,
    y: usize,
    size: usize,
    frame: &'a LumaFrame,
}

impl<'a> PixelBlock<'a> {
    /// 创建块视图, 矩形超出帧范围时返回 [`Vbm4dError::OutOfBounds`]
    pub fn new(x: usize, y: usize, size: usize, frame: &'a LumaFrame) -> Vbm4dResult<Self> {
        let fits = size > 0
            && x.checked_add(size).is_some_and(|r| r <= frame.width())
            && y.checked_add(size).is_some_and(|b| b <= frame.height());
        if !fits {
            return Err(Vbm4dError::OutOfBounds(format!(
                "块 ({x}, {y}) 尺寸 {size} 超出帧大小 {}x{}",
                frame.width(),
                frame.height()
            )));
        }
        Ok(Self { x, y, size, frame })
    }

    /// 创建调用方已保证在帧内的块视图
    pub(crate) fn new_unchecked(pos: Position, size: usize, frame: &'a LumaFrame) -> Self {
        debug_assert!(pos.x + size <= frame.width() && pos.y + size <= frame.height());
        Self {
            x: pos.x,
            y: pos.y,
            size,
            frame,
        }
    }

    pub fn x(&self) -> usize {
        self.x
    }

    pub fn y(&self) -> usize {
        self.y
    }

    pub fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn frame(&self) -> &'a LumaFrame {
        self.frame
    }

    /// 块内第 `r` 行像素
    pub fn row(&self, r: usize) -> &'a [f32] {
        &self.frame.row(self.y + r)[self.x..self.x + self.size]
    }

    /// 逐像素差值平方和
    ///
    /// # Panics
    /// 两个块尺寸不同时 panic.
    pub fn squared_difference(&self, other: &PixelBlock<'_>) -> f64 {
        assert_eq!(
            self.size, other.size,
            "块尺寸不一致: {} vs {}",
            self.size, other.size
        );
        let mut sum = 0.0f64;
        for r in 0..self.size {
            for (a, b) in self.row(r).iter().zip(other.row(r)) {
                let d = (*a - *b) as f64;
                sum += d * d;
            }
        }
        sum
    }

    /// 按像素数归一化的差值平方和 (squared_difference / size²)
    pub fn normalized_squared_difference(&self, other: &PixelBlock<'_>) -> f64 {
        self.squared_difference(other) / (self.size * self.size) as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(w: usize, h: usize) -> LumaFrame {
        LumaFrame::from_fn(w, h, 0, |x, y| (x + 2 * y) as f32 / 64.0).unwrap()
    }

    #[test]
    fn test_创建_边界检查() {
        let frame = gradient(16, 12);
        for size in 1..=12 {
            for y in 0..=12 {
                for x in 0..=16 {
                    let ok = x + size <= 16 && y + size <= 12;
                    let res = PixelBlock::new(x, y, size, &frame);
                    assert_eq!(res.is_ok(), ok, "x={x} y={y} size={size}");
                    if !ok {
                        assert!(matches!(res, Err(Vbm4dError::OutOfBounds(_))));
                    }
                }
            }
        }
        assert!(PixelBlock::new(0, 0, 0, &frame).is_err());
        assert!(PixelBlock::new(usize::MAX, 0, 2, &frame).is_err());
    }

    #[test]
    fn test_差值平方和_对称且自身为零() {
        let frame = gradient(16, 16);
        let a = PixelBlock::new(1, 2, 4, &frame).unwrap();
        let b = PixelBlock::new(5, 3, 4, &frame).unwrap();
        assert_eq!(a.squared_difference(&a), 0.0);
        let ab = a.squared_difference(&b);
        assert!(ab > 0.0);
        assert_eq!(ab, b.squared_difference(&a));
    }

    #[test]
    fn test_不同帧相同内容_差值为零() {
        let f0 = gradient(8, 8);
        let f1 = gradient(8, 8);
        let a = PixelBlock::new(2, 2, 4, &f0).unwrap();
        let b = PixelBlock::new(2, 2, 4, &f1).unwrap();
        assert_eq!(a.squared_difference(&b), 0.0);
    }

    #[test]
    fn test_归一化差值() {
        let f0 = LumaFrame::filled(4, 4, 0, 0.0).unwrap();
        let f1 = LumaFrame::filled(4, 4, 1, 0.5).unwrap();
        let a = PixelBlock::new(0, 0, 4, &f0).unwrap();
        let b = PixelBlock::new(0, 0, 4, &f1).unwrap();
        assert_eq!(a.squared_difference(&b), 16.0 * 0.25);
        assert_eq!(a.normalized_squared_difference(&b), 0.25);
    }

    #[test]
    #[should_panic(expected = "块尺寸不一致")]
    fn test_尺寸不一致_panic() {
        let frame = gradient(8, 8);
        let a = PixelBlock::new(0, 0, 4, &frame).unwrap();
        let b = PixelBlock::new(0, 0, 3, &frame).unwrap();
        a.squared_difference(&b);
    }

    #[test]
    fn test_距离() {
        assert_eq!(Position::new(0, 0).distance(Position::new(3, 4)), 5.0);
        assert_eq!(Position::new(7, 2).distance(Position::new(7, 2)), 0.0);
    }
}
