//! 原始视频像素格式.
//!
//! 仅覆盖能直接取出亮度平面的格式: 灰度与 Y 平面在前的 YUV 布局.
//! 读取时只使用平面 0, 其余平面按字节数跳过.

use std::fmt;
use std::str::FromStr;

use crate::error::Vbm4dError;

/// 像素格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PixelFormat {
    /// 灰度 8 位
    #[default]
    Gray8,
    /// 灰度 16 位小端
    Gray16le,
    /// YUV 4:2:0 平面格式, 8 位
    Yuv420p,
    /// YUV 4:2:2 平面格式, 8 位
    Yuv422p,
    /// YUV 4:4:4 平面格式, 8 位
    Yuv444p,
    /// YUV 4:2:0 平面格式, 10 位小端 (16 位容器)
    Yuv420p10le,
    /// NV12: Y 平面 + UV 交错, 4:2:0, 8 位
    Nv12,
}

impl PixelFormat {
    /// 亮度分量位深
    pub const fn bits_per_component(&self) -> u32 {
        match self {
            Self::Gray8 | Self::Yuv420p | Self::Yuv422p | Self::Yuv444p | Self::Nv12 => 8,
            Self::Yuv420p10le => 10,
            Self::Gray16le => 16,
        }
    }

    /// 每个亮度采样占用的字节数
    pub const fn bytes_per_sample(&self) -> usize {
        if self.bits_per_component() > 8 { 2 } else { 1 }
    }

    /// 采样值到 [0, 1) 的归一化系数 (1 / 2^位深)
    pub fn luma_scale(&self) -> f32 {
        1.0 / (1u32 << self.bits_per_component()) as f32
    }

    /// 获取色度子采样 (log2 水平, log2 垂直)
    pub const fn chroma_subsampling(&self) -> (u32, u32) {
        match self {
            Self::Yuv420p | Self::Yuv420p10le | Self::Nv12 => (1, 1),
            Self::Yuv422p => (1, 0),
            _ => (0, 0),
        }
    }

    /// 平面数量
    pub const fn plane_count(&self) -> u32 {
        match self {
            Self::Gray8 | Self::Gray16le => 1,
            Self::Nv12 => 2,
            Self::Yuv420p | Self::Yuv422p | Self::Yuv444p | Self::Yuv420p10le => 3,
        }
    }

    /// 计算指定平面每行的字节数, 平面索引越界返回 None
    pub fn plane_linesize(&self, plane: usize, width: u32) -> Option<usize> {
        if plane >= self.plane_count() as usize {
            return None;
        }
        let w = width as usize;
        let bps = self.bytes_per_sample();
        if plane == 0 {
            return Some(w * bps);
        }
        let (sub_h, _) = self.chroma_subsampling();
        let chroma_w = ceil_shift(w, sub_h);
        Some(match self {
            // plane1: ceil(w/2) 个 UV 对
            Self::Nv12 => chroma_w * 2,
            _ => chroma_w * bps,
        })
    }

    /// 计算指定平面的行数, 平面索引越界返回 None
    pub fn plane_height(&self, plane: usize, height: u32) -> Option<usize> {
        if plane >= self.plane_count() as usize {
            return None;
        }
        let h = height as usize;
        if plane == 0 {
            return Some(h);
        }
        let (_, sub_v) = self.chroma_subsampling();
        Some(ceil_shift(h, sub_v))
    }

    /// 计算整帧的字节数
    pub fn frame_size(&self, width: u32, height: u32) -> Option<usize> {
        let mut total = 0usize;
        for plane in 0..self.plane_count() as usize {
            let linesize = self.plane_linesize(plane, width)?;
            let plane_h = self.plane_height(plane, height)?;
            total += linesize * plane_h;
        }
        Some(total)
    }
}

/// 子采样后的尺寸, 奇数尺寸向上取整
const fn ceil_shift(len: usize, shift: u32) -> usize {
    (len + (1 << shift) - 1) >> shift
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Gray8 => "gray8",
            Self::Gray16le => "gray16le",
            Self::Yuv420p => "yuv420p",
            Self::Yuv422p => "yuv422p",
            Self::Yuv444p => "yuv444p",
            Self::Yuv420p10le => "yuv420p10le",
            Self::Nv12 => "nv12",
        };
        write!(f, "{name}")
    }
}

impl FromStr for PixelFormat {
    type Err = Vbm4dError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gray" | "gray8" => Ok(Self::Gray8),
            "gray16le" => Ok(Self::Gray16le),
            "yuv420p" => Ok(Self::Yuv420p),
            "yuv422p" => Ok(Self::Yuv422p),
            "yuv444p" => Ok(Self::Yuv444p),
            "yuv420p10le" => Ok(Self::Yuv420p10le),
            "nv12" => Ok(Self::Nv12),
            other => Err(Vbm4dError::InvalidArgument(format!(
                "不支持的像素格式: {other}"
            ))),
        }
    }
}
