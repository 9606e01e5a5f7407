//! # vbm4d-core
//!
//! vbm4d 块匹配框架核心库, 提供错误类型、归一化亮度帧、
//! 原始视频像素格式、块匹配参数以及帧源接口.

pub mod error;
pub mod frame;
pub mod params;
pub mod pixel_format;
pub mod source;

// 重导出常用类型
pub use error::{Vbm4dError, Vbm4dResult};
pub use frame::LumaFrame;
pub use params::{
    BlockMatchingConfig, BlockMatchingOverrides, MAX_EXTENT, Stage, StageOverrides, StageParams,
};
pub use pixel_format::PixelFormat;
pub use source::{FrameSource, MemorySource, RawLumaReader};
