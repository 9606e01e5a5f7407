//! # vbm4d
//!
//! 纯 Rust 实现的 V-BM4D 视频去噪前端: 运动轨迹块匹配.
//!
//! 对每一帧, 在规则参考网格的每个位置上沿运动路径向前、向后各追踪最多 h 帧,
//! 得到一组时空轨迹, 供后续分组与协同滤波阶段使用.
//!
//! # 快速开始
//!
//! ```rust
//! use std::sync::atomic::AtomicBool;
//! use vbm4d::core::{LumaFrame, MemorySource, StageParams};
//! use vbm4d::matching::TrajectoryEngine;
//!
//! let frames = (0..3).map(|t| LumaFrame::filled(16, 16, t, 0.5).unwrap());
//! let params = StageParams { block_size: 4, step: 4, ..StageParams::wiener() };
//! let mut engine = TrajectoryEngine::new(MemorySource::new(frames), params).unwrap();
//! let summary = engine.run(&AtomicBool::new(false), |_| Ok(())).unwrap();
//! assert_eq!(summary.ticks, 3);
//! ```
//!
//! # Crate 结构
//!
//! | Crate | 功能 |
//! |-------|------|
//! | `vbm4d-core` | 错误类型、亮度帧、像素格式、参数与帧源 |
//! | `vbm4d-match` | 帧窗口、预测搜索、体构建与轨迹引擎 |

/// 核心类型与帧源
pub use vbm4d_core as core;

/// 运动轨迹块匹配
pub use vbm4d_match as matching;

/// 获取 vbm4d 版本号
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
