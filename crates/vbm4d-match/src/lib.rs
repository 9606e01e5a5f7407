//! # vbm4d-match
//!
//! V-BM4D 的运动轨迹块匹配.
//!
//! 对参考网格上的每个位置, 沿预测运动路径在前后各 h 帧内逐帧搜索相似块,
//! 得到一条时空轨迹. 每个 tick 的全部轨迹组成一个 [`GridIndex`],
//! 供后续分组/变换阶段使用.
//!
//! ```rust,no_run
//! use std::sync::atomic::AtomicBool;
//! use vbm4d_core::{BlockMatchingConfig, PixelFormat, RawLumaReader, Stage};
//! use vbm4d_match::TrajectoryEngine;
//!
//! # fn main() -> vbm4d_core::Vbm4dResult<()> {
//! let source = RawLumaReader::open("input.yuv", 352, 288, PixelFormat::Yuv420p)?;
//! let params = *BlockMatchingConfig::for_noise(20.0).stage(Stage::HardThreshold);
//! let mut engine = TrajectoryEngine::new(source, params)?;
//! engine.run(&AtomicBool::new(false), |tick| {
//!     println!("帧 #{}: {} 条轨迹", tick.frame.index(), tick.index.len());
//!     Ok(())
//! })?;
//! # Ok(())
//! # }
//! ```

pub mod block;
pub mod engine;
pub mod grid;
pub mod search;
pub mod trajectory;
pub mod volume;
pub mod window;

pub use block::{PixelBlock, Position};
pub use engine::{RunSummary, TickReport, TrajectoryEngine};
pub use grid::ReferenceGrid;
pub use search::{BlockMatch, SearchWindow, TrajectorySearch, Velocity};
pub use trajectory::{Direction, GridIndex, Trajectory, TrajectoryStats};
pub use volume::VolumeBuilder;
pub use window::{FrameWindow, TemporalView, WindowState};
