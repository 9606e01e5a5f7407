//! 统一错误类型定义.
//!
//! 所有 vbm4d crate 共用的错误类型. 无匹配 (NoMatch) 不是错误,
//! 在轨迹中以 `None` 表示; 流结束 (`Eof`) 只出现在帧源边界上.

use thiserror::Error;

/// vbm4d 统一错误类型
#[derive(Debug, Error)]
pub enum Vbm4dError {
    /// 无效参数
    #[error("无效参数: {0}")]
    InvalidArgument(String),

    /// 块或搜索窗口超出帧范围 (配置错误, 应在启动时校验)
    #[error("超出帧范围: {0}")]
    OutOfBounds(String),

    /// 解码失败 (损坏的帧、尺寸不一致等), 致命
    #[error("解码失败: {0}")]
    Decode(String),

    /// I/O 错误
    #[error("I/O 错误: {0}")]
    Io(#[from] std::io::Error),

    /// 已到达流末尾
    #[error("已到达流末尾")]
    Eof,
}

impl Vbm4dError {
    /// 是否为流结束信号
    pub fn is_eof(&self) -> bool {
        matches!(self, Self::Eof)
    }
}

/// vbm4d 统一 Result 类型
pub type Vbm4dResult<T> = Result<T, Vbm4dError>;
