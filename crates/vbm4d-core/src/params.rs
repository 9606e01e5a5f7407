//! 块匹配参数.
//!
//! 每个处理阶段 (硬阈值阶段与维纳阶段) 各自携带一份独立的 [`StageParams`],
//! 两者之间除共用算法外没有任何耦合. 参数在启动时针对视频分辨率校验一次,
//! 之后以只读值的形式传入帧窗口、搜索器和体构建器.

use serde::{Deserialize, Serialize};

use crate::error::{Vbm4dError, Vbm4dResult};

/// 时间延伸 h 的上限
pub const MAX_EXTENT: usize = 1024;

/// 单个阶段的块匹配参数
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StageParams {
    /// 块边长 N
    pub block_size: usize,
    /// 时间延伸 h: 在 [t-h, t+h] 帧范围内构建轨迹
    pub extent: usize,
    /// 参考块网格步长 S
    pub step: usize,
    /// 速度预测系数 γp
    pub gamma_p: f64,
    /// 位移惩罚系数 γd
    pub gamma_d: f64,
    /// 搜索窗口尺寸 Ns
    pub search_size: usize,
    /// 搜索窗口缩放系数 γw
    pub gamma_w: f64,
    /// 搜索窗口调节参数 σw
    pub sigma_w: f64,
    /// 块相似度阈值 τ_traj, 得分严格小于该值才算匹配
    pub tau_traj: f64,
}

impl StageParams {
    /// 硬阈值阶段默认参数, γd 与 τ_traj 由噪声标准差推导
    pub fn hard_threshold(sigma: f64) -> Self {
        Self {
            block_size: 8,
            extent: 4,
            step: 6,
            gamma_p: 0.3,
            gamma_d: 0.0005 * sigma * sigma - 0.0059 * sigma + 0.04,
            search_size: 11,
            gamma_w: 0.5,
            sigma_w: 1.0,
            tau_traj: 0.0047 * sigma * sigma + 0.0676 * sigma + 0.4564,
        }
    }

    /// 维纳阶段默认参数
    pub fn wiener() -> Self {
        Self {
            block_size: 7,
            extent: 4,
            step: 4,
            gamma_p: 0.3,
            gamma_d: 0.005,
            search_size: 11,
            gamma_w: 0.5,
            sigma_w: 1.0,
            tau_traj: 1.0,
        }
    }

    /// 针对视频分辨率校验参数
    ///
    /// 块尺寸超出帧为 [`Vbm4dError::OutOfBounds`], 其余非法值为
    /// [`Vbm4dError::InvalidArgument`].
    pub fn validate(&self, width: usize, height: usize) -> Vbm4dResult<()> {
        self.validate_settings()?;
        if self.block_size > width || self.block_size > height {
            return Err(Vbm4dError::OutOfBounds(format!(
                "块尺寸 {} 超出帧大小 {width}x{height}",
                self.block_size
            )));
        }
        Ok(())
    }

    /// 校验与分辨率无关的参数, 在读取任何帧之前即可调用
    pub fn validate_settings(&self) -> Vbm4dResult<()> {
        if self.block_size == 0 {
            return Err(Vbm4dError::OutOfBounds("块尺寸不能为 0".into()));
        }
        if self.extent > MAX_EXTENT {
            return Err(Vbm4dError::InvalidArgument(format!(
                "时间延伸 {} 超过上限 {MAX_EXTENT}",
                self.extent
            )));
        }
        if self.step == 0 {
            return Err(Vbm4dError::InvalidArgument("网格步长不能为 0".into()));
        }
        if self.search_size == 0 {
            return Err(Vbm4dError::InvalidArgument("搜索窗口尺寸不能为 0".into()));
        }
        if !(self.sigma_w.is_finite() && self.sigma_w > 0.0) {
            return Err(Vbm4dError::InvalidArgument(format!(
                "sigma_w 必须为正数, 实际为 {}",
                self.sigma_w
            )));
        }
        let coefficients = [
            ("gamma_p", self.gamma_p),
            ("gamma_d", self.gamma_d),
            ("gamma_w", self.gamma_w),
        ];
        for (name, value) in coefficients {
            if !value.is_finite() || value < 0.0 {
                return Err(Vbm4dError::InvalidArgument(format!(
                    "{name} 必须为非负有限值, 实际为 {value}"
                )));
            }
        }
        if self.tau_traj.is_nan() {
            return Err(Vbm4dError::InvalidArgument("tau_traj 不能为 NaN".into()));
        }
        Ok(())
    }

    /// 在当前参数上叠加覆盖项
    pub fn with_overrides(mut self, o: &StageOverrides) -> Self {
        if let Some(v) = o.block_size {
            self.block_size = v;
        }
        if let Some(v) = o.extent {
            self.extent = v;
        }
        if let Some(v) = o.step {
            self.step = v;
        }
        if let Some(v) = o.gamma_p {
            self.gamma_p = v;
        }
        if let Some(v) = o.gamma_d {
            self.gamma_d = v;
        }
        if let Some(v) = o.search_size {
            self.search_size = v;
        }
        if let Some(v) = o.gamma_w {
            self.gamma_w = v;
        }
        if let Some(v) = o.sigma_w {
            self.sigma_w = v;
        }
        if let Some(v) = o.tau_traj {
            self.tau_traj = v;
        }
        self
    }
}

/// 单阶段参数的部分覆盖 (来自配置文件或命令行)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StageOverrides {
    pub block_size: Option<usize>,
    pub extent: Option<usize>,
    pub step: Option<usize>,
    pub gamma_p: Option<f64>,
    pub gamma_d: Option<f64>,
    pub search_size: Option<usize>,
    pub gamma_w: Option<f64>,
    pub sigma_w: Option<f64>,
    pub tau_traj: Option<f64>,
}

/// 两个阶段的覆盖项
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BlockMatchingOverrides {
    pub hard_threshold: StageOverrides,
    pub wiener: StageOverrides,
}

/// 处理阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// 硬阈值 (初始粗处理) 阶段
    #[default]
    HardThreshold,
    /// 维纳 (精化) 阶段
    Wiener,
}

/// 完整块匹配配置: 每个阶段一份独立参数
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlockMatchingConfig {
    pub hard_threshold: StageParams,
    pub wiener: StageParams,
}

impl BlockMatchingConfig {
    /// 按加性高斯白噪声标准差生成默认配置
    pub fn for_noise(sigma: f64) -> Self {
        Self {
            hard_threshold: StageParams::hard_threshold(sigma),
            wiener: StageParams::wiener(),
        }
    }

    /// 取出指定阶段的参数
    pub fn stage(&self, stage: Stage) -> &StageParams {
        match stage {
            Stage::HardThreshold => &self.hard_threshold,
            Stage::Wiener => &self.wiener,
        }
    }

    /// 叠加两个阶段的覆盖项
    pub fn with_overrides(self, o: &BlockMatchingOverrides) -> Self {
        Self {
            hard_threshold: self.hard_threshold.with_overrides(&o.hard_threshold),
            wiener: self.wiener.with_overrides(&o.wiener),
        }
    }
}
