//! 命令行参数解析辅助: 分辨率字符串与参数合并.
//!
//! 参数优先级: 命令行单项参数 > `--config` JSON 文件 > 按噪声推导的默认值.

use anyhow::{Context, Result, bail};
use std::path::Path;

use vbm4d_core::{BlockMatchingConfig, BlockMatchingOverrides, Stage, StageOverrides, StageParams};

/// 解析分辨率字符串 (如 "352x288")
pub(crate) fn parse_size(s: &str) -> Result<(usize, usize)> {
    let Some((w, h)) = s.split_once(['x', 'X']) else {
        bail!("分辨率格式应为 WxH: {s}");
    };
    let width: usize = w.trim().parse().with_context(|| format!("无效宽度: {w}"))?;
    let height: usize = h.trim().parse().with_context(|| format!("无效高度: {h}"))?;
    if width == 0 || height == 0 {
        bail!("分辨率不能为 0: {s}");
    }
    Ok((width, height))
}

/// 读取 JSON 覆盖配置
pub(crate) fn load_overrides(path: &Path) -> Result<BlockMatchingOverrides> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("读取配置文件失败: {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("解析配置文件失败: {}", path.display()))
}

/// 合并默认值、配置文件与命令行覆盖项, 得到指定阶段的参数
pub(crate) fn resolve_params(
    sigma: f64,
    stage: Stage,
    file: Option<&BlockMatchingOverrides>,
    flags: &StageOverrides,
) -> Result<StageParams> {
    if !sigma.is_finite() || sigma < 0.0 {
        bail!("噪声标准差必须为非负有限值: {sigma}");
    }
    let mut config = BlockMatchingConfig::for_noise(sigma);
    if let Some(file) = file {
        config = config.with_overrides(file);
    }
    Ok(config.stage(stage).with_overrides(flags))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_解析分辨率() {
        assert_eq!(parse_size("352x288").unwrap(), (352, 288));
        assert_eq!(parse_size("64X48").unwrap(), (64, 48));
        assert!(parse_size("352").is_err());
        assert!(parse_size("0x288").is_err());
        assert!(parse_size("axb").is_err());
    }

    #[test]
    fn test_参数优先级() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"hard_threshold": {{"block_size": 4, "extent": 2}}, "wiener": {{"step": 2}}}}"#
        )
        .unwrap();
        let overrides = load_overrides(file.path()).unwrap();

        let flags = StageOverrides {
            extent: Some(3),
            ..StageOverrides::default()
        };
        let p = resolve_params(20.0, Stage::HardThreshold, Some(&overrides), &flags).unwrap();
        assert_eq!(p.block_size, 4);
        assert_eq!(p.extent, 3);
        assert_eq!(p.step, 6);
        assert_eq!(p.tau_traj, StageParams::hard_threshold(20.0).tau_traj);

        let w = resolve_params(20.0, Stage::Wiener, Some(&overrides), &flags).unwrap();
        assert_eq!(w.step, 2);
        assert_eq!(w.block_size, 7);
    }

    #[test]
    fn test_配置文件_未知字段报错() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"hard_threshold": {{"blocksize": 4}}}}"#).unwrap();
        assert!(load_overrides(file.path()).is_err());
        assert!(load_overrides(Path::new("/nonexistent/vbm4d.json")).is_err());
    }

    #[test]
    fn test_非法噪声() {
        let flags = StageOverrides::default();
        assert!(resolve_params(-1.0, Stage::Wiener, None, &flags).is_err());
        assert!(resolve_params(f64::NAN, Stage::Wiener, None, &flags).is_err());
    }
}
