//! vbm4d-cli - 运动轨迹块匹配命令行工具
//!
//! 读取原始视频文件的亮度平面, 逐帧计算参考网格上每个位置的时空轨迹,
//! 打印每个 tick 的匹配统计.

mod config;
mod logging;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};

use vbm4d_core::{PixelFormat, RawLumaReader, Stage, StageOverrides};
use vbm4d_match::TrajectoryEngine;

use config::{load_overrides, parse_size, resolve_params};

/// 处理阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StageArg {
    /// 硬阈值阶段
    Ht,
    /// 维纳阶段
    Wiener,
}

impl From<StageArg> for Stage {
    fn from(s: StageArg) -> Self {
        match s {
            StageArg::Ht => Stage::HardThreshold,
            StageArg::Wiener => Stage::Wiener,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "vbm4d-cli", version, about = "V-BM4D 运动轨迹块匹配工具")]
struct Cli {
    /// 输入原始视频文件路径
    #[arg(short, long)]
    input: PathBuf,

    /// 视频分辨率 (如 "352x288")
    #[arg(long)]
    size: String,

    /// 像素格式 (gray8, gray16le, yuv420p, yuv422p, yuv444p, yuv420p10le, nv12)
    #[arg(long = "pix-fmt", default_value = "gray8")]
    pix_fmt: PixelFormat,

    /// 噪声标准差 (8 位刻度)
    #[arg(short, long, default_value_t = 20.0)]
    sigma: f64,

    /// 使用哪个阶段的参数
    #[arg(long, value_enum, default_value_t = StageArg::Ht)]
    stage: StageArg,

    /// JSON 参数文件
    #[arg(long)]
    config: Option<PathBuf>,

    /// 块尺寸 N
    #[arg(long = "block-size")]
    block_size: Option<usize>,

    /// 时间延伸 h
    #[arg(long)]
    extent: Option<usize>,

    /// 网格步长 S
    #[arg(long)]
    step: Option<usize>,

    /// 轨迹匹配阈值 τ_traj
    #[arg(long = "tau-traj")]
    tau_traj: Option<f64>,

    /// 最多处理的 tick 数
    #[arg(long = "max-ticks")]
    max_ticks: Option<u64>,

    /// 串行计算网格位置
    #[arg(long)]
    sequential: bool,

    /// 日志级别 (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn flag_overrides(&self) -> StageOverrides {
        StageOverrides {
            block_size: self.block_size,
            extent: self.extent,
            step: self.step,
            tau_traj: self.tau_traj,
            ..StageOverrides::default()
        }
    }
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = logging::init("vbm4d-cli", cli.verbose) {
        eprintln!("警告: 日志初始化失败: {e:#}");
    }

    if let Err(e) = run(&cli) {
        tracing::error!("{e:#}");
        eprintln!("错误: {e:#}");
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let (width, height) = parse_size(&cli.size)?;
    let file_overrides = cli.config.as_deref().map(load_overrides).transpose()?;
    let params = resolve_params(
        cli.sigma,
        cli.stage.into(),
        file_overrides.as_ref(),
        &cli.flag_overrides(),
    )?;
    tracing::info!("阶段 {:?} 参数: {params:?}", cli.stage);

    let source = RawLumaReader::open(&cli.input, width, height, cli.pix_fmt)
        .with_context(|| format!("无法打开输入文件 '{}'", cli.input.display()))?;
    let mut engine = TrajectoryEngine::new(source, params)
        .context("初始化轨迹计算失败")?
        .with_parallel(!cli.sequential);

    eprintln!(
        "vbm4d-cli 版本 {} -- 输入: {} ({width}x{height} {})",
        env!("CARGO_PKG_VERSION"),
        cli.input.display(),
        cli.pix_fmt,
    );

    let cancel = AtomicBool::new(false);
    let summary = engine
        .run(&cancel, |tick| {
            println!(
                "tick {:>5}  帧 #{:<6} 轨迹 {:>6}  前向 {:>7}  后向 {:>7}  平均长度 {:.3}",
                tick.tick,
                tick.frame.index(),
                tick.stats.trajectories,
                tick.stats.forward_matches,
                tick.stats.backward_matches,
                tick.stats.mean_length(),
            );
            if cli.max_ticks.is_some_and(|max| tick.tick + 1 >= max) {
                cancel.store(true, Ordering::Relaxed);
            }
            Ok(())
        })
        .context("轨迹计算失败")?;

    println!(
        "完成: {} 个 tick{}, 前向匹配 {}, 后向匹配 {}, 完整轨迹 {}, 平均长度 {:.3}",
        summary.ticks,
        if summary.cancelled { " (提前停止)" } else { "" },
        summary.forward_matches,
        summary.backward_matches,
        summary.complete,
        summary.mean_length(),
    );
    Ok(())
}
