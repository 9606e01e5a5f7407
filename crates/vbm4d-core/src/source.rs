//! 帧源 trait 与内置实现.
//!
//! 帧源是块匹配引擎的解码协作方: 每次调用交出一帧归一化亮度帧,
//! 流结束时返回 `Err(Vbm4dError::Eof)`, 其它错误一律视为解码失败.

use std::collections::VecDeque;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

use log::debug;

use crate::error::{Vbm4dError, Vbm4dResult};
use crate::frame::LumaFrame;
use crate::pixel_format::PixelFormat;

/// 帧源 trait
///
/// # 返回
/// - `Ok(frame)`: 成功取出一帧
/// - `Err(Vbm4dError::Eof)`: 流已结束 (正常终止信号)
/// - 其它 `Err`: 解码失败, 调用方应中止处理
pub trait FrameSource {
    /// 取出下一帧
    fn receive_frame(&mut self) -> Vbm4dResult<LumaFrame>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn receive_frame(&mut self) -> Vbm4dResult<LumaFrame> {
        (**self).receive_frame()
    }
}

/// 内存帧源, 按顺序交出预先准备好的帧
#[derive(Debug, Default)]
pub struct MemorySource {
    frames: VecDeque<LumaFrame>,
}

impl MemorySource {
    pub fn new(frames: impl IntoIterator<Item = LumaFrame>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }

    /// 剩余帧数
    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl FrameSource for MemorySource {
    fn receive_frame(&mut self) -> Vbm4dResult<LumaFrame> {
        self.frames.pop_front().ok_or(Vbm4dError::Eof)
    }
}

/// 原始平面视频读取器
///
/// 从无头部的原始视频流中逐帧读取亮度平面 (平面 0), 跳过其余平面,
/// 并将采样值归一化到 [0, 1).
pub struct RawLumaReader<R: Read> {
    reader: R,
    width: usize,
    height: usize,
    pixel_format: PixelFormat,
    /// 预计算: 亮度平面字节数
    luma_size: usize,
    /// 预计算: 色度平面总字节数 (读取后丢弃)
    chroma_size: usize,
    /// 亮度平面读取缓冲
    buf: Vec<u8>,
    /// 已交出的帧数
    frames_read: u64,
}

impl<R: Read> fmt::Debug for RawLumaReader<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawLumaReader")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("pixel_format", &self.pixel_format)
            .field("frames_read", &self.frames_read)
            .finish_non_exhaustive()
    }
}

impl RawLumaReader<BufReader<File>> {
    /// 打开原始视频文件
    pub fn open(
        path: impl AsRef<Path>,
        width: usize,
        height: usize,
        pixel_format: PixelFormat,
    ) -> Vbm4dResult<Self> {
        let file = File::open(path.as_ref())?;
        Self::new(BufReader::new(file), width, height, pixel_format)
    }
}

impl<R: Read> RawLumaReader<R> {
    /// 创建读取器
    pub fn new(
        reader: R,
        width: usize,
        height: usize,
        pixel_format: PixelFormat,
    ) -> Vbm4dResult<Self> {
        if width == 0 || height == 0 {
            return Err(Vbm4dError::InvalidArgument(format!(
                "宽度和高度不能为 0: {width}x{height}"
            )));
        }
        let (w, h) = (width as u32, height as u32);
        let frame_size = pixel_format
            .frame_size(w, h)
            .ok_or_else(|| Vbm4dError::InvalidArgument(format!("无法计算 {pixel_format} 的帧大小")))?;
        let luma_size = pixel_format
            .plane_linesize(0, w)
            .zip(pixel_format.plane_height(0, h))
            .map(|(ls, ph)| ls * ph)
            .ok_or_else(|| Vbm4dError::InvalidArgument(format!("无法计算 {pixel_format} 的亮度平面大小")))?;

        debug!(
            "打开原始视频读取器: {width}x{height}, 格式={pixel_format}, 帧大小={frame_size}",
        );
        Ok(Self {
            reader,
            width,
            height,
            pixel_format,
            luma_size,
            chroma_size: frame_size - luma_size,
            buf: vec![0u8; luma_size],
            frames_read: 0,
        })
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn pixel_format(&self) -> PixelFormat {
        self.pixel_format
    }

    /// 尽量填满缓冲区, 返回实际读取的字节数 (小于长度表示流结束)
    fn fill(reader: &mut R, buf: &mut [u8]) -> Vbm4dResult<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(filled)
    }

    fn skip_chroma(&mut self) -> Vbm4dResult<()> {
        if self.chroma_size == 0 {
            return Ok(());
        }
        let skipped = std::io::copy(
            &mut (&mut self.reader).take(self.chroma_size as u64),
            &mut std::io::sink(),
        )?;
        if skipped != self.chroma_size as u64 {
            return Err(Vbm4dError::Decode(format!(
                "第 {} 帧色度平面被截断: 需要 {} 字节, 实际 {skipped}",
                self.frames_read, self.chroma_size
            )));
        }
        Ok(())
    }

    fn normalize(&self) -> Vec<f32> {
        let scale = self.pixel_format.luma_scale();
        match self.pixel_format.bytes_per_sample() {
            1 => self.buf.iter().map(|&v| v as f32 * scale).collect(),
            _ => self
                .buf
                .chunks_exact(2)
                .map(|c| u16::from_le_bytes([c[0], c[1]]) as f32 * scale)
                .collect(),
        }
    }
}

impl<R: Read> FrameSource for RawLumaReader<R> {
    fn receive_frame(&mut self) -> Vbm4dResult<LumaFrame> {
        let got = Self::fill(&mut self.reader, &mut self.buf)?;
        if got == 0 {
            return Err(Vbm4dError::Eof);
        }
        if got < self.luma_size {
            return Err(Vbm4dError::Decode(format!(
                "第 {} 帧亮度平面被截断: 需要 {} 字节, 实际 {got}",
                self.frames_read, self.luma_size
            )));
        }
        self.skip_chroma()?;

        let data = self.normalize();
        let frame = LumaFrame::new(self.width, self.height, self.frames_read, data)?;
        self.frames_read += 1;
        Ok(frame)
    }
}
