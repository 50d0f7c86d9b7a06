// crates/spm_io/src/store.rs

//! 轨迹二进制存储
//!
//! 分帧追加写入，每帧独立校验和，帧落盘后立即 flush：
//! 中途崩溃最多丢失当前未完成的帧。
//!
//! # 文件格式 (v1)
//!
//! ```text
//! [魔数: 4 bytes] "SPMT"
//! [版本: u32]
//! [nx: u64] [ny: u64] [组分数: u64] [粒子数: u64]
//! 逐帧:
//!   [帧标记: 4 bytes] "FRAM"
//!   [帧序号: u64]
//!   [负载长度: u64]
//!   [负载: 按数据集顺序的小端 f64 流]
//!   [CRC32: u32]（仅负载）
//! ```
//!
//! 负载内数据集顺序固定：time、u、phi、epsilon、R、Q、V、O、
//! Force_h、Torque_h、concentration、c_sum、free_charge、
//! bound_charge、potential、efield、body_force。
//! 复数按 (re, im) 两个 f64 展开，场按行主序展开。

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use ndarray::Array2;
use num_complex::Complex64;
use tracing::debug;

use spm_spectral::profile::ForceTorque;
use spm_spectral::{ScalarField, VectorField};

use crate::error::{StoreError, StoreResult};
use crate::frame::{FrameRecord, StoreMeta};

/// 轨迹文件魔数
const STORE_MAGIC: &[u8; 4] = b"SPMT";

/// 帧标记
const FRAME_MAGIC: &[u8; 4] = b"FRAM";

/// 文件格式版本
const STORE_VERSION: u32 = 1;

// ============================================================
// 写入端
// ============================================================

/// 轨迹写入器
pub struct TrajectoryWriter {
    writer: BufWriter<File>,
    meta: StoreMeta,
    frames_written: u64,
}

impl TrajectoryWriter {
    /// 创建轨迹文件并写入文件头
    pub fn create(path: &Path, meta: StoreMeta) -> StoreResult<Self> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(STORE_MAGIC)?;
        writer.write_all(&STORE_VERSION.to_le_bytes())?;
        writer.write_all(&(meta.nx as u64).to_le_bytes())?;
        writer.write_all(&(meta.ny as u64).to_le_bytes())?;
        writer.write_all(&(meta.n_species as u64).to_le_bytes())?;
        writer.write_all(&(meta.n_particles as u64).to_le_bytes())?;
        writer.flush()?;
        Ok(Self { writer, meta, frames_written: 0 })
    }

    /// 元信息
    pub fn meta(&self) -> &StoreMeta {
        &self.meta
    }

    /// 已写入帧数
    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// 追加一帧并落盘
    pub fn append(&mut self, frame: &FrameRecord) -> StoreResult<()> {
        frame.check_shapes(&self.meta)?;

        let mut payload = Vec::new();
        push_f64(&mut payload, frame.time);
        push_vector(&mut payload, &frame.u);
        for v in frame.phi.iter() {
            push_f64(&mut payload, *v);
        }
        push_scalar(&mut payload, &frame.epsilon);
        push_pairs(&mut payload, &frame.positions);
        push_pairs(&mut payload, &frame.orientations);
        push_pairs(&mut payload, &frame.velocities);
        for v in &frame.omegas {
            push_f64(&mut payload, *v);
        }
        for ft in &frame.force_rates {
            push_f64(&mut payload, ft.force[0]);
            push_f64(&mut payload, ft.force[1]);
        }
        for ft in &frame.force_rates {
            push_f64(&mut payload, ft.torque);
        }
        for c in &frame.concentrations {
            push_scalar(&mut payload, c);
        }
        push_complex(&mut payload, frame.c_total);
        push_scalar(&mut payload, &frame.free_charge);
        push_scalar(&mut payload, &frame.bound_charge);
        push_scalar(&mut payload, &frame.potential);
        push_vector(&mut payload, &frame.efield);
        push_vector(&mut payload, &frame.body_force);

        self.writer.write_all(FRAME_MAGIC)?;
        self.writer.write_all(&self.frames_written.to_le_bytes())?;
        self.writer.write_all(&(payload.len() as u64).to_le_bytes())?;
        self.writer.write_all(&payload)?;
        self.writer.write_all(&crc32(&payload).to_le_bytes())?;
        self.writer.flush()?;

        self.frames_written += 1;
        debug!(frame = self.frames_written, bytes = payload.len(), "帧已落盘");
        Ok(())
    }
}

// ============================================================
// 读取端
// ============================================================

/// 轨迹读取器（顺序遍历）
#[derive(Debug)]
pub struct TrajectoryReader {
    reader: BufReader<File>,
    meta: StoreMeta,
    next_index: u64,
}

impl TrajectoryReader {
    /// 打开轨迹文件并校验文件头
    pub fn open(path: &Path) -> StoreResult<Self> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);

        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if &magic != STORE_MAGIC {
            return Err(StoreError::Format("魔数不匹配".into()));
        }
        let version = read_u32(&mut reader)?;
        if version > STORE_VERSION {
            return Err(StoreError::Version { file: version, current: STORE_VERSION });
        }
        let nx = read_u64(&mut reader)? as usize;
        let ny = read_u64(&mut reader)? as usize;
        let n_species = read_u64(&mut reader)? as usize;
        let n_particles = read_u64(&mut reader)? as usize;
        if nx == 0 || ny == 0 || n_species == 0 {
            return Err(StoreError::Format("文件头尺寸非法".into()));
        }

        Ok(Self {
            reader,
            meta: StoreMeta { nx, ny, n_species, n_particles },
            next_index: 0,
        })
    }

    /// 元信息
    pub fn meta(&self) -> &StoreMeta {
        &self.meta
    }

    /// 读取下一帧；文件结束返回 `None`
    pub fn next_frame(&mut self) -> StoreResult<Option<FrameRecord>> {
        let mut magic = [0u8; 4];
        match self.reader.read_exact(&mut magic) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        }
        if &magic != FRAME_MAGIC {
            return Err(StoreError::Corrupted(format!("帧标记非法: {:?}", magic)));
        }

        let index = read_u64(&mut self.reader)?;
        if index != self.next_index {
            return Err(StoreError::Corrupted(format!(
                "帧序号不连续: 期望 {}, 实际 {}",
                self.next_index, index
            )));
        }
        let len = read_u64(&mut self.reader)? as usize;
        let mut payload = vec![0u8; len];
        self.reader.read_exact(&mut payload)?;
        let stored_crc = read_u32(&mut self.reader)?;
        let computed = crc32(&payload);
        if stored_crc != computed {
            return Err(StoreError::Checksum { expected: stored_crc, found: computed });
        }

        let frame = decode_frame(&payload, &self.meta)?;
        self.next_index += 1;
        Ok(Some(frame))
    }

    /// 读取全部剩余帧
    pub fn read_all(&mut self) -> StoreResult<Vec<FrameRecord>> {
        let mut frames = Vec::new();
        while let Some(frame) = self.next_frame()? {
            frames.push(frame);
        }
        Ok(frames)
    }
}

fn decode_frame(payload: &[u8], meta: &StoreMeta) -> StoreResult<FrameRecord> {
    let mut cur = Cursor { data: payload, offset: 0 };
    let cells = (meta.nx, meta.ny);
    let np = meta.n_particles;

    let time = cur.f64()?;
    let u = cur.vector(cells)?;
    let mut phi = Array2::zeros(cells);
    for v in phi.iter_mut() {
        *v = cur.f64()?;
    }
    let epsilon = cur.scalar(cells)?;
    let positions = cur.pairs(np)?;
    let orientations = cur.pairs(np)?;
    let velocities = cur.pairs(np)?;
    let mut omegas = Vec::with_capacity(np);
    for _ in 0..np {
        omegas.push(cur.f64()?);
    }
    let forces = cur.pairs(np)?;
    let mut force_rates: Vec<ForceTorque> = forces
        .into_iter()
        .map(|f| ForceTorque { force: f, torque: 0.0 })
        .collect();
    for ft in force_rates.iter_mut() {
        ft.torque = cur.f64()?;
    }
    let mut concentrations = Vec::with_capacity(meta.n_species);
    for _ in 0..meta.n_species {
        concentrations.push(cur.scalar(cells)?);
    }
    let c_total = cur.complex()?;
    let free_charge = cur.scalar(cells)?;
    let bound_charge = cur.scalar(cells)?;
    let potential = cur.scalar(cells)?;
    let efield = cur.vector(cells)?;
    let body_force = cur.vector(cells)?;

    if cur.offset != payload.len() {
        return Err(StoreError::Corrupted(format!(
            "帧负载有 {} 字节未消费",
            payload.len() - cur.offset
        )));
    }

    Ok(FrameRecord {
        time,
        u,
        phi,
        epsilon,
        positions,
        orientations,
        velocities,
        omegas,
        force_rates,
        concentrations,
        c_total,
        free_charge,
        bound_charge,
        potential,
        efield,
        body_force,
    })
}

// ============================================================
// 编码辅助
// ============================================================

fn push_f64(buf: &mut Vec<u8>, v: f64) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn push_complex(buf: &mut Vec<u8>, v: Complex64) {
    push_f64(buf, v.re);
    push_f64(buf, v.im);
}

fn push_scalar(buf: &mut Vec<u8>, f: &ScalarField) {
    for v in f.iter() {
        push_complex(buf, *v);
    }
}

fn push_vector(buf: &mut Vec<u8>, v: &VectorField) {
    push_scalar(buf, &v.x);
    push_scalar(buf, &v.y);
}

fn push_pairs(buf: &mut Vec<u8>, pairs: &[[f64; 2]]) {
    for p in pairs {
        push_f64(buf, p[0]);
        push_f64(buf, p[1]);
    }
}

fn read_u32<R: Read>(r: &mut R) -> StoreResult<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_u64<R: Read>(r: &mut R) -> StoreResult<u64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

/// 负载解码游标
struct Cursor<'a> {
    data: &'a [u8],
    offset: usize,
}

impl Cursor<'_> {
    fn take(&mut self, n: usize) -> StoreResult<&[u8]> {
        if self.offset + n > self.data.len() {
            return Err(StoreError::Corrupted("帧负载被截断".into()));
        }
        let slice = &self.data[self.offset..self.offset + n];
        self.offset += n;
        Ok(slice)
    }

    fn f64(&mut self) -> StoreResult<f64> {
        let bytes = self.take(8)?;
        let mut arr = [0u8; 8];
        arr.copy_from_slice(bytes);
        Ok(f64::from_le_bytes(arr))
    }

    fn complex(&mut self) -> StoreResult<Complex64> {
        let re = self.f64()?;
        let im = self.f64()?;
        Ok(Complex64::new(re, im))
    }

    fn scalar(&mut self, cells: (usize, usize)) -> StoreResult<ScalarField> {
        let mut f = ScalarField::zeros(cells);
        for v in f.iter_mut() {
            *v = self.complex()?;
        }
        Ok(f)
    }

    fn vector(&mut self, cells: (usize, usize)) -> StoreResult<VectorField> {
        let x = self.scalar(cells)?;
        let y = self.scalar(cells)?;
        Ok(VectorField::from_components(x, y))
    }

    fn pairs(&mut self, n: usize) -> StoreResult<Vec<[f64; 2]>> {
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            let a = self.f64()?;
            let b = self.f64()?;
            out.push([a, b]);
        }
        Ok(out)
    }
}

// ============================================================
// CRC32
// ============================================================

/// 生成 CRC32 查找表（编译期计算）
const fn generate_crc32_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u32;
        let mut j = 0;
        while j < 8 {
            if crc & 1 != 0 {
                crc = 0xEDB88320 ^ (crc >> 1);
            } else {
                crc >>= 1;
            }
            j += 1;
        }
        table[i as usize] = crc;
        i += 1;
    }
    table
}

/// CRC32 查找表（IEEE 多项式，编译期生成）
const CRC32_TABLE: [u32; 256] = generate_crc32_table();

fn crc32(data: &[u8]) -> u32 {
    let mut crc = 0xFFFFFFFFu32;
    for &byte in data {
        let index = ((crc ^ byte as u32) & 0xFF) as usize;
        crc = CRC32_TABLE[index] ^ (crc >> 8);
    }
    !crc
}
