// apps/spm_cli/src/commands/run.rs

//! 运行模拟命令
//!
//! 帧循环：每帧推进若干子步后写出一帧快照并落盘。
//! 任一子步失败（线性求解发散、场爆破）即带帧/步上下文中止，
//! 已落盘的帧保持可读。

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use spm_io::{FrameRecord, StoreMeta, TrajectoryWriter};
use spm_physics::engine::{SimState, StepEngine};

/// 运行模拟参数
#[derive(Args)]
pub struct RunArgs {
    /// 配置文件路径（缺省使用内置参数）
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 轨迹输出路径（覆盖配置中的 run.output）
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// 输出帧数（覆盖配置中的 run.frames）
    #[arg(long)]
    pub frames: Option<usize>,

    /// 每帧子步数（覆盖配置中的 run.substeps）
    #[arg(long)]
    pub substeps: Option<usize>,
}

/// 执行运行命令
pub fn execute(args: RunArgs) -> Result<()> {
    let mut config = super::load_config(args.config.as_deref())?;
    if let Some(output) = args.output {
        config.run.output = output;
    }
    if let Some(frames) = args.frames {
        config.run.frames = frames;
    }
    if let Some(substeps) = args.substeps {
        config.run.substeps = substeps;
    }

    let frames = config.run.frames;
    let substeps = config.run.substeps;
    let output = config.run.output.clone();

    let mut engine = StepEngine::new(config).context("引擎装配失败")?;
    let mut state = engine.initialize().context("初始状态构造失败")?;
    info!(
        nx = engine.grid().nx(),
        ny = engine.grid().ny(),
        dt = engine.dt(),
        frames,
        substeps,
        "模拟开始"
    );

    let meta = StoreMeta {
        nx: engine.grid().nx(),
        ny: engine.grid().ny(),
        n_species: engine.config().species.len(),
        n_particles: state.particles.len(),
    };
    let mut writer = TrajectoryWriter::create(&output, meta)
        .with_context(|| format!("创建轨迹文件失败: {}", output.display()))?;
    writer.append(&snapshot(&engine, &state)).context("写入初始帧失败")?;

    let started = Instant::now();
    for frame in 0..frames {
        for substep in 0..substeps {
            engine
                .step(&mut state)
                .with_context(|| format!("帧 {} 子步 {} 推进失败", frame, substep))?;
        }
        writer
            .append(&snapshot(&engine, &state))
            .with_context(|| format!("写出帧 {} 失败", frame + 1))?;
        info!(frame = frame + 1, time = state.time, "帧完成");
    }

    info!(
        elapsed_s = started.elapsed().as_secs_f64(),
        frames = writer.frames_written(),
        output = %output.display(),
        "模拟结束"
    );
    Ok(())
}

/// 由当前状态组装一帧快照
fn snapshot(engine: &StepEngine, state: &SimState) -> FrameRecord {
    let u = engine.grid().inverse_vector(&state.uk);
    let c_total = state.charges.iter().map(|c| c.sum()).sum();
    FrameRecord {
        time: state.time,
        u,
        phi: state.phi.clone(),
        epsilon: state.eps.clone(),
        positions: state.particles.positions.clone(),
        orientations: state.particles.orientations.clone(),
        velocities: state.particles.velocities.clone(),
        omegas: state.particles.omegas.clone(),
        force_rates: state.force_rates.clone(),
        concentrations: state.charges.clone(),
        c_total,
        free_charge: state.rho_e.clone(),
        bound_charge: state.rho_b.clone(),
        potential: state.potential.clone(),
        efield: state.efield.clone(),
        body_force: state.body_force.clone(),
    }
}
