// apps/spm_cli/src/commands/validate.rs

//! 验证配置命令
//!
//! 解析并校验配置，装配一次引擎以同时暴露派生量
//! （子步长、网格尺寸）中的问题。

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use spm_physics::engine::StepEngine;

/// 验证配置参数
#[derive(Args)]
pub struct ValidateArgs {
    /// 配置文件路径（缺省校验内置参数）
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// 执行验证命令
pub fn execute(args: ValidateArgs) -> Result<()> {
    let config = super::load_config(args.config.as_deref())?;
    let engine = StepEngine::new(config).context("配置校验失败")?;

    let lengths = engine.grid().lengths();
    info!(
        nx = engine.grid().nx(),
        ny = engine.grid().ny(),
        dx = engine.grid().dx(),
        lx = lengths[0],
        ly = lengths[1],
        dt = engine.dt(),
        species = engine.config().species.len(),
        frames = engine.config().run.frames,
        substeps = engine.config().run.substeps,
        "配置有效"
    );
    Ok(())
}
