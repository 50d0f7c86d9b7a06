// apps/spm_cli/src/commands/mod.rs

//! 命令实现

pub mod run;
pub mod validate;

use std::path::Path;

use anyhow::{Context, Result};
use spm_physics::SimulationConfig;

/// 读取 TOML 配置；未给路径时使用缺省配置
pub fn load_config(path: Option<&Path>) -> Result<SimulationConfig> {
    match path {
        Some(p) => {
            let text = std::fs::read_to_string(p)
                .with_context(|| format!("读取配置文件失败: {}", p.display()))?;
            toml::from_str(&text)
                .with_context(|| format!("解析配置文件失败: {}", p.display()))
        }
        None => Ok(SimulationConfig::default()),
    }
}
