// crates/spm_physics/src/config.rs

//! 模拟配置（全 f64）
//!
//! 定义引擎所需的全部参数，serde 序列化友好。配置在构建引擎时
//! 一次性注入各组件，运行期间不可变，消除隐式全局参数耦合。
//!
//! 所有物理参数在 `validate()` 中校验：非正的扩散系数、介电常数、
//! 网格间距等在装配阶段拒绝，而不是在时间步循环中。

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use spm_foundation::{SpmError, SpmResult};

use crate::applied::FieldAxis;
use crate::engine::strategy::{BodyForceScheme, PositionUpdate, VelocityUpdate};

/// 模拟配置（顶层）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// 网格配置
    #[serde(default)]
    pub grid: GridConfig,

    /// 流体参数
    #[serde(default)]
    pub fluid: FluidConfig,

    /// 粒子参数
    #[serde(default)]
    pub particle: ParticleConfig,

    /// 离子组分（按序排列）
    #[serde(default = "default_species")]
    pub species: Vec<SpeciesConfig>,

    /// 热能 kBT
    #[serde(default = "default_thermal_energy")]
    pub thermal_energy: f64,

    /// 初始均匀浓度
    #[serde(default = "default_initial_concentration")]
    pub initial_concentration: f64,

    /// 真空（参考）介电常数 ε₀
    #[serde(default = "default_epsilon0")]
    pub epsilon0: f64,

    /// 介电材料参数
    #[serde(default)]
    pub dielectric: DielectricConfig,

    /// 外加电场
    #[serde(default)]
    pub applied_field: AppliedFieldConfig,

    /// 求解器方案（体积力方案与积分策略）
    #[serde(default)]
    pub scheme: SchemeConfig,

    /// 线性求解器参数
    #[serde(default)]
    pub linear_solver: LinearSolverConfig,

    /// 运行控制
    #[serde(default)]
    pub run: RunConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            grid: GridConfig::default(),
            fluid: FluidConfig::default(),
            particle: ParticleConfig::default(),
            species: default_species(),
            thermal_energy: default_thermal_energy(),
            initial_concentration: default_initial_concentration(),
            epsilon0: default_epsilon0(),
            dielectric: DielectricConfig::default(),
            applied_field: AppliedFieldConfig::default(),
            scheme: SchemeConfig::default(),
            linear_solver: LinearSolverConfig::default(),
            run: RunConfig::default(),
        }
    }
}

/// 网格配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    /// x 轴尺寸指数（n = 2^power）
    #[serde(default = "default_power")]
    pub power_x: u32,
    /// y 轴尺寸指数
    #[serde(default = "default_power")]
    pub power_y: u32,
    /// 胞间距
    #[serde(default = "default_dx")]
    pub dx: f64,
}

fn default_power() -> u32 {
    6
}
fn default_dx() -> f64 {
    0.5
}

impl Default for GridConfig {
    fn default() -> Self {
        Self { power_x: default_power(), power_y: default_power(), dx: default_dx() }
    }
}

/// 流体参数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FluidConfig {
    /// 密度
    #[serde(default = "default_unit")]
    pub rho: f64,
    /// 动力黏度
    #[serde(default = "default_unit")]
    pub mu: f64,
}

fn default_unit() -> f64 {
    1.0
}

impl Default for FluidConfig {
    fn default() -> Self {
        Self { rho: 1.0, mu: 1.0 }
    }
}

impl FluidConfig {
    /// 运动黏度 ν = μ/ρ
    pub fn nu(&self) -> f64 {
        self.mu / self.rho
    }
}

/// 粒子参数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticleConfig {
    /// 粒子半径
    #[serde(default = "default_radius")]
    pub radius: f64,
    /// 界面宽度
    #[serde(default = "default_xi")]
    pub xi: f64,
    /// 粒子/流体密度比
    #[serde(default = "default_mass_ratio")]
    pub mass_ratio: f64,
    /// 初始位置（空则置于域中心单粒子）
    #[serde(default)]
    pub positions: Vec<[f64; 2]>,
    /// 初始取向（单位矢量；空则取 +x，与位置数对齐）
    #[serde(default)]
    pub orientations: Vec<[f64; 2]>,
}

fn default_radius() -> f64 {
    5.0
}
fn default_xi() -> f64 {
    2.0
}
fn default_mass_ratio() -> f64 {
    1.2
}

impl Default for ParticleConfig {
    fn default() -> Self {
        Self {
            radius: default_radius(),
            xi: default_xi(),
            mass_ratio: default_mass_ratio(),
            positions: Vec::new(),
            orientations: Vec::new(),
        }
    }
}

/// 单个离子组分
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SpeciesConfig {
    /// 价数 z
    pub valence: f64,
    /// 迁移率 Γ
    pub mobility: f64,
}

fn default_species() -> Vec<SpeciesConfig> {
    vec![
        SpeciesConfig { valence: 1.0, mobility: 1.0 },
        SpeciesConfig { valence: -1.0, mobility: 1.0 },
    ]
}

fn default_thermal_energy() -> f64 {
    1.0
}
fn default_initial_concentration() -> f64 {
    0.1
}
fn default_epsilon0() -> f64 {
    1.0
}

/// 介电材料参数（头/尾/流体）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DielectricConfig {
    /// 头部介电常数
    #[serde(default = "default_eps_head")]
    pub epsilon_head: f64,
    /// 尾部介电常数
    #[serde(default = "default_eps_tail")]
    pub epsilon_tail: f64,
    /// 流体介电常数
    #[serde(default = "default_unit")]
    pub epsilon_fluid: f64,
    /// 头部电导率
    #[serde(default = "default_sigma_head")]
    pub sigma_head: f64,
    /// 尾部电导率
    #[serde(default = "default_unit")]
    pub sigma_tail: f64,
    /// 流体电导率
    #[serde(default = "default_sigma_fluid")]
    pub sigma_fluid: f64,
}

fn default_eps_head() -> f64 {
    10.0
}
fn default_eps_tail() -> f64 {
    0.1
}
fn default_sigma_head() -> f64 {
    20.0
}
fn default_sigma_fluid() -> f64 {
    5.0
}

impl Default for DielectricConfig {
    fn default() -> Self {
        Self {
            epsilon_head: default_eps_head(),
            epsilon_tail: default_eps_tail(),
            epsilon_fluid: 1.0,
            sigma_head: default_sigma_head(),
            sigma_tail: 1.0,
            sigma_fluid: default_sigma_fluid(),
        }
    }
}

/// 外加电场配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppliedFieldConfig {
    /// 振幅
    #[serde(default = "default_amplitude")]
    pub amplitude: f64,
    /// 角频率（0 = DC）
    #[serde(default = "default_unit")]
    pub frequency: f64,
    /// 极化轴
    #[serde(default = "default_axis")]
    pub axis: FieldAxis,
}

fn default_amplitude() -> f64 {
    0.5
}
fn default_axis() -> FieldAxis {
    FieldAxis::Y
}

impl Default for AppliedFieldConfig {
    fn default() -> Self {
        Self { amplitude: default_amplitude(), frequency: 1.0, axis: FieldAxis::Y }
    }
}

/// 求解器方案选择
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SchemeConfig {
    /// 电致体积力方案
    #[serde(default)]
    pub body_force: BodyForceScheme,
    /// 位置/取向积分策略
    #[serde(default)]
    pub position: PositionUpdate,
    /// 速度积分策略
    #[serde(default)]
    pub velocity: VelocityUpdate,
}

/// 线性求解器参数（GMRES）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearSolverConfig {
    /// 相对残差容限
    #[serde(default = "default_rtol")]
    pub rtol: f64,
    /// 最大迭代次数（耗尽视为发散失败）
    #[serde(default = "default_max_iter")]
    pub max_iter: usize,
    /// 重启长度
    #[serde(default = "default_restart")]
    pub restart: usize,
}

fn default_rtol() -> f64 {
    1e-5
}
fn default_max_iter() -> usize {
    500
}
fn default_restart() -> usize {
    30
}

impl Default for LinearSolverConfig {
    fn default() -> Self {
        Self { rtol: default_rtol(), max_iter: default_max_iter(), restart: default_restart() }
    }
}

/// 运行控制
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// 输出帧数
    #[serde(default = "default_frames")]
    pub frames: usize,
    /// 每帧子步数
    #[serde(default = "default_substeps")]
    pub substeps: usize,
    /// 轨迹输出路径
    #[serde(default = "default_output")]
    pub output: PathBuf,
}

fn default_frames() -> usize {
    10
}
fn default_substeps() -> usize {
    10
}
fn default_output() -> PathBuf {
    PathBuf::from("trajectory.spmt")
}

impl Default for RunConfig {
    fn default() -> Self {
        Self { frames: default_frames(), substeps: default_substeps(), output: default_output() }
    }
}

// ============================================================
// 校验
// ============================================================

impl SimulationConfig {
    /// 校验全部物理与数值参数
    pub fn validate(&self) -> SpmResult<()> {
        SpmError::check_positive("grid.dx", self.grid.dx)?;
        SpmError::check_range("grid.power_x", self.grid.power_x as f64, 1.0, 14.0)?;
        SpmError::check_range("grid.power_y", self.grid.power_y as f64, 1.0, 14.0)?;

        SpmError::check_positive("fluid.rho", self.fluid.rho)?;
        SpmError::check_positive("fluid.mu", self.fluid.mu)?;

        SpmError::check_positive("particle.radius", self.particle.radius)?;
        SpmError::check_positive("particle.xi", self.particle.xi)?;
        SpmError::check_positive("particle.mass_ratio", self.particle.mass_ratio)?;

        if self.species.is_empty() {
            return Err(SpmError::config("至少需要一个离子组分"));
        }
        for (idx, sp) in self.species.iter().enumerate() {
            if sp.mobility <= 0.0 || !sp.mobility.is_finite() {
                return Err(SpmError::invalid_config(
                    format!("species[{}].mobility", idx),
                    sp.mobility.to_string(),
                    "迁移率必须为正",
                ));
            }
        }
        SpmError::check_positive("thermal_energy", self.thermal_energy)?;
        SpmError::check_positive("epsilon0", self.epsilon0)?;

        SpmError::check_positive("dielectric.epsilon_head", self.dielectric.epsilon_head)?;
        SpmError::check_positive("dielectric.epsilon_tail", self.dielectric.epsilon_tail)?;
        SpmError::check_positive("dielectric.epsilon_fluid", self.dielectric.epsilon_fluid)?;

        if self.applied_field.frequency < 0.0 {
            return Err(SpmError::invalid_config(
                "applied_field.frequency",
                self.applied_field.frequency.to_string(),
                "频率不能为负",
            ));
        }

        SpmError::check_positive("linear_solver.rtol", self.linear_solver.rtol)?;
        if self.linear_solver.max_iter == 0 || self.linear_solver.restart == 0 {
            return Err(SpmError::config("linear_solver 迭代参数必须为正"));
        }

        if self.run.frames == 0 || self.run.substeps == 0 {
            return Err(SpmError::config("run.frames 与 run.substeps 必须为正"));
        }

        if !self.particle.orientations.is_empty()
            && self.particle.orientations.len() != self.particle.positions.len()
        {
            return Err(SpmError::size_mismatch(
                "particle.orientations",
                self.particle.positions.len(),
                self.particle.orientations.len(),
            ));
        }

        let lengths = [
            (1usize << self.grid.power_x) as f64 * self.grid.dx,
            (1usize << self.grid.power_y) as f64 * self.grid.dx,
        ];
        let min_len = lengths[0].min(lengths[1]);
        if 2.0 * (self.particle.radius + self.particle.xi) >= min_len {
            return Err(SpmError::validation(format!(
                "粒子直径（含界面）{} 超过最小周期长度 {}",
                2.0 * (self.particle.radius + self.particle.xi),
                min_len
            )));
        }

        Ok(())
    }
}
