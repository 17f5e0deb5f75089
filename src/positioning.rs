//! 批量指纹定位
//!
//! 支持的功能：
//! - 按算法名称分派（射线追踪 / 模糊地图）
//! - 显式的估计配置（天线、阈值、指纹数、功率模式），在入口统一校验
//! - 限定移动点子集，调用结束（包括出错）后自动恢复
//! - 可选的并行计算与协作式取消

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::algorithms::{
    DEFAULT_FINGERPRINTS, DEFAULT_THRESHOLD, Estimation, EstimationAlgorithm, FieldProvider, Point,
    PowerMode, Simulation, is_valid_antenna_id,
};
use crate::error::{LocalizationError, Result};

/// 定位算法
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    /// 射线追踪：取匹配代价最小的 k 个指纹
    Raytracing,
    /// 模糊地图：阈值窗口候选集求交
    Fuzzymap,
}

impl Algorithm {
    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::Raytracing => "raytracing",
            Algorithm::Fuzzymap => "fuzzymap",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Algorithm {
    type Err = LocalizationError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "raytracing" => Ok(Algorithm::Raytracing),
            "fuzzymap" => Ok(Algorithm::Fuzzymap),
            _ => Err(LocalizationError::InvalidConfig(format!(
                "不支持的算法: {s}（可选 raytracing、fuzzymap）"
            ))),
        }
    }
}

/// 估计配置
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimationConfig {
    /// 使用的天线；为空时使用移动仿真中的全部天线
    pub antennas: Vec<String>,
    /// 限定估计的移动点 id；为空时估计全部点
    pub points: Vec<u32>,
    /// 射线追踪使用的指纹数
    pub fingerprints: usize,
    /// 模糊地图功率阈值（与功率同单位）
    pub threshold: f64,
    /// 功率计算方式
    pub power_mode: PowerMode,
    /// 是否按移动点并行计算
    pub parallel: bool,
}

impl Default for EstimationConfig {
    fn default() -> Self {
        EstimationConfig {
            antennas: Vec::new(),
            points: Vec::new(),
            fingerprints: DEFAULT_FINGERPRINTS,
            threshold: DEFAULT_THRESHOLD,
            power_mode: PowerMode::Decibel,
            parallel: false,
        }
    }
}

impl EstimationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从 JSON 解析配置，缺省字段取默认值
    pub fn from_json(json: &str) -> Result<Self> {
        let config: EstimationConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_antennas<I, S>(mut self, antennas: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.antennas = antennas.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_points(mut self, points: &[u32]) -> Self {
        self.points = points.to_vec();
        self
    }

    pub fn with_fingerprints(mut self, fingerprints: usize) -> Self {
        self.fingerprints = fingerprints;
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_power_mode(mut self, power_mode: PowerMode) -> Self {
        self.power_mode = power_mode;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// 校验配置
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::with_capacity(self.antennas.len());
        for antenna in &self.antennas {
            if !is_valid_antenna_id(antenna) {
                return Err(LocalizationError::InvalidConfig(format!(
                    "天线 id 非法: {antenna:?}"
                )));
            }
            if !seen.insert(antenna) {
                return Err(LocalizationError::InvalidConfig(format!(
                    "天线 {antenna} 重复"
                )));
            }
        }
        if self.fingerprints == 0 {
            return Err(LocalizationError::InvalidConfig(
                "指纹数必须大于 0".to_string(),
            ));
        }
        if !self.threshold.is_finite() || self.threshold < 0.0 {
            return Err(LocalizationError::InvalidConfig(format!(
                "阈值必须为非负有限数，实际为 {}",
                self.threshold
            )));
        }
        Ok(())
    }
}

/// 执行批量估计
///
/// 对移动仿真的每个有效点（或 `config.points` 指定的子集）计算估计结果，
/// 返回顺序与移动点顺序一致。子集在返回前恢复。
pub fn run_estimation<F>(
    algorithm: Algorithm,
    mobile: &mut Simulation,
    reference: &F,
    config: &EstimationConfig,
) -> Result<Vec<Estimation>>
where
    F: FieldProvider + Sync + ?Sized,
{
    run_estimation_with_cancel(algorithm, mobile, reference, config, &AtomicBool::new(false))
}

/// 执行批量估计，每个移动点之前检查 `cancel`
///
/// 被取消时返回 `Cancelled`，子集同样会恢复。
pub fn run_estimation_with_cancel<F>(
    algorithm: Algorithm,
    mobile: &mut Simulation,
    reference: &F,
    config: &EstimationConfig,
    cancel: &AtomicBool,
) -> Result<Vec<Estimation>>
where
    F: FieldProvider + Sync + ?Sized,
{
    config.validate()?;

    let antennas = if config.antennas.is_empty() {
        mobile.antenna_ids()
    } else {
        config.antennas.clone()
    };
    for antenna in &antennas {
        if !mobile.has_antenna(antenna) {
            return Err(LocalizationError::AntennaNotFound {
                simulation: mobile.name.clone(),
                antenna: antenna.clone(),
            });
        }
        if !reference.has_antenna(antenna) {
            return Err(LocalizationError::AntennaNotFound {
                simulation: reference.name().to_string(),
                antenna: antenna.clone(),
            });
        }
    }

    debug!(
        %algorithm,
        mobile = %mobile.name,
        reference = reference.name(),
        ?antennas,
        ?config,
        "开始估计"
    );

    let guard = mobile.cohort_guard(&config.points)?;
    let sim: &Simulation = &guard;

    let estimate = |point: &Point| -> Result<Estimation> {
        if cancel.load(Ordering::Relaxed) {
            return Err(LocalizationError::Cancelled);
        }
        match algorithm {
            Algorithm::Raytracing => EstimationAlgorithm::raytracing_point(
                sim,
                reference,
                point,
                &antennas,
                config.fingerprints,
                config.power_mode,
            ),
            Algorithm::Fuzzymap => EstimationAlgorithm::fuzzymap_point(
                sim,
                reference,
                point,
                &antennas,
                config.threshold,
                config.power_mode,
            ),
        }
    };

    let points = sim.points();
    let estimations: Vec<Estimation> = if config.parallel {
        points.par_iter().map(estimate).collect::<Result<_>>()?
    } else {
        points.iter().map(estimate).collect::<Result<_>>()?
    };
    drop(guard);

    if estimations.is_empty() {
        warn!(%algorithm, mobile = %mobile.name, "当前配置没有产生任何估计");
    } else {
        info!(
            %algorithm,
            total = estimations.len(),
            estimated = estimations.iter().filter(|e| e.was_estimated).count(),
            "估计完成"
        );
    }

    Ok(estimations)
}

/// 按算法名称执行批量估计
///
/// 名称只接受 `raytracing` 与 `fuzzymap`，其余返回 `InvalidConfig`。
pub fn get_estimation<F>(
    algorithm: &str,
    mobile: &mut Simulation,
    reference: &F,
    config: &EstimationConfig,
) -> Result<Vec<Estimation>>
where
    F: FieldProvider + Sync + ?Sized,
{
    let algorithm: Algorithm = algorithm.parse()?;
    run_estimation(algorithm, mobile, reference, config)
}
