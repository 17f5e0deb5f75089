//! 定位结果数据结构与精度统计
//!
//! 包含单点估计结果、批量误差统计以及可序列化的汇总报告

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::algorithms::estimation::EstimationInput;
use crate::algorithms::point::{Point, center, compensated_sum, distance, polygon_order};
use crate::error::Result;

/// 没有任何已估计的点时，平均误差与标准差返回的值
pub const NO_ESTIMATION_ERROR: f64 = -1.0;

/// 单个移动点的估计结果
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Estimation {
    /// 真实位置
    pub mobile_point: Point,
    /// 被选中的指纹点（可能为空）
    pub selected_fingerprints: Vec<Point>,
    /// 估计位置：选中指纹点的几何中心
    pub estimated_point: Option<Point>,
    /// 真实位置与估计位置的距离（2 位小数）
    pub error: Option<f64>,
    /// 是否成功估计
    pub was_estimated: bool,
    /// 参与比较的所有输入
    pub inputs: Vec<EstimationInput>,
}

impl Estimation {
    /// 创建估计结果，选中指纹非空时计算估计位置与误差
    pub fn new(
        mobile_point: Point,
        selected_fingerprints: Vec<Point>,
        inputs: Vec<EstimationInput>,
    ) -> Self {
        let estimated_point = center(&selected_fingerprints).ok();
        let error = estimated_point.map(|e| distance(&mobile_point, &e));

        Estimation {
            mobile_point,
            was_estimated: estimated_point.is_some(),
            selected_fingerprints,
            estimated_point,
            error,
            inputs,
        }
    }

    /// 未估计的结果
    pub fn not_estimated(mobile_point: Point) -> Self {
        Self::new(mobile_point, Vec::new(), Vec::new())
    }

    /// 选中指纹点的多边形顶点顺序（用于绘制估计区域）
    pub fn polygon(&self) -> Vec<Point> {
        match &self.estimated_point {
            Some(c) => polygon_order(c, &self.selected_fingerprints),
            None => Vec::new(),
        }
    }

    /// 展开所有功率比较为行数据
    ///
    /// `in_threshold_only` 为 true 时只保留阈值内的比较。
    pub fn power_rows(&self, in_threshold_only: bool) -> Vec<PowerRow> {
        self.inputs
            .iter()
            .flat_map(|input| {
                input
                    .power_measures
                    .iter()
                    .filter(move |m| !in_threshold_only || m.in_threshold)
                    .map(move |m| PowerRow {
                        mobile_id: input.mobile_point.id,
                        fingerprint_id: input.fingerprint_point.id,
                        antenna: m.antenna.clone(),
                        mpower: m.mpower,
                        fpower: m.fpower,
                    })
            })
            .collect()
    }

    /// 获取详细描述
    pub fn detailed_description(&self) -> String {
        let fingerprints: Vec<String> =
            self.selected_fingerprints.iter().map(|p| p.to_string()).collect();
        format!(
            "原始点: {}, 估计点: {}, 指纹数: {}, 指纹: [{}], 误差: {}",
            self.mobile_point,
            self.estimated_point
                .map(|p| p.to_string())
                .unwrap_or_else(|| "无".to_string()),
            self.selected_fingerprints.len(),
            fingerprints.join(" | "),
            self.error
                .map(|e| format!("{e:.2}"))
                .unwrap_or_else(|| "无".to_string()),
        )
    }
}

impl fmt::Display for Estimation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.estimated_point, self.error) {
            (Some(p), Some(e)) => write!(
                f,
                "{} -> ({:.2}, {:.2}, {:.2}) [误差 {:.2}]",
                self.mobile_point, p.x, p.y, p.z, e
            ),
            _ => write!(f, "{} -> 未估计", self.mobile_point),
        }
    }
}

/// 一条功率比较行
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PowerRow {
    pub mobile_id: Option<u32>,
    pub fingerprint_id: Option<u32>,
    pub antenna: String,
    pub mpower: f64,
    pub fpower: f64,
}

fn estimated_errors(estimations: &[Estimation]) -> Vec<f64> {
    estimations
        .iter()
        .filter(|e| e.was_estimated)
        .filter_map(|e| e.error)
        .collect()
}

/// 已估计点的平均误差
///
/// 没有已估计的点时返回 [`NO_ESTIMATION_ERROR`] (-1)。
pub fn mean_error(estimations: &[Estimation]) -> f64 {
    let errors = estimated_errors(estimations);
    if errors.is_empty() {
        return NO_ESTIMATION_ERROR;
    }
    compensated_sum(errors.iter().copied()) / errors.len() as f64
}

/// 已估计点误差的样本标准差
///
/// 没有已估计的点时返回 [`NO_ESTIMATION_ERROR`] (-1)；只有一个已估计的点时
/// 样本标准差不可计算，返回 `f64::NAN`。
pub fn stdev_error(estimations: &[Estimation]) -> f64 {
    let errors = estimated_errors(estimations);
    match errors.len() {
        0 => NO_ESTIMATION_ERROR,
        1 => f64::NAN,
        n => {
            let mean = compensated_sum(errors.iter().copied()) / n as f64;
            let squares = errors.iter().map(|e| (e - mean).powi(2));
            (compensated_sum(squares) / (n - 1) as f64).sqrt()
        }
    }
}

/// 两次估计平均误差的相对改善率：`1 - mae1 / mae2`
///
/// `mae2` 为 0 时返回 `None`。
pub fn mae_rate(mae1: f64, mae2: f64) -> Option<f64> {
    if mae2 == 0.0 { None } else { Some(1.0 - mae1 / mae2) }
}

/// 一次批量估计的汇总报告
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EstimationReport {
    /// 报告名称
    pub name: String,
    /// 使用的算法名称
    pub algorithm: String,
    /// 使用的天线
    pub antennas: Vec<String>,
    /// 成功估计的点数
    pub estimated: usize,
    /// 总点数
    pub total: usize,
    /// 平均误差
    pub mean_error: f64,
    /// 误差标准差，只有一个已估计点时不可计算，为 `None`
    pub stdev_error: Option<f64>,
    /// 生成时间
    pub generated_at: DateTime<Utc>,
}

impl EstimationReport {
    /// 从批量估计结果创建报告
    pub fn new(
        name: impl Into<String>,
        algorithm: impl Into<String>,
        antennas: &[String],
        estimations: &[Estimation],
    ) -> Self {
        EstimationReport {
            name: name.into(),
            algorithm: algorithm.into(),
            antennas: antennas.to_vec(),
            estimated: estimations.iter().filter(|e| e.was_estimated).count(),
            total: estimations.len(),
            mean_error: mean_error(estimations),
            stdev_error: Some(stdev_error(estimations)).filter(|s| !s.is_nan()),
            generated_at: Utc::now(),
        }
    }

    /// 估计成功率 (0.0 ~ 1.0)，空批量返回 0
    pub fn estimated_ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.estimated as f64 / self.total as f64
        }
    }

    /// 序列化为 JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl fmt::Display for EstimationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] 天线: {:?}, 已估计 {}/{}, 平均误差: {:.2}, 标准差: ",
            self.name, self.algorithm, self.antennas, self.estimated, self.total, self.mean_error,
        )?;
        match self.stdev_error {
            Some(stdev) => write!(f, "{stdev:.2}"),
            None => write!(f, "无"),
        }
    }
}
