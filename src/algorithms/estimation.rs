//! 指纹匹配定位算法实现
//!
//! 支持：
//! - 移动点与指纹点的逐天线功率比较
//! - 射线追踪（按功率差平方和取最近的 k 个指纹）
//! - 模糊地图（按功率阈值窗口筛选，再对各天线候选集求交）

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::algorithms::field_value::{NO_SIGNAL_POWER, PowerMode};
use crate::algorithms::point::{Point, round_to};
use crate::algorithms::results::Estimation;
use crate::algorithms::simulation::FieldProvider;
use crate::error::{LocalizationError, Result};

/// 射线追踪默认使用的指纹数
pub const DEFAULT_FINGERPRINTS: usize = 4;

/// 模糊地图默认功率阈值
pub const DEFAULT_THRESHOLD: f64 = 0.5;

// ============================================================================
// 功率比较数据结构
// ============================================================================

/// 单根天线上移动点与指纹点的功率比较
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PowerMeasure {
    /// 天线 id
    pub antenna: String,
    /// 移动点功率
    pub mpower: f64,
    /// 指纹点功率
    pub fpower: f64,
    /// (mpower - fpower)²，构造时计算
    pub squared_difference: f64,
    /// 指纹功率是否落在阈值窗口内（仅模糊地图设置）
    pub in_threshold: bool,
}

impl PowerMeasure {
    pub fn new(antenna: impl Into<String>, mpower: f64, fpower: f64) -> Self {
        PowerMeasure {
            antenna: antenna.into(),
            mpower,
            fpower,
            squared_difference: (mpower - fpower).powi(2),
            in_threshold: false,
        }
    }

    /// 指纹功率是否在 `mpower ± threshold` 内（含边界）
    ///
    /// 无信号的指纹功率永远不算命中。
    pub fn within(&self, threshold: f64) -> bool {
        self.fpower != NO_SIGNAL_POWER
            && self.fpower >= self.mpower - threshold
            && self.fpower <= self.mpower + threshold
    }
}

/// 一对 (移动点, 指纹点) 的估计输入
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EstimationInput {
    pub mobile_point: Point,
    pub fingerprint_point: Point,
    pub power_measures: Vec<PowerMeasure>,
    /// 各天线 `squared_difference` 之和（2 位小数），即匹配代价
    pub aggregate_squared_error: f64,
}

impl EstimationInput {
    pub fn new(
        mobile_point: Point,
        fingerprint_point: Point,
        power_measures: Vec<PowerMeasure>,
    ) -> Self {
        let aggregate_squared_error = round_to(
            power_measures.iter().map(|m| m.squared_difference).sum::<f64>(),
            2,
        );
        EstimationInput {
            mobile_point,
            fingerprint_point,
            power_measures,
            aggregate_squared_error,
        }
    }

    /// 获取指定天线的功率比较
    pub fn power_measure(&self, antenna: &str) -> Option<&PowerMeasure> {
        self.power_measures.iter().find(|m| m.antenna == antenna)
    }

    /// 是否至少有一根天线可用于比较
    pub fn is_comparable(&self) -> bool {
        !self.power_measures.is_empty()
    }
}

fn point_id<P: FieldProvider + ?Sized>(provider: &P, point: &Point) -> Result<u32> {
    point.id.ok_or_else(|| {
        LocalizationError::InconsistentData(format!(
            "{} 中的点 ({}, {}, {}) 没有编号",
            provider.name(),
            point.x,
            point.y,
            point.z
        ))
    })
}

// ============================================================================
// 定位算法集合
// ============================================================================

/// 指纹定位算法集合
///
/// 所有函数只读参考集，对每个移动点独立计算，可安全并行。
pub struct EstimationAlgorithm;

impl EstimationAlgorithm {
    /// 计算一个移动点与参考集中每个指纹点的功率比较
    ///
    /// 移动点在某天线上无信号时跳过该天线，但仍为每个指纹点生成一条输入。
    pub fn compare<M, F>(
        mobile: &M,
        reference: &F,
        mobile_point: &Point,
        antennas: &[String],
        mode: PowerMode,
    ) -> Result<Vec<EstimationInput>>
    where
        M: FieldProvider + ?Sized,
        F: FieldProvider + ?Sized,
    {
        let mobile_id = point_id(mobile, mobile_point)?;

        let mut mpowers = Vec::with_capacity(antennas.len());
        for antenna in antennas {
            let mpower = mobile.field(antenna, mobile_id)?.power(mode);
            if mpower != NO_SIGNAL_POWER {
                mpowers.push((antenna, mpower));
            }
        }

        let mut inputs = Vec::with_capacity(reference.points().len());
        for fingerprint in reference.points() {
            let fingerprint_id = point_id(reference, fingerprint)?;
            let mut measures = Vec::with_capacity(mpowers.len());
            for (antenna, mpower) in &mpowers {
                let fpower = reference.field(antenna, fingerprint_id)?.power(mode);
                measures.push(PowerMeasure::new(antenna.as_str(), *mpower, fpower));
            }
            inputs.push(EstimationInput::new(*mobile_point, *fingerprint, measures));
        }

        Ok(inputs)
    }

    /// 射线追踪：按匹配代价升序取前 `fingerprints` 个指纹点
    ///
    /// 代价相同时保持指纹点的枚举顺序（稳定排序）。没有任何可比较的指纹时
    /// 返回未估计的结果并记录警告。
    pub fn raytracing_point<M, F>(
        mobile: &M,
        reference: &F,
        mobile_point: &Point,
        antennas: &[String],
        fingerprints: usize,
        mode: PowerMode,
    ) -> Result<Estimation>
    where
        M: FieldProvider + ?Sized,
        F: FieldProvider + ?Sized,
    {
        let inputs = Self::compare(mobile, reference, mobile_point, antennas, mode)?;

        let mut ranked: Vec<&EstimationInput> =
            inputs.iter().filter(|i| i.is_comparable()).collect();
        ranked.sort_by(|a, b| a.aggregate_squared_error.total_cmp(&b.aggregate_squared_error));

        let selected: Vec<Point> = ranked
            .into_iter()
            .take(fingerprints)
            .map(|i| i.fingerprint_point)
            .collect();

        if selected.is_empty() {
            warn!(mobile = %mobile_point, "移动点未能估计位置");
        }

        Ok(Estimation::new(*mobile_point, selected, inputs))
    }

    /// 模糊地图：各天线分别筛选功率落在 `mpower ± threshold` 内的指纹点，
    /// 再对非空的候选集求交
    ///
    /// 所有候选集均为空（或未指定天线）时结果为空。结果按指纹点枚举顺序排列。
    pub fn fuzzymap_point<M, F>(
        mobile: &M,
        reference: &F,
        mobile_point: &Point,
        antennas: &[String],
        threshold: f64,
        mode: PowerMode,
    ) -> Result<Estimation>
    where
        M: FieldProvider + ?Sized,
        F: FieldProvider + ?Sized,
    {
        let mut inputs = Self::compare(mobile, reference, mobile_point, antennas, mode)?;

        // candidates[a][f]：指纹 f 在天线 a 上是否命中
        let mut candidates = vec![vec![false; inputs.len()]; antennas.len()];
        for (f_idx, input) in inputs.iter_mut().enumerate() {
            for measure in input.power_measures.iter_mut() {
                if measure.within(threshold) {
                    measure.in_threshold = true;
                    if let Some(a_idx) = antennas.iter().position(|a| *a == measure.antenna) {
                        candidates[a_idx][f_idx] = true;
                    }
                }
            }
        }

        let active: Vec<&Vec<bool>> =
            candidates.iter().filter(|c| c.iter().any(|hit| *hit)).collect();

        let selected: Vec<Point> = if active.is_empty() {
            Vec::new()
        } else {
            inputs
                .iter()
                .enumerate()
                .filter(|(f_idx, _)| active.iter().all(|c| c[*f_idx]))
                .map(|(_, input)| input.fingerprint_point)
                .collect()
        };

        if selected.is_empty() {
            warn!(mobile = %mobile_point, threshold, "移动点在阈值内没有匹配的指纹");
        }

        Ok(Estimation::new(*mobile_point, selected, inputs))
    }

    /// 对移动仿真的所有有效点执行射线追踪
    pub fn raytracing<M, F>(
        mobile: &M,
        reference: &F,
        antennas: &[String],
        fingerprints: usize,
        mode: PowerMode,
    ) -> Result<Vec<Estimation>>
    where
        M: FieldProvider + ?Sized,
        F: FieldProvider + ?Sized,
    {
        mobile
            .points()
            .iter()
            .map(|p| Self::raytracing_point(mobile, reference, p, antennas, fingerprints, mode))
            .collect()
    }

    /// 对移动仿真的所有有效点执行模糊地图估计
    pub fn fuzzymap<M, F>(
        mobile: &M,
        reference: &F,
        antennas: &[String],
        threshold: f64,
        mode: PowerMode,
    ) -> Result<Vec<Estimation>>
    where
        M: FieldProvider + ?Sized,
        F: FieldProvider + ?Sized,
    {
        mobile
            .points()
            .iter()
            .map(|p| Self::fuzzymap_point(mobile, reference, p, antennas, threshold, mode))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::field_value::FieldValue;
    use crate::algorithms::simulation::{AerialMeasure, Simulation};

    fn field(id: u32, ez: f64) -> FieldValue {
        FieldValue::from_parts(id, (0.0, 0.0), (0.0, 0.0), (ez, 0.0))
    }

    /// 单天线仿真，第 i 个点的 Ez 取 `values[i]`
    fn single_antenna(name: &str, values: &[f64]) -> Simulation {
        let points = (0..values.len())
            .map(|i| Point::with_id(i as u32 + 1, i as f64, 0.0, 0.0))
            .collect();
        let entries = values
            .iter()
            .enumerate()
            .map(|(i, v)| field(i as u32 + 1, *v))
            .collect();
        let measure = AerialMeasure::new("1", 2.4e9, entries).unwrap();
        Simulation::new(name, points, vec![measure]).unwrap()
    }

    #[test]
    fn test_power_measure() {
        let m = PowerMeasure::new("1", -40.0, -43.0);
        assert_eq!(m.squared_difference, 9.0);
        assert!(!m.in_threshold);
        assert!(m.within(3.0));
        assert!(!m.within(2.9));
        assert!(!PowerMeasure::new("1", -199.9, NO_SIGNAL_POWER).within(1.0));
    }

    #[test]
    fn test_estimation_input_aggregate() {
        let input = EstimationInput::new(
            Point::with_id(1, 0.0, 0.0, 0.0),
            Point::with_id(2, 1.0, 0.0, 0.0),
            vec![PowerMeasure::new("1", -40.0, -41.0), PowerMeasure::new("2", -50.0, -52.0)],
        );
        assert_eq!(input.aggregate_squared_error, 5.0);
        assert_eq!(input.power_measure("2").unwrap().fpower, -52.0);
        assert!(input.power_measure("3").is_none());
    }

    #[test]
    fn test_compare_skips_silent_mobile() {
        let mobile = single_antenna("mobile", &[0.0]);
        let reference = single_antenna("reference", &[1.0, 2.0]);
        let antennas = vec!["1".to_string()];
        let inputs = EstimationAlgorithm::compare(
            &mobile,
            &reference,
            &mobile.points()[0],
            &antennas,
            PowerMode::Decibel,
        )
        .unwrap();
        assert_eq!(inputs.len(), 2);
        assert!(inputs.iter().all(|i| i.power_measures.is_empty()));
    }

    #[test]
    fn test_compare_unknown_antenna() {
        let mobile = single_antenna("mobile", &[1.0]);
        let reference = single_antenna("reference", &[1.0]);
        let antennas = vec!["7".to_string()];
        let result = EstimationAlgorithm::compare(
            &mobile,
            &reference,
            &mobile.points()[0],
            &antennas,
            PowerMode::Decibel,
        );
        assert!(matches!(result, Err(LocalizationError::AntennaNotFound { .. })));
    }

    #[test]
    fn test_raytracing_ranking_is_stable() {
        let mobile = single_antenna("mobile", &[1.0]);
        // 指纹 2 与 4 完全匹配，指纹 1 与 3 代价相同
        let reference = single_antenna("reference", &[2.0, 1.0, 2.0, 1.0]);
        let antennas = vec!["1".to_string()];
        let estimation = EstimationAlgorithm::raytracing_point(
            &mobile,
            &reference,
            &mobile.points()[0],
            &antennas,
            3,
            PowerMode::Decibel,
        )
        .unwrap();
        let ids: Vec<Option<u32>> = estimation.selected_fingerprints.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![Some(2), Some(4), Some(1)]);
        assert!(estimation.was_estimated);
    }

    #[test]
    fn test_fuzzymap_marks_in_threshold() {
        let mobile = single_antenna("mobile", &[1.0]);
        let reference = single_antenna("reference", &[1.0, 100.0, 1.01]);
        let antennas = vec!["1".to_string()];
        let estimation = EstimationAlgorithm::fuzzymap_point(
            &mobile,
            &reference,
            &mobile.points()[0],
            &antennas,
            0.5,
            PowerMode::Decibel,
        )
        .unwrap();
        let ids: Vec<Option<u32>> = estimation.selected_fingerprints.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![Some(1), Some(3)]);
        assert!(estimation.inputs[0].power_measures[0].in_threshold);
        assert!(!estimation.inputs[1].power_measures[0].in_threshold);
    }

    #[test]
    fn test_fuzzymap_without_antennas() {
        let mobile = single_antenna("mobile", &[1.0]);
        let reference = single_antenna("reference", &[1.0, 1.0]);
        let estimation = EstimationAlgorithm::fuzzymap_point(
            &mobile,
            &reference,
            &mobile.points()[0],
            &[],
            10.0,
            PowerMode::Decibel,
        )
        .unwrap();
        assert!(!estimation.was_estimated);
        assert_eq!(estimation.inputs.len(), 2);
    }
}
