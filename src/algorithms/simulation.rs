//! 仿真数据定义：天线测量与点集
//!
//! 一次仿真包含一组带编号的点，以及每根天线在这些点上的场值。
//! 点 id 是几何数据与场值数据之间的关联键。

use std::collections::{HashMap, HashSet};
use std::ops::{Deref, DerefMut};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use crate::algorithms::field_value::FieldValue;
use crate::algorithms::point::Point;
use crate::error::{LocalizationError, Result};

static ANTENNA_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_.-]+$").expect("天线 id 正则非法")
});

/// 天线 id 是否合法（字母、数字、`_`、`.`、`-`）
pub fn is_valid_antenna_id(id: &str) -> bool {
    ANTENNA_ID_RE.is_match(id)
}

/// 场值数据源
///
/// 定位引擎只通过该接口读取点集与场值，参考集在估计过程中只读。
pub trait FieldProvider {
    /// 数据源名称
    fn name(&self) -> &str;

    /// 当前有效的点（按顺序）
    fn points(&self) -> &[Point];

    /// 某根天线在某点的场值
    fn field(&self, antenna: &str, id: u32) -> Result<&FieldValue>;

    /// 所有天线 id（升序）
    fn antenna_ids(&self) -> Vec<String>;

    /// 是否包含天线
    fn has_antenna(&self, antenna: &str) -> bool {
        self.antenna_ids().iter().any(|a| a == antenna)
    }
}

/// 单根天线在一次仿真中所有点上的场值
#[derive(Clone, Debug)]
pub struct AerialMeasure {
    /// 天线 id，例如 "1"
    pub id: String,
    /// 仿真输出名称（可选）
    pub name: Option<String>,
    /// 频率 (Hz)
    pub frequency: f64,
    /// 点 id -> 场值
    entries: HashMap<u32, FieldValue>,
}

impl AerialMeasure {
    /// 创建天线测量
    pub fn new(id: impl Into<String>, frequency: f64, entries: Vec<FieldValue>) -> Result<Self> {
        let id = id.into();
        if !is_valid_antenna_id(&id) {
            return Err(LocalizationError::InvalidConfig(format!(
                "天线 id 非法: {id:?}"
            )));
        }

        let mut map = HashMap::with_capacity(entries.len());
        for entry in entries {
            if map.insert(entry.id, entry).is_some() {
                return Err(LocalizationError::InconsistentData(format!(
                    "天线 {} 的场值 {} 重复",
                    id, entry.id
                )));
            }
        }

        Ok(AerialMeasure {
            id,
            name: None,
            frequency,
            entries: map,
        })
    }

    /// 从仿真输出名称创建，天线 id 取最后一个 `_` 之后的部分
    ///
    /// 例如 `project_ord_tot_ant_7.cer` 得到 id `"7"`，名称 `project_ord_tot_ant_7`。
    pub fn named(name: &str, frequency: f64, entries: Vec<FieldValue>) -> Result<Self> {
        let stem = name.split('.').next().unwrap_or(name);
        let id = stem.rsplit('_').next().unwrap_or(stem);

        let mut measure = Self::new(id, frequency, entries)?;
        measure.name = Some(stem.to_string());
        Ok(measure)
    }

    /// 获取某点的场值
    pub fn get(&self, id: u32) -> Option<&FieldValue> {
        self.entries.get(&id)
    }

    /// 所有场值（按点 id 升序）
    pub fn values(&self) -> Vec<&FieldValue> {
        let mut values: Vec<&FieldValue> = self.entries.values().collect();
        values.sort_by_key(|fv| fv.id);
        values
    }

    /// 场值数量
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 所有场值引用的点 id
    pub fn point_ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.entries.keys().copied()
    }
}

/// 一次仿真：点集 + 每根天线的测量
///
/// 支持临时子集（cohort）：将有效点缩小为指定 id 的子集，原始点集保留并可恢复。
#[derive(Clone, Debug)]
pub struct Simulation {
    /// 仿真名称
    pub name: String,
    points: Vec<Point>,
    original_points: Vec<Point>,
    cohorted: bool,
    aerial_measures: HashMap<String, AerialMeasure>,
}

impl Simulation {
    /// 创建仿真
    ///
    /// 所有点必须带有唯一 id；每个场值的 id 必须对应某个点。
    pub fn new(
        name: impl Into<String>,
        points: Vec<Point>,
        measures: Vec<AerialMeasure>,
    ) -> Result<Self> {
        let name = name.into();

        let mut ids = HashSet::with_capacity(points.len());
        for point in &points {
            let Some(id) = point.id else {
                return Err(LocalizationError::InconsistentData(format!(
                    "仿真 {name} 中存在无编号的点 ({}, {}, {})",
                    point.x, point.y, point.z
                )));
            };
            if !ids.insert(id) {
                return Err(LocalizationError::InconsistentData(format!(
                    "仿真 {name} 中点 {id} 重复"
                )));
            }
        }

        let mut aerial_measures = HashMap::with_capacity(measures.len());
        for measure in measures {
            if let Some(missing) = measure.point_ids().find(|id| !ids.contains(id)) {
                return Err(LocalizationError::InconsistentData(format!(
                    "天线 {} 的场值引用了仿真 {} 中不存在的点 {}",
                    measure.id, name, missing
                )));
            }
            if aerial_measures.contains_key(&measure.id) {
                return Err(LocalizationError::InconsistentData(format!(
                    "仿真 {} 中天线 {} 重复",
                    name, measure.id
                )));
            }
            aerial_measures.insert(measure.id.clone(), measure);
        }

        debug!(
            simulation = %name,
            points = points.len(),
            antennas = aerial_measures.len(),
            "仿真已创建"
        );

        Ok(Simulation {
            name,
            original_points: points.clone(),
            points,
            cohorted: false,
            aerial_measures,
        })
    }

    /// 获取天线测量
    pub fn aerial_measure(&self, antenna: &str) -> Result<&AerialMeasure> {
        self.aerial_measures
            .get(antenna)
            .ok_or_else(|| LocalizationError::AntennaNotFound {
                simulation: self.name.clone(),
                antenna: antenna.to_string(),
            })
    }

    /// 天线的所有场值（按点 id 升序）
    pub fn fields(&self, antenna: &str) -> Result<Vec<&FieldValue>> {
        Ok(self.aerial_measure(antenna)?.values())
    }

    /// 在有效点中按 id 查找点
    pub fn point(&self, id: u32) -> Result<&Point> {
        self.points
            .iter()
            .find(|p| p.id == Some(id))
            .ok_or_else(|| LocalizationError::PointNotFound {
                simulation: self.name.clone(),
                id,
            })
    }

    /// 按坐标查找有效点对应的场值
    pub fn field_at(&self, antenna: &str, coordinates: &Point) -> Result<&FieldValue> {
        let point = self.points.iter().find(|p| *p == coordinates).ok_or_else(|| {
            LocalizationError::CoordinatesNotFound {
                simulation: self.name.clone(),
                x: coordinates.x,
                y: coordinates.y,
                z: coordinates.z,
            }
        })?;
        match point.id {
            Some(id) => self.field(antenna, id),
            None => Err(LocalizationError::InconsistentData(format!(
                "仿真 {} 中存在无编号的点",
                self.name
            ))),
        }
    }

    /// 将有效点缩小为给定 id 的子集（总是基于原始点集）
    ///
    /// 空列表时仅记录警告；存在未知 id 时返回 `PointNotFound` 且不做修改。
    pub fn cohort(&mut self, ids: &[u32]) -> Result<()> {
        if ids.is_empty() {
            warn!(simulation = %self.name, "未指定子集点 id，未创建子集");
            return Ok(());
        }

        if let Some(&missing) = ids
            .iter()
            .find(|id| !self.original_points.iter().any(|p| p.id == Some(**id)))
        {
            return Err(LocalizationError::PointNotFound {
                simulation: self.name.clone(),
                id: missing,
            });
        }

        let selected: HashSet<u32> = ids.iter().copied().collect();
        self.points = self
            .original_points
            .iter()
            .filter(|p| p.id.is_some_and(|id| selected.contains(&id)))
            .copied()
            .collect();
        self.cohorted = true;
        Ok(())
    }

    /// 恢复原始点集
    pub fn cohort_restore(&mut self) {
        self.points = self.original_points.clone();
        self.cohorted = false;
    }

    /// 当前是否处于子集状态
    pub fn is_cohorted(&self) -> bool {
        self.cohorted
    }

    /// 在作用域内应用子集，守卫释放时恢复之前的点集
    ///
    /// `ids` 为空时不改变点集。
    pub fn cohort_guard(&mut self, ids: &[u32]) -> Result<CohortGuard<'_>> {
        let previous = self.points.clone();
        let was_cohorted = self.cohorted;
        if !ids.is_empty() {
            self.cohort(ids)?;
        }
        Ok(CohortGuard {
            simulation: self,
            previous,
            was_cohorted,
        })
    }

    /// 原始点数量
    pub fn len(&self) -> usize {
        self.original_points.len()
    }

    /// 是否没有任何点
    pub fn is_empty(&self) -> bool {
        self.original_points.is_empty()
    }
}

impl FieldProvider for Simulation {
    fn name(&self) -> &str {
        &self.name
    }

    fn points(&self) -> &[Point] {
        if self.points.is_empty() {
            warn!(simulation = %self.name, "仿真点集为空");
        }
        &self.points
    }

    fn field(&self, antenna: &str, id: u32) -> Result<&FieldValue> {
        self.aerial_measure(antenna)?
            .get(id)
            .ok_or_else(|| LocalizationError::FieldValueNotFound {
                antenna: antenna.to_string(),
                id,
            })
    }

    fn antenna_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.aerial_measures.keys().cloned().collect();
        ids.sort();
        ids
    }

    fn has_antenna(&self, antenna: &str) -> bool {
        self.aerial_measures.contains_key(antenna)
    }
}

/// 子集守卫：释放时将仿真恢复为进入前的点集
pub struct CohortGuard<'a> {
    simulation: &'a mut Simulation,
    previous: Vec<Point>,
    was_cohorted: bool,
}

impl Deref for CohortGuard<'_> {
    type Target = Simulation;

    fn deref(&self) -> &Simulation {
        self.simulation
    }
}

impl DerefMut for CohortGuard<'_> {
    fn deref_mut(&mut self) -> &mut Simulation {
        self.simulation
    }
}

impl Drop for CohortGuard<'_> {
    fn drop(&mut self) {
        self.simulation.points = std::mem::take(&mut self.previous);
        self.simulation.cohorted = self.was_cohorted;
    }
}
