//! 三维点定义与几何运算
//!
//! 距离保留 2 位小数；中心点各坐标保留 2 位小数。

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{LocalizationError, Result};

/// 三维空间中的点
///
/// `id` 仅作为标签（与场值关联），相等性只比较坐标。
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Point {
    /// 点编号（仿真中从 1 开始）
    pub id: Option<u32>,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point {
    /// 创建无编号的点
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Point { id: None, x, y, z }
    }

    /// 创建带编号的点
    pub fn with_id(id: u32, x: f64, y: f64, z: f64) -> Self {
        Point {
            id: Some(id),
            x,
            y,
            z,
        }
    }

    /// 获取 3D 坐标
    pub fn coordinates(&self) -> (f64, f64, f64) {
        (self.x, self.y, self.z)
    }

    /// 与另一点的欧几里得距离（2 位小数）
    pub fn distance_to(&self, other: &Point) -> f64 {
        distance(self, other)
    }
}

impl PartialEq for Point {
    fn eq(&self, other: &Self) -> bool {
        (self.x, self.y, self.z) == (other.x, other.y, other.z)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            Some(id) => write!(f, "Point {} - X: {} Y: {}", id, self.x, self.y),
            None => write!(f, "X: {} Y: {}", self.x, self.y),
        }
    }
}

/// 三维边界框，用于生成随机点
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct VectorShape {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
    pub z_min: f64,
    pub z_max: f64,
}

impl VectorShape {
    pub fn new(x_min: f64, x_max: f64, y_min: f64, y_max: f64, z_min: f64, z_max: f64) -> Self {
        VectorShape {
            x_min,
            x_max,
            y_min,
            y_max,
            z_min,
            z_max,
        }
    }

    /// 点是否位于边界内（含边界）
    pub fn contains(&self, point: &Point) -> bool {
        (self.x_min..=self.x_max).contains(&point.x)
            && (self.y_min..=self.y_max).contains(&point.y)
            && (self.z_min..=self.z_max).contains(&point.z)
    }

    fn validate(&self) -> Result<()> {
        let axes = [
            ("x", self.x_min, self.x_max),
            ("y", self.y_min, self.y_max),
            ("z", self.z_min, self.z_max),
        ];
        for (axis, min, max) in axes {
            if !(min <= max) {
                return Err(LocalizationError::InvalidArgument(format!(
                    "边界框 {axis} 轴非法: [{min}, {max}]"
                )));
            }
        }
        Ok(())
    }
}

/// 四舍五入到指定小数位
///
/// 恰好落在中点的值远离 0 舍入（`0.125` 保留 2 位为 `0.13`，`-2.5` 取整为 `-3`），
/// 不采用银行家舍入。
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10_f64.powi(decimals);
    (value * factor).round() / factor
}

/// 补偿求和（Neumaier），避免多项相加时的精度损失
pub fn compensated_sum<I: IntoIterator<Item = f64>>(values: I) -> f64 {
    let mut sum = 0.0;
    let mut compensation = 0.0;
    for value in values {
        let t = sum + value;
        if sum.abs() >= value.abs() {
            compensation += (sum - t) + value;
        } else {
            compensation += (value - t) + sum;
        }
        sum = t;
    }
    sum + compensation
}

/// 两点间的欧几里得距离（2 位小数）
pub fn distance(a: &Point, b: &Point) -> f64 {
    let squares = [
        (b.x - a.x).powi(2),
        (b.y - a.y).powi(2),
        (b.z - a.z).powi(2),
    ];
    round_to(compensated_sum(squares).sqrt(), 2)
}

/// 点集的几何中心，各坐标保留 2 位小数
///
/// 空点集返回 `InvalidArgument`。
pub fn center(points: &[Point]) -> Result<Point> {
    if points.is_empty() {
        return Err(LocalizationError::InvalidArgument(
            "无法计算空点集的中心".to_string(),
        ));
    }

    let count = points.len() as f64;
    let x = points.iter().map(|p| p.x).sum::<f64>() / count;
    let y = points.iter().map(|p| p.y).sum::<f64>() / count;
    let z = points.iter().map(|p| p.z).sum::<f64>() / count;

    Ok(Point::new(round_to(x, 2), round_to(y, 2), round_to(z, 2)))
}

/// 三点平面夹角（度，范围 [0, 360)）
///
/// 第一个点为基点，返回向量 (第二点 - 基点) 与 (第三点 - 基点) 的方位角之差。
pub fn angle(points: &[Point]) -> Result<f64> {
    let [base, second, third] = points else {
        return Err(LocalizationError::InvalidArgument(format!(
            "计算角度需要恰好 3 个点，实际为 {}",
            points.len()
        )));
    };

    let ang_a = (second.y - base.y).atan2(second.x - base.x);
    let ang_b = (third.y - base.y).atan2(third.x - base.x);
    let degrees = (ang_a - ang_b).rem_euclid(2.0 * std::f64::consts::PI).to_degrees();

    // rem_euclid 可能因舍入得到 2π
    Ok(if degrees >= 360.0 { 0.0 } else { degrees })
}

/// 将点按绕中心的角度排序，得到不自交的多边形顶点序列
///
/// 以 x 最小的点为起点（并列时取最先出现者），其余点按
/// `angle([center, 起点, 点])` 升序稳定排序。
pub fn polygon_order(center: &Point, points: &[Point]) -> Vec<Point> {
    let Some((pivot_idx, pivot)) = points
        .iter()
        .enumerate()
        .fold(None::<(usize, &Point)>, |best, (idx, p)| match best {
            Some((_, b)) if p.x >= b.x => best,
            _ => Some((idx, p)),
        })
    else {
        return Vec::new();
    };

    let mut angles: Vec<(Point, f64)> = vec![(*pivot, 0.0)];
    for (idx, p) in points.iter().enumerate() {
        if idx == pivot_idx {
            continue;
        }
        // 三个点，角度计算不会失败
        let a = angle(&[*center, *pivot, *p]).unwrap_or(0.0);
        angles.push((*p, a));
    }

    angles.sort_by(|a, b| a.1.total_cmp(&b.1));
    angles.into_iter().map(|(p, _)| p).collect()
}

/// 在点集中查找与 `a` 距离最小的所有点
///
/// 返回并列最近的点（按原顺序）与最小距离；空点集返回 `(vec![], None)`。
pub fn closest_points(a: &Point, map: &[Point]) -> (Vec<Point>, Option<f64>) {
    let distances: Vec<(f64, &Point)> = map.iter().map(|p| (distance(a, p), p)).collect();
    let min = distances.iter().map(|(d, _)| *d).reduce(f64::min);

    match min {
        Some(min) => (
            distances
                .into_iter()
                .filter(|(d, _)| *d == min)
                .map(|(_, p)| *p)
                .collect(),
            Some(min),
        ),
        None => (Vec::new(), None),
    }
}

fn sample_axis<R: Rng>(rng: &mut R, min: f64, max: f64) -> f64 {
    if min == max { min } else { rng.gen_range(min..=max) }
}

/// 在边界框内生成 `number` 个随机点
///
/// 坐标保留 1 位小数，按 (x, y, z) 排序后依次编号 1..=number。
pub fn random_points<R: Rng>(
    number: usize,
    shape: &VectorShape,
    rng: &mut R,
) -> Result<Vec<Point>> {
    shape.validate()?;

    let mut coords: Vec<(f64, f64, f64)> = (0..number)
        .map(|_| {
            (
                round_to(sample_axis(rng, shape.x_min, shape.x_max), 1),
                round_to(sample_axis(rng, shape.y_min, shape.y_max), 1),
                round_to(sample_axis(rng, shape.z_min, shape.z_max), 1),
            )
        })
        .collect();

    coords.sort_by(|a, b| {
        a.0.total_cmp(&b.0)
            .then(a.1.total_cmp(&b.1))
            .then(a.2.total_cmp(&b.2))
    });

    Ok(coords
        .into_iter()
        .enumerate()
        .map(|(idx, (x, y, z))| Point::with_id(idx as u32 + 1, x, y, z))
        .collect())
}
