//! 电磁场值与功率推导
//!
//! 支持两种功率计算方式，灵活适配不同的比较需求

use std::fmt;

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::algorithms::point::round_to;

/// dBm 模式下 Z 分量为 0 时的功率值（视为“负无穷”，即无可用信号）
pub const NO_SIGNAL_POWER: f64 = -200.0;

/// 功率公式使用的固定频率 (Hz)
pub const POWER_FREQUENCY_HZ: f64 = 2.4e9;

/// 天线增益 (dBi)，预留项，目前恒为 0
pub const ANTENNA_GAIN_DBI: f64 = 0.0;

/// 辐射功率 (dBm)，预留项，目前恒为 0
pub const RADIATED_POWER_DBM: f64 = 0.0;

/// 光速 (m/s)
const SPEED_OF_LIGHT: f64 = 3e8;

/// 功率计算方式
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerMode {
    /// dBm，仅由 Z 分量推导
    #[default]
    Decibel,
    /// 线性：log10(|Ex|² + |Ey|² + |Ez|²)
    Linear,
}

/// 复数的模：sqrt(re² + im²)
pub fn complex_module(z: Complex64) -> f64 {
    (z.re * z.re + z.im * z.im).sqrt()
}

/// 某个点上、由某根天线产生的电场值
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldValue {
    /// 对应点的 id
    pub id: u32,
    pub ex: Complex64,
    pub ey: Complex64,
    pub ez: Complex64,
}

impl FieldValue {
    pub fn new(id: u32, ex: Complex64, ey: Complex64, ez: Complex64) -> Self {
        FieldValue { id, ex, ey, ez }
    }

    /// 从 (实部, 虚部) 分量创建
    pub fn from_parts(id: u32, ex: (f64, f64), ey: (f64, f64), ez: (f64, f64)) -> Self {
        Self::new(
            id,
            Complex64::new(ex.0, ex.1),
            Complex64::new(ey.0, ey.1),
            Complex64::new(ez.0, ez.1),
        )
    }

    /// 计算功率（3 位小数）
    ///
    /// - `Decibel`：Z 分量模为 0 时返回 [`NO_SIGNAL_POWER`]，否则
    ///   `20·log10(|Ez|) − 10·log10(960) + 20·log10(c/(f·π)) + 10·log10(3/50) + 30`
    /// - `Linear`：分量模平方和为 0 时返回 0，否则取其 log10
    pub fn power(&self, mode: PowerMode) -> f64 {
        let res = match mode {
            PowerMode::Decibel => {
                let ez_module = complex_module(self.ez);
                if ez_module == 0.0 {
                    return NO_SIGNAL_POWER;
                }
                20.0 * ez_module.log10() - 10.0 * (8.0_f64 * 120.0).log10()
                    + ANTENNA_GAIN_DBI
                    + RADIATED_POWER_DBM
                    + 20.0 * (SPEED_OF_LIGHT / (POWER_FREQUENCY_HZ * std::f64::consts::PI)).log10()
                    + 10.0 * (3.0_f64 / 50.0).log10()
                    + 30.0
            }
            PowerMode::Linear => {
                let sum = complex_module(self.ex).powi(2)
                    + complex_module(self.ey).powi(2)
                    + complex_module(self.ez).powi(2);
                if sum != 0.0 { sum.log10() } else { 0.0 }
            }
        };
        round_to(res, 3)
    }

    /// dBm 功率
    pub fn power_dbm(&self) -> f64 {
        self.power(PowerMode::Decibel)
    }

    /// 是否有可用信号（dBm 功率不为哨兵值）
    pub fn has_signal(&self) -> bool {
        self.power_dbm() != NO_SIGNAL_POWER
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Field Value {} - EX: {}, EY: {}, EZ: {}",
            self.id, self.ex, self.ey, self.ez
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_power_dbm() {
        let fv = FieldValue::from_parts(1, (0.0, 0.0), (0.0, 0.0), (1.0, 0.0));
        assert_eq!(fv.power(PowerMode::Decibel), -40.046);

        let fv = FieldValue::from_parts(2, (9.0, 1.0), (2.0, 2.0), (3.0, 4.0));
        assert_eq!(fv.power_dbm(), -26.067);
    }

    #[test]
    fn test_power_dbm_no_signal() {
        let fv = FieldValue::from_parts(1, (5.0, 1.0), (0.3, 2.0), (0.0, 0.0));
        assert_eq!(fv.power(PowerMode::Decibel), NO_SIGNAL_POWER);
        assert!(!fv.has_signal());
    }

    #[test]
    fn test_power_linear() {
        let fv = FieldValue::from_parts(1, (1.0, 0.0), (0.0, 2.0), (3.0, 0.0));
        assert_eq!(fv.power(PowerMode::Linear), 1.146);

        let zero = FieldValue::from_parts(1, (0.0, 0.0), (0.0, 0.0), (0.0, 0.0));
        assert_eq!(zero.power(PowerMode::Linear), 0.0);
    }

    #[test]
    fn test_complex_module() {
        assert_eq!(complex_module(Complex64::new(3.0, 4.0)), 5.0);
    }
}
