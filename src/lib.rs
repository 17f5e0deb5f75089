//! 基于电磁场指纹的室内定位库
//!
//! 支持的功能：
//! - 参考点 / 移动点的仿真数据模型（点、天线测量、场值）
//! - 场值功率推导（线性 / dBm）
//! - 两种定位算法：射线追踪（最近指纹）与模糊地图（阈值交集）
//! - 批量估计与精度统计

pub mod algorithms;
pub mod error;
pub mod logging;
pub mod positioning;

pub use error::{LocalizationError, Result};
