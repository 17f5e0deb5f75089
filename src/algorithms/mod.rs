//! 指纹定位算法模块
//!
//! 该模块提供基于电磁场指纹的室内定位实现，支持：
//! - 点、场值、天线测量与仿真的数据模型
//! - 线性 / dBm 两种功率推导方式
//! - 射线追踪与模糊地图两种定位算法
//! - 估计误差统计与汇总报告

pub mod estimation;
pub mod field_value;
pub mod point;
pub mod results;
pub mod simulation;

pub use estimation::*;
pub use field_value::*;
pub use point::*;
pub use results::*;
pub use simulation::*;
