//! 定位库的错误类型

use thiserror::Error;

/// 定位库错误
#[derive(Debug, Error)]
pub enum LocalizationError {
    /// 配置错误（算法名未知、天线列表非法、参数越界等）
    #[error("配置错误: {0}")]
    InvalidConfig(String),

    /// 参数错误（角度计算的点数不为 3、空点集求中心等）
    #[error("参数错误: {0}")]
    InvalidArgument(String),

    /// 仿真中不存在指定 id 的点
    #[error("仿真 {simulation} 中不存在点 {id}")]
    PointNotFound { simulation: String, id: u32 },

    /// 仿真中不存在指定坐标的点
    #[error("仿真 {simulation} 中不存在坐标为 ({x}, {y}, {z}) 的点")]
    CoordinatesNotFound {
        simulation: String,
        x: f64,
        y: f64,
        z: f64,
    },

    /// 仿真中不存在指定天线
    #[error("仿真 {simulation} 中不存在天线 {antenna}")]
    AntennaNotFound { simulation: String, antenna: String },

    /// 天线测量中不存在指定点的场值
    #[error("天线 {antenna} 没有点 {id} 的场值")]
    FieldValueNotFound { antenna: String, id: u32 },

    /// 数据不一致（场值引用了不存在的点等）
    #[error("数据不一致: {0}")]
    InconsistentData(String),

    /// 批量估计被调用方取消
    #[error("估计已取消")]
    Cancelled,

    /// JSON 解析错误
    #[error("JSON 解析错误: {0}")]
    Json(#[from] serde_json::Error),
}

/// 定位库的 Result 别名
pub type Result<T> = std::result::Result<T, LocalizationError>;
