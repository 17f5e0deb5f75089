//! 集成测试共用的仿真构造函数

#![allow(dead_code)]

use fingernav::algorithms::*;

/// 按坐标与每根天线的 Ez 实部构造仿真，点 id 从 1 开始
pub fn simulation(
    name: &str,
    coords: &[(f64, f64, f64)],
    antennas: &[(&str, Vec<f64>)],
) -> Simulation {
    let points = coords
        .iter()
        .enumerate()
        .map(|(i, (x, y, z))| Point::with_id(i as u32 + 1, *x, *y, *z))
        .collect();

    let measures = antennas
        .iter()
        .map(|(id, values)| {
            let entries = values
                .iter()
                .enumerate()
                .map(|(i, ez)| {
                    FieldValue::from_parts(i as u32 + 1, (0.1, 0.0), (0.0, 0.1), (*ez, 0.0))
                })
                .collect();
            AerialMeasure::new(*id, 2.4e9, entries).unwrap()
        })
        .collect();

    Simulation::new(name, points, measures).unwrap()
}

/// 单位正方形四个角上的参考集，两根天线场值恒定
pub fn unit_square_reference() -> Simulation {
    simulation(
        "fingerprints",
        &[(0.0, 0.0, 0.0), (1.0, 0.0, 0.0), (0.0, 1.0, 0.0), (1.0, 1.0, 0.0)],
        &[("1", vec![0.5; 4]), ("2", vec![0.25; 4])],
    )
}

/// 一条直线上的参考集，Ez 随 x 增大
pub fn line_reference(count: usize) -> Simulation {
    let coords: Vec<(f64, f64, f64)> = (0..count).map(|i| (i as f64, 0.0, 1.5)).collect();
    let a1: Vec<f64> = (0..count).map(|i| 1.0 + i as f64 * 0.1).collect();
    let a2: Vec<f64> = (0..count).map(|i| 2.0 - i as f64 * 0.05).collect();
    simulation("line", &coords, &[("1", a1), ("2", a2)])
}

pub fn ids(points: &[Point]) -> Vec<u32> {
    points.iter().filter_map(|p| p.id).collect()
}
