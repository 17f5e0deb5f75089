/// 算法模块综合测试
///
/// 展示如何使用 algorithms 模块中的数据模型与两种定位算法
mod common;

#[cfg(test)]
mod tests {
    use crate::common::{ids, line_reference, simulation, unit_square_reference};
    use fingernav::algorithms::*;

    fn antennas(list: &[&str]) -> Vec<String> {
        list.iter().map(|a| a.to_string()).collect()
    }

    #[test]
    fn test_algorithm_module_geometry() {
        let a = Point::with_id(1, 0.1, 0.2, 1.5);
        let b = Point::new(3.1, 4.2, 1.5);

        assert_eq!(distance(&a, &a), 0.0);
        assert_eq!(distance(&a, &b), distance(&b, &a));
        assert_eq!(a.distance_to(&b), 5.0);
        assert_eq!(center(&[a]).unwrap(), a);
        assert!(angle(&[a, b]).is_err());
    }

    #[test]
    fn test_algorithm_module_power_sentinel() {
        // X/Y 分量不影响 dBm 功率，Z 分量为 0 时恒为 -200
        for (ex, ey) in [((0.0, 0.0), (0.0, 0.0)), ((5.0, -1.0), (2.0, 3.0))] {
            let fv = FieldValue::from_parts(1, ex, ey, (0.0, 0.0));
            assert_eq!(fv.power(PowerMode::Decibel), NO_SIGNAL_POWER);
        }
    }

    #[test]
    fn test_algorithm_module_unit_square_raytracing() {
        let reference = unit_square_reference();
        let mobile = simulation(
            "mobiles",
            &[(0.5, 0.5, 0.0)],
            &[("1", vec![0.5]), ("2", vec![0.25])],
        );

        let estimations = EstimationAlgorithm::raytracing(
            &mobile,
            &reference,
            &antennas(&["1", "2"]),
            4,
            PowerMode::Decibel,
        )
        .unwrap();

        assert_eq!(estimations.len(), 1);
        let est = &estimations[0];
        println!("射线追踪结果: {}", est.detailed_description());

        assert!(est.was_estimated);
        assert_eq!(ids(&est.selected_fingerprints), vec![1, 2, 3, 4]);
        assert_eq!(est.estimated_point, Some(Point::new(0.5, 0.5, 0.0)));
        assert_eq!(est.error, Some(0.0));
        assert_eq!(est.inputs.len(), 4);
        assert!(est.inputs.iter().all(|i| i.aggregate_squared_error == 0.0));
    }

    #[test]
    fn test_algorithm_module_silent_mobile() {
        let reference = unit_square_reference();
        let mobile = simulation(
            "mobiles",
            &[(0.5, 0.5, 0.0)],
            &[("1", vec![0.0]), ("2", vec![0.0])],
        );
        let antennas = antennas(&["1", "2"]);

        let mode = PowerMode::Decibel;
        let ray = EstimationAlgorithm::raytracing(&mobile, &reference, &antennas, 4, mode).unwrap();
        let fuzzy =
            EstimationAlgorithm::fuzzymap(&mobile, &reference, &antennas, 100.0, mode).unwrap();

        for est in ray.iter().chain(fuzzy.iter()) {
            assert!(!est.was_estimated);
            assert!(est.selected_fingerprints.is_empty());
            assert!(est.estimated_point.is_none());
            assert_eq!(est.inputs.len(), 4);
            assert!(est.inputs.iter().all(|i| i.power_measures.is_empty()));
        }
        assert_eq!(mean_error(&ray), NO_ESTIMATION_ERROR);
        assert_eq!(stdev_error(&fuzzy), NO_ESTIMATION_ERROR);
    }

    #[test]
    fn test_algorithm_module_partial_signal() {
        // 天线 2 上移动点无信号：只用天线 1 比较
        let reference = line_reference(5);
        let mobile = simulation(
            "mobiles",
            &[(2.0, 0.0, 1.5)],
            &[("1", vec![1.2]), ("2", vec![0.0])],
        );

        let est = EstimationAlgorithm::raytracing_point(
            &mobile,
            &reference,
            &mobile.points()[0],
            &antennas(&["1", "2"]),
            1,
            PowerMode::Decibel,
        )
        .unwrap();

        assert!(est.inputs.iter().all(|i| i.power_measures.len() == 1));
        assert!(est.inputs.iter().all(|i| i.power_measure("2").is_none()));
        assert_eq!(ids(&est.selected_fingerprints), vec![3]);
        assert_eq!(est.error, Some(0.0));
    }

    #[test]
    fn test_algorithm_module_raytracing_k() {
        let reference = line_reference(10);
        let mobile = simulation(
            "mobiles",
            &[(3.0, 0.0, 1.5), (7.0, 0.0, 1.5)],
            &[("1", vec![1.3, 1.7]), ("2", vec![1.85, 1.65])],
        );
        let antennas = antennas(&["1", "2"]);
        let mode = PowerMode::Decibel;

        for k in [1, 3, 4, 10, 25] {
            let estimations =
                EstimationAlgorithm::raytracing(&mobile, &reference, &antennas, k, mode).unwrap();
            for est in &estimations {
                assert_eq!(est.selected_fingerprints.len(), k.min(10));
            }
        }

        let nearest =
            EstimationAlgorithm::raytracing(&mobile, &reference, &antennas, 1, PowerMode::Decibel)
                .unwrap();
        assert_eq!(ids(&nearest[0].selected_fingerprints), vec![4]);
        assert_eq!(ids(&nearest[1].selected_fingerprints), vec![8]);
    }

    #[test]
    fn test_algorithm_module_fuzzymap_intersection() {
        let reference = line_reference(10);
        let mobile = simulation(
            "mobiles",
            &[(3.0, 0.0, 1.5)],
            &[("1", vec![1.3]), ("2", vec![1.85])],
        );
        let point = mobile.points()[0];

        let only_first = EstimationAlgorithm::fuzzymap_point(
            &mobile,
            &reference,
            &point,
            &antennas(&["1"]),
            1.0,
            PowerMode::Decibel,
        )
        .unwrap();
        let both = EstimationAlgorithm::fuzzymap_point(
            &mobile,
            &reference,
            &point,
            &antennas(&["1", "2"]),
            1.0,
            PowerMode::Decibel,
        )
        .unwrap();

        println!("天线 1: {:?}", ids(&only_first.selected_fingerprints));
        println!("天线 1+2: {:?}", ids(&both.selected_fingerprints));

        assert!(both.was_estimated);
        for p in &both.selected_fingerprints {
            assert!(only_first.selected_fingerprints.contains(p));
        }
        assert!(both.selected_fingerprints.contains(&Point::new(3.0, 0.0, 1.5)));

        let rows = both.power_rows(true);
        assert!(rows.iter().all(|r| r.mobile_id == Some(1)));
        assert!(rows.len() <= both.power_rows(false).len());
    }

    #[test]
    fn test_algorithm_module_linear_mode() {
        let reference = unit_square_reference();
        let mobile = simulation(
            "mobiles",
            &[(0.5, 0.5, 0.0)],
            &[("1", vec![0.5]), ("2", vec![0.25])],
        );

        let est = EstimationAlgorithm::fuzzymap(
            &mobile,
            &reference,
            &antennas(&["1", "2"]),
            0.0,
            PowerMode::Linear,
        )
        .unwrap();
        assert_eq!(est[0].selected_fingerprints.len(), 4);
        assert!(
            est[0].inputs[0]
                .power_measures
                .iter()
                .all(|m| m.in_threshold && m.mpower == m.fpower)
        );
    }

    #[test]
    fn test_algorithm_module_metrics_workflow() {
        println!("\n========== 完整工作流演示 ==========\n");

        let reference = line_reference(20);
        let mobile = simulation(
            "mobiles",
            &[(2.4, 0.0, 1.5), (9.6, 0.0, 1.5), (15.0, 0.0, 1.5)],
            &[("1", vec![1.24, 1.96, 2.5]), ("2", vec![1.88, 1.52, 1.25])],
        );
        let antennas = antennas(&["1", "2"]);

        let estimations =
            EstimationAlgorithm::raytracing(&mobile, &reference, &antennas, 2, PowerMode::Decibel)
                .unwrap();
        for est in &estimations {
            println!("  {}", est);
        }

        let report = EstimationReport::new("workflow", "raytracing", &antennas, &estimations);
        println!("  {}", report);

        assert_eq!(report.total, 3);
        assert_eq!(report.estimated, 3);
        assert!(report.mean_error >= 0.0);
        assert!(report.stdev_error.is_some_and(|s| s >= 0.0));

        println!("\n========== 演示完成 ==========\n");
    }
}
