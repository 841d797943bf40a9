#[cfg(test)]
mod tests {
    use crate::generator::dataset::{
        DatasetError, SaveOutcome, Split, TrajectoryBuffers, dataset_path, fresh_archive,
        load_archive, merge_into, save_dataset,
    };
    use crate::problem::narrow_road::NarrowRoadProblem;
    use approx::assert_relative_eq;
    use nalgebra::{DMatrix, DVector};
    use std::fs;

    fn synthetic_buffers(npts: usize, offset: f64) -> TrajectoryBuffers {
        TrajectoryBuffers {
            t: DVector::from_fn(npts, |i, _| i as f64 * 0.5),
            X: DMatrix::from_fn(8, npts, |r, c| offset + r as f64 + 0.1 * c as f64),
            A: DMatrix::from_fn(16, npts, |r, c| offset - r as f64 + 0.2 * c as f64),
            V: DMatrix::from_fn(2, npts, |r, c| offset + 10.0 * r as f64 + c as f64),
        }
    }

    #[test]
    fn test_dataset_path_pattern() {
        let path = dataset_path("data", "narrow_road", Split::Train);
        assert_eq!(path.to_str().unwrap(), "data/data_train_narrow_road.json");
        let path = dataset_path("data", "narrow_road", Split::Val);
        assert_eq!(path.to_str().unwrap(), "data/data_val_narrow_road.json");
    }

    #[test]
    fn test_split_from_choice() {
        assert_eq!(Split::from_choice(0), Split::Val);
        assert_eq!(Split::from_choice(1), Split::Train);
        assert_eq!(Split::from_choice(5), Split::Train);
    }

    #[test]
    fn test_fresh_archive_channels_and_bounds() {
        let problem = NarrowRoadProblem::default();
        let buffers = synthetic_buffers(5, 0.0);
        let archive = fresh_archive(&problem, &buffers);

        assert_eq!(archive.t.len(), 5);
        assert_eq!(archive.X.len(), 8);
        assert_eq!(archive.A.len(), 16);
        assert_eq!(archive.V.len(), 2);
        assert_eq!(archive.U.len(), 2);
        assert_eq!(archive.U[0].len(), 5);

        // rows grow with the column index, so bounds sit at the edges
        assert_relative_eq!(archive.lb_1[0], 0.0, epsilon = 1e-12);
        assert_relative_eq!(archive.ub_1[0], 0.4, epsilon = 1e-12);
        assert_relative_eq!(archive.lb_2[0], 4.0, epsilon = 1e-12);
        assert_relative_eq!(archive.A_lb_11[2], -2.0, epsilon = 1e-12);
        assert_relative_eq!(archive.A_ub_11[2], -1.2, epsilon = 1e-12);
        assert_relative_eq!(archive.V_min_1, 0.0, epsilon = 1e-12);
        assert_relative_eq!(archive.V_max_1, 4.0, epsilon = 1e-12);
        assert_relative_eq!(archive.V_min_2, 10.0, epsilon = 1e-12);
        assert_relative_eq!(archive.V_max_2, 14.0, epsilon = 1e-12);

        // control recovery from the own-speed costate rows, clamped
        let expected_u1 = problem.clamp_control(archive.A[3][0] / 2.0);
        assert_relative_eq!(archive.U[0][0], expected_u1, epsilon = 1e-12);
    }

    #[test]
    fn test_save_creates_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dataset_path(dir.path().to_str().unwrap(), "narrow_road", Split::Val);
        let problem = NarrowRoadProblem::default();
        let buffers = synthetic_buffers(4, 1.0);

        let (outcome, total) = save_dataset(&path, &problem, &buffers, || {
            panic!("no archive yet, must not prompt")
        })
        .unwrap();
        assert_eq!(outcome, SaveOutcome::Created);
        assert_eq!(total, 4);

        let reloaded = load_archive(&path).unwrap().unwrap();
        assert_eq!(reloaded.t.len(), 4);
        assert_eq!(reloaded.X[0].len(), 4);
    }

    #[test]
    fn test_merge_appends_and_keeps_bounds() {
        let dir = tempfile::tempdir().unwrap();
        let path = dataset_path(dir.path().to_str().unwrap(), "narrow_road", Split::Train);
        let problem = NarrowRoadProblem::default();

        let first = synthetic_buffers(3, 0.0);
        save_dataset(&path, &problem, &first, || panic!("no prompt on create")).unwrap();
        let original = load_archive(&path).unwrap().unwrap();

        // second batch with a wider range; declining the overwrite prompt
        // appends without touching bounds or U
        let second = synthetic_buffers(5, 100.0);
        let (outcome, total) = save_dataset(&path, &problem, &second, || false).unwrap();
        assert_eq!(outcome, SaveOutcome::Merged);
        assert_eq!(total, 8);

        let merged = load_archive(&path).unwrap().unwrap();
        assert_eq!(merged.t.len(), 8);
        assert_eq!(merged.X[0].len(), 8);
        assert_eq!(merged.lb_1, original.lb_1);
        assert_eq!(merged.ub_1, original.ub_1);
        assert_eq!(merged.V_max_1, original.V_max_1);
        assert_eq!(merged.U[0].len(), original.U[0].len());
    }

    #[test]
    fn test_overwrite_recomputes_bounds() {
        let dir = tempfile::tempdir().unwrap();
        let path = dataset_path(dir.path().to_str().unwrap(), "narrow_road", Split::Train);
        let problem = NarrowRoadProblem::default();

        save_dataset(&path, &problem, &synthetic_buffers(3, 0.0), || {
            panic!("no prompt on create")
        })
        .unwrap();
        let (outcome, total) =
            save_dataset(&path, &problem, &synthetic_buffers(5, 100.0), || true).unwrap();
        assert_eq!(outcome, SaveOutcome::Overwritten);
        assert_eq!(total, 5);

        let archive = load_archive(&path).unwrap().unwrap();
        assert_eq!(archive.t.len(), 5);
        assert_relative_eq!(archive.lb_1[0], 100.0, epsilon = 1e-12);
    }

    #[test]
    fn test_merge_in_memory() {
        let problem = NarrowRoadProblem::default();
        let mut archive = fresh_archive(&problem, &synthetic_buffers(2, 0.0));
        let before_bounds = archive.ub_1.clone();

        merge_into(&mut archive, &synthetic_buffers(3, 50.0));
        assert_eq!(archive.t.len(), 5);
        assert_eq!(archive.A[7].len(), 5);
        assert_eq!(archive.ub_1, before_bounds);
    }

    #[test]
    fn test_malformed_archive_is_surfaced_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data_train_narrow_road.json");
        fs::write(&path, "{ definitely not json").unwrap();

        let problem = NarrowRoadProblem::default();
        let buffers = synthetic_buffers(2, 0.0);
        let err = save_dataset(&path, &problem, &buffers, || true).unwrap_err();
        assert!(matches!(err, DatasetError::Malformed { .. }), "{err}");
        // the broken file is left in place for inspection
        assert_eq!(fs::read_to_string(&path).unwrap(), "{ definitely not json");
    }

    #[test]
    fn test_empty_buffers_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data_val_narrow_road.json");
        let problem = NarrowRoadProblem::default();
        let empty = TrajectoryBuffers {
            t: DVector::zeros(0),
            X: DMatrix::zeros(8, 0),
            A: DMatrix::zeros(16, 0),
            V: DMatrix::zeros(2, 0),
        };
        let err = save_dataset(&path, &problem, &empty, || true).unwrap_err();
        assert!(matches!(err, DatasetError::Empty), "{err}");
        assert!(!path.exists());
    }

    #[test]
    fn test_identical_buffers_write_identical_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let problem = NarrowRoadProblem::default();
        let buffers = synthetic_buffers(6, 2.0);

        let path_a = dir.path().join("a.json");
        let path_b = dir.path().join("b.json");
        save_dataset(&path_a, &problem, &buffers, || false).unwrap();
        save_dataset(&path_b, &problem, &buffers, || false).unwrap();
        assert_eq!(fs::read(&path_a).unwrap(), fs::read(&path_b).unwrap());
    }
}
