use csv::Writer;
use nalgebra::{DMatrix, DVector};
use std::fs::File;
use std::io;

/// Column headers for the accumulated buffers: time, state channels per
/// vehicle, costate blocks, value channels.
pub fn buffer_headers(n: usize) -> Vec<String> {
    let mut headers = Vec::new();
    let state = ["x", "y", "psi", "v"];
    for agent in 1..=2 {
        for i in 0..n {
            let channel = state.get(i).copied().unwrap_or("s");
            headers.push(format!("{}{}", channel, agent));
        }
    }
    for block in ["A11", "A12", "A21", "A22"] {
        for i in 0..n {
            headers.push(format!("{}_{}", block, i + 1));
        }
    }
    headers.push("V1".to_string());
    headers.push("V2".to_string());
    headers
}

/// Save sampled trajectories as CSV, one row per mesh point: the time value
/// followed by one column per channel row of `matrix`.
pub fn save_trajectory_csv(
    t_mesh: &DVector<f64>,
    matrix: &DMatrix<f64>,
    headers: &[String],
    filename: &str,
) -> io::Result<()> {
    let file = File::create(filename)?;
    let mut writer = Writer::from_writer(file);

    let mut headers_with_t = Vec::new();
    headers_with_t.push("t".to_string());
    headers_with_t.extend(headers.iter().cloned());
    writer.write_record(&headers_with_t)?;

    for j in 0..matrix.ncols() {
        let mut row_data = Vec::new();
        row_data.push(t_mesh[j].to_string());
        row_data.extend(matrix.column(j).iter().map(|&val| val.to_string()));
        writer.write_record(&row_data)?;
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{buffer_headers, save_trajectory_csv};
    use nalgebra::{DMatrix, DVector};

    #[test]
    fn test_buffer_headers_layout() {
        let headers = buffer_headers(4);
        assert_eq!(headers.len(), 26);
        assert_eq!(headers[0], "x1");
        assert_eq!(headers[3], "v1");
        assert_eq!(headers[4], "x2");
        assert_eq!(headers[8], "A11_1");
        assert_eq!(headers[24], "V1");
        assert_eq!(headers[25], "V2");
    }

    #[test]
    fn test_csv_round_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("traj.csv");
        let t = DVector::from_vec(vec![0.0, 1.0, 2.0]);
        let m = DMatrix::from_fn(2, 3, |r, c| (r * 10 + c) as f64);
        let headers = vec!["a".to_string(), "b".to_string()];

        save_trajectory_csv(&t, &m, &headers, path.to_str().unwrap()).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next().unwrap(), "t,a,b");
        assert_eq!(lines.next().unwrap(), "0,0,10");
        assert_eq!(lines.next().unwrap(), "1,1,11");
    }
}
