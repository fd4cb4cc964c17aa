use std::{
    fs,
    path::{Path, PathBuf},
};

use plotters::prelude::*;

use crate::{
    error::{Result, TrainErr},
    metrics::MetricsLog,
};

/// Series drawn, in legend order.
pub const DISPLAY_KEYS: [&str; 7] = [
    "l_g_gan",
    "D_logits_diff",
    "psnr_val",
    "l_g_pix",
    "l_g_fea",
    "l_g_range",
    "D_update_ratio",
];

const SIZE: (u32, u32) = (960, 600);

/// A smoothed series ready to be drawn.
#[derive(Debug, Clone)]
struct Curve {
    label: String,
    points: Vec<(f64, f64)>,
}

/// The moving average window for a series of `len` values.
pub fn smoothing_window(len: usize) -> usize {
    let len_f = len as f64;
    (len_f / 20.0).max(len_f.sqrt()).min(1000.0) as usize
}

/// Valid-mode moving average, shorter than `values` by `window - 1`.
pub fn moving_average(values: &[f64], window: usize) -> Vec<f64> {
    if window == 0 || values.len() < window {
        return Vec::new();
    }

    values
        .windows(window)
        .map(|w| w.iter().sum::<f64>() / window as f64)
        .collect()
}

fn smooth(steps: &[f64], values: &[f64]) -> Vec<(f64, f64)> {
    let window = smoothing_window(values.len());
    moving_average(steps, window)
        .into_iter()
        .zip(moving_average(values, window))
        .collect()
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len().max(1) as f64
}

/// Shifts to zero mean and scales to unit deviation, constant series are only shifted.
fn z_normalize(values: &[f64]) -> Vec<f64> {
    let mu = mean(values);
    let var = values.iter().map(|v| (v - mu).powi(2)).sum::<f64>() / values.len().max(1) as f64;
    let std = var.sqrt();

    values
        .iter()
        .map(|v| if std > 0.0 { (v - mu) / std } else { v - mu })
        .collect()
}

/// Draws `logs.svg` with every displayed series normalized, and `logs_<key>.svg` per series.
///
/// # Returns
/// The paths of every document written.
pub fn plot_log<P: AsRef<Path>>(log: &MetricsLog, dir: P) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    let mut written = Vec::new();
    let mut combined = Vec::new();

    for key in DISPLAY_KEYS {
        let series = log.series(key);
        if series.is_empty() {
            continue;
        }

        let steps: Vec<f64> = series.iter().map(|&(s, _)| s as f64).collect();
        let values: Vec<f64> = series.iter().map(|&(_, v)| v).collect();
        let avg = mean(&values);

        let curve = Curve {
            label: format!("{key} ({avg:.2e})"),
            points: smooth(&steps, &values),
        };
        let path = dir.join(format!("logs_{key}.svg"));
        draw(&path, &[curve])?;
        written.push(path);

        let (label, values) = if key == "psnr_val" {
            let mse: Vec<f64> = values.iter().map(|p| 255.0 * (-p / 20.0).exp()).collect();
            (format!("MSE_val ({key}:{avg:.2e})"), mse)
        } else {
            (format!("{key} ({avg:.2e})"), values)
        };
        combined.push(Curve {
            label,
            points: smooth(&steps, &z_normalize(&values)),
        });
    }

    if !combined.is_empty() {
        let path = dir.join("logs.svg");
        draw(&path, &combined)?;
        written.push(path);
    }

    Ok(written)
}

fn bounds(curves: &[Curve]) -> ((f64, f64), (f64, f64)) {
    let points = curves.iter().flat_map(|c| c.points.iter());
    let (mut x0, mut x1, mut y0, mut y1) = (f64::MAX, f64::MIN, f64::MAX, f64::MIN);

    for &(x, y) in points.filter(|(x, y)| x.is_finite() && y.is_finite()) {
        x0 = x0.min(x);
        x1 = x1.max(x);
        y0 = y0.min(y);
        y1 = y1.max(y);
    }

    if x0 > x1 {
        return ((0.0, 1.0), (0.0, 1.0));
    }

    let pad = |lo: f64, hi: f64| {
        if hi - lo < 1e-12 {
            (lo - 0.5, hi + 0.5)
        } else {
            (lo, hi)
        }
    };

    (pad(x0, x1), pad(y0, y1))
}

fn draw(path: &Path, curves: &[Curve]) -> Result<()> {
    let root = SVGBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| TrainErr::Plot(format!("backend error: {e}")))?;

    let ((x0, x1), (y0, y1)) = bounds(curves);

    {
        let mut chart = ChartBuilder::on(&root)
            .margin(10)
            .set_label_area_size(LabelAreaPosition::Left, 60)
            .set_label_area_size(LabelAreaPosition::Bottom, 40)
            .build_cartesian_2d(x0..x1, y0..y1)
            .map_err(|e| TrainErr::Plot(format!("chart build error: {e}")))?;

        chart
            .configure_mesh()
            .x_desc("Steps")
            .draw()
            .map_err(|e| TrainErr::Plot(format!("mesh error: {e}")))?;

        for (i, curve) in curves.iter().enumerate() {
            let color = Palette99::pick(i).to_rgba();
            chart
                .draw_series(LineSeries::new(curve.points.iter().copied(), &color))
                .map_err(|e| TrainErr::Plot(format!("draw error: {e}")))?
                .label(curve.label.clone())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &color));
        }

        chart
            .configure_series_labels()
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()
            .map_err(|e| TrainErr::Plot(format!("legend error: {e}")))?;
    }

    root.present()
        .map_err(|e| TrainErr::Plot(format!("render error: {e}")))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_length() {
        assert_eq!(smoothing_window(1), 1);
        assert_eq!(smoothing_window(10), 3);
        assert_eq!(smoothing_window(400), 20);
        assert_eq!(smoothing_window(10_000), 500);
        assert_eq!(smoothing_window(100_000_000), 1000);
    }

    #[test]
    fn valid_moving_average() {
        assert_eq!(moving_average(&[1.0, 2.0, 3.0, 4.0], 2), [1.5, 2.5, 3.5]);
        assert_eq!(moving_average(&[1.0, 2.0], 1), [1.0, 2.0]);
        assert!(moving_average(&[1.0], 2).is_empty());
    }

    #[test]
    fn z_normalized_series() {
        let z = z_normalize(&[1.0, 3.0]);
        assert_eq!(z, [-1.0, 1.0]);
        assert_eq!(z_normalize(&[2.0, 2.0]), [0.0, 0.0]);
    }

    #[test]
    fn writes_one_document_per_series_plus_the_combined_one() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = MetricsLog::new();
        for step in 0..30 {
            log.append("l_g_gan", step, 1.0 / (step + 1) as f64);
            log.append("psnr_val", step, 20.0 + step as f64 * 0.1);
        }
        log.append("l_d_real", 0, 1.0);

        let written = plot_log(&log, dir.path()).unwrap();

        assert_eq!(written.len(), 3);
        for name in ["logs_l_g_gan.svg", "logs_psnr_val.svg", "logs.svg"] {
            let svg = fs::read_to_string(dir.path().join(name)).unwrap();
            assert!(svg.starts_with("<svg") || svg.starts_with("<?xml"));
        }
        assert!(!dir.path().join("logs_l_d_real.svg").exists());
    }
}
