use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use log::debug;
use ndarray::{ArrayView4, Zip};
use serde::Deserialize;

use crate::error::{Result, TrainErr};

/// Series every run starts with, even before anything is appended to them.
pub const INITIAL_KEYS: [&str; 11] = [
    "l_g_pix",
    "l_g_fea",
    "l_g_range",
    "l_g_gan",
    "l_d_real",
    "l_d_fake",
    "D_real",
    "D_fake",
    "D_logits_diff",
    "psnr_val",
    "D_update_ratio",
];

pub const LOG_FILE: &str = "logs.json";

/// Per-key series of `(gradient_step, value)` pairs.
///
/// Series are only ever appended to during a run, a load replaces the whole log.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsLog {
    series: BTreeMap<String, Vec<(usize, f64)>>,
}

impl Default for MetricsLog {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsLog {
    pub fn new() -> Self {
        let series = INITIAL_KEYS
            .iter()
            .map(|key| (key.to_string(), Vec::new()))
            .collect();

        Self { series }
    }

    pub fn append(&mut self, key: &str, step: usize, value: f64) {
        self.series
            .entry(key.to_string())
            .or_default()
            .push((step, value));
    }

    /// Appends every entry of `flush` at its gradient step.
    pub fn record(&mut self, flush: Flush) {
        debug!(step = flush.step, entries = flush.entries.len(); "flushing window means");

        for (key, value) in flush.entries {
            self.append(key, flush.step, value);
        }
    }

    /// The series for `key`, empty when nothing was ever logged under it.
    pub fn series(&self, key: &str) -> &[(usize, f64)] {
        self.series.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    /// The latest value of every non-empty series.
    pub fn latest(&self) -> BTreeMap<String, f64> {
        self.series
            .iter()
            .filter_map(|(key, values)| values.last().map(|&(_, v)| (key.clone(), v)))
            .collect()
    }

    /// Writes the log as `logs.json` into `dir`.
    pub fn save<P: AsRef<Path>>(&self, dir: P) -> Result<PathBuf> {
        let path = dir.as_ref().join(LOG_FILE);
        fs::create_dir_all(dir.as_ref())?;
        let stored: BTreeMap<&str, Vec<(usize, serde_json::Value)>> = self
            .series
            .iter()
            .map(|(key, values)| {
                let values = values.iter().map(|&(step, v)| (step, store(v))).collect();
                (key.as_str(), values)
            })
            .collect();
        fs::write(&path, serde_json::to_string(&stored)?)?;
        Ok(path)
    }

    /// Reads `logs.json` from `dir`, replacing the whole log.
    ///
    /// Values stored as one-element arrays are converted to plain numbers, `null` reads as NaN.
    ///
    /// # Errors
    /// `LogFormat` if a value is an array with other than exactly one element.
    pub fn load<P: AsRef<Path>>(&mut self, dir: P) -> Result<()> {
        let raw = fs::read_to_string(dir.as_ref().join(LOG_FILE))?;
        let stored: BTreeMap<String, Vec<(usize, StoredValue)>> = serde_json::from_str(&raw)?;

        let mut log = Self::new();
        for (key, values) in stored {
            let values = values
                .into_iter()
                .map(|(step, value)| Ok((step, value.into_number(&key)?)))
                .collect::<Result<Vec<_>>>()?;
            log.series.insert(key, values);
        }

        *self = log;
        Ok(())
    }
}

/// JSON has no non-finite numbers, those are written as `"NaN"`, `"inf"` or `"-inf"`.
fn store(value: f64) -> serde_json::Value {
    if value.is_finite() {
        value.into()
    } else {
        value.to_string().into()
    }
}

/// A logged value as found on disk.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredValue {
    Number(f64),
    Text(String),
    Null,
    Tensor(Vec<f64>),
}

impl StoredValue {
    fn into_number(self, key: &str) -> Result<f64> {
        match self {
            Self::Number(v) => Ok(v),
            Self::Null => Ok(f64::NAN),
            Self::Text(text) => text.parse().map_err(|_| TrainErr::LogFormat {
                key: key.to_string(),
                reason: format!("{text:?} is not a number"),
            }),
            Self::Tensor(values) => match values.as_slice() {
                [v] => Ok(*v),
                _ => Err(TrainErr::LogFormat {
                    key: key.to_string(),
                    reason: format!("expected a scalar, found {} values", values.len()),
                }),
            },
        }
    }
}

/// Window means ready to be appended to the log at a gradient step.
#[derive(Debug, Clone, PartialEq)]
pub struct Flush {
    pub step: usize,
    pub entries: Vec<(&'static str, f64)>,
}

/// Collects one value per key per micro-step over an accumulation window.
#[derive(Debug, Default, Clone)]
pub struct WindowMeans {
    values: Vec<(&'static str, Vec<f64>)>,
}

impl WindowMeans {
    pub fn push(&mut self, key: &'static str, value: f64) {
        match self.values.iter_mut().find(|(k, _)| *k == key) {
            Some((_, values)) => values.push(value),
            None => self.values.push((key, vec![value])),
        }
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The mean of every key, in the order keys were first pushed.
    pub fn means(&self) -> Vec<(&'static str, f64)> {
        self.values
            .iter()
            .map(|(key, values)| (*key, values.iter().sum::<f64>() / values.len() as f64))
            .collect()
    }

    pub fn last(&self, key: &str) -> Option<f64> {
        self.values
            .iter()
            .find(|(k, _)| *k == key)
            .and_then(|(_, values)| values.last().copied())
    }
}

/// Peak signal to noise ratio, in decibels, of `sr` against `hr` for images in `[0, peak]`.
pub fn psnr(sr: ArrayView4<f32>, hr: ArrayView4<f32>, peak: f32) -> f64 {
    let mut sq = 0.0f64;
    Zip::from(&sr).and(&hr).for_each(|&a, &b| {
        sq += f64::from(a - b).powi(2);
    });

    let mse = sq / sr.len().max(1) as f64;
    if mse == 0.0 {
        return f64::INFINITY;
    }

    20.0 * f64::from(peak).log10() - 10.0 * mse.log10()
}

#[cfg(test)]
mod tests {
    use ndarray::Array4;

    use super::*;

    #[test]
    fn starts_with_the_initial_keys() {
        let log = MetricsLog::new();
        for key in INITIAL_KEYS {
            assert!(log.keys().any(|k| k == key));
            assert!(log.series(key).is_empty());
        }
        assert!(log.latest().is_empty());
    }

    #[test]
    fn latest_skips_empty_series() {
        let mut log = MetricsLog::new();
        log.append("l_g_gan", 0, 1.0);
        log.append("l_g_gan", 1, 0.5);
        log.append("l_d_gp", 1, 2.0);

        let latest = log.latest();
        assert_eq!(latest.len(), 2);
        assert_eq!(latest["l_g_gan"], 0.5);
        assert_eq!(latest["l_d_gp"], 2.0);
    }

    #[test]
    fn save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = MetricsLog::new();
        log.append("D_logits_diff", 0, 0.123456789);
        log.append("D_logits_diff", 1, -3.5e-7);
        log.append("psnr_val", 4, 27.25);

        log.save(dir.path()).unwrap();
        let mut loaded = MetricsLog::new();
        loaded.append("l_g_pix", 9, 9.0);
        loaded.load(dir.path()).unwrap();

        assert_eq!(loaded, log);
    }

    #[test]
    fn non_finite_values_survive_a_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = MetricsLog::new();
        log.append("l_g_gan", 0, f64::NAN);
        log.append("l_g_gan", 1, f64::INFINITY);
        log.append("l_d_real", 1, f64::NEG_INFINITY);
        log.append("l_d_real", 2, 0.5);

        log.save(dir.path()).unwrap();
        let mut loaded = MetricsLog::new();
        loaded.load(dir.path()).unwrap();

        let gan = loaded.series("l_g_gan");
        assert!(gan[0].1.is_nan());
        assert_eq!(gan[1], (1, f64::INFINITY));
        assert_eq!(loaded.series("l_d_real"), [(1, f64::NEG_INFINITY), (2, 0.5)]);
    }

    #[test]
    fn null_values_load_as_nan() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(LOG_FILE), r#"{"D_real": [[0, null], [1, 0.5]]}"#).unwrap();

        let mut log = MetricsLog::new();
        log.load(dir.path()).unwrap();

        let series = log.series("D_real");
        assert!(series[0].1.is_nan());
        assert_eq!(series[1], (1, 0.5));
    }

    #[test]
    fn unparsable_text_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(LOG_FILE), r#"{"D_fake": [[0, "high"]]}"#).unwrap();

        let err = MetricsLog::new().load(dir.path()).unwrap_err();
        assert!(matches!(err, TrainErr::LogFormat { key, .. } if key == "D_fake"));
    }

    #[test]
    fn legacy_scalar_tensors_become_numbers() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(LOG_FILE),
            r#"{"l_g_gan": [[0, [0.25]], [1, 0.5]], "l_d_gp": [[3, [2.0]]]}"#,
        )
        .unwrap();

        let mut log = MetricsLog::new();
        log.load(dir.path()).unwrap();

        assert_eq!(log.series("l_g_gan"), [(0, 0.25), (1, 0.5)]);
        assert_eq!(log.series("l_d_gp"), [(3, 2.0)]);
        assert!(log.series("D_real").is_empty());
    }

    #[test]
    fn multi_element_tensors_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(LOG_FILE), r#"{"D_real": [[0, [1.0, 2.0]]]}"#).unwrap();

        let err = MetricsLog::new().load(dir.path()).unwrap_err();
        assert!(matches!(err, TrainErr::LogFormat { key, .. } if key == "D_real"));
    }

    #[test]
    fn window_means_keep_first_push_order() {
        let mut window = WindowMeans::default();
        window.push("l_d_real", 1.0);
        window.push("l_d_fake", 4.0);
        window.push("l_d_real", 3.0);

        assert_eq!(window.means(), [("l_d_real", 2.0), ("l_d_fake", 4.0)]);
        assert_eq!(window.last("l_d_real"), Some(3.0));

        window.clear();
        assert!(window.is_empty());
    }

    #[test]
    fn psnr_of_a_constant_error() {
        let hr = Array4::from_elem((1, 1, 2, 2), 0.5);
        let sr = Array4::from_elem((1, 1, 2, 2), 0.6);

        // mse = 0.01 -> 20 dB
        assert!((psnr(sr.view(), hr.view(), 1.0) - 20.0).abs() < 1e-4);
        assert_eq!(psnr(hr.view(), hr.view(), 1.0), f64::INFINITY);
    }
}
