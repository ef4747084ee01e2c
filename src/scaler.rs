//! Feature scaling configuration.
//!
//! A [`StandardScaler`] is persisted as a small versioned JSON record. `configure`
//! writes an unfitted record, `build_scaler` reads it back, and the training
//! pipeline refits it on every run before saving the fitted copy with the model.

use std::fs;
use std::path::Path;

use ndarray::{Array1, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::ScalerError;

pub const SCALER_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub format_version: u32,
    pub with_mean: bool,
    pub with_std: bool,
    #[serde(default)]
    pub n_samples_seen: u64,
    #[serde(default)]
    pub n_features_in: Option<usize>,
    #[serde(default)]
    pub mean: Option<Vec<f32>>,
    #[serde(default)]
    pub var: Option<Vec<f32>>,
    #[serde(default)]
    pub scale: Option<Vec<f32>>,
}

impl StandardScaler {
    pub fn new(with_mean: bool, with_std: bool) -> StandardScaler {
        StandardScaler {
            format_version: SCALER_FORMAT_VERSION,
            with_mean,
            with_std,
            n_samples_seen: 0,
            n_features_in: None,
            mean: None,
            var: None,
            scale: None,
        }
    }

    pub fn is_fitted(&self) -> bool {
        self.n_samples_seen > 0
    }

    /// Learns per-column statistics from `features` (`[samples, features]`).
    ///
    /// Any previous fit is discarded.
    pub fn fit(&mut self, features: ArrayView2<f32>) -> Result<(), ScalerError> {
        let rows = features.nrows();
        let Some(mean) = features.mean_axis(Axis(0)) else {
            return Err(ScalerError::EmptyFit);
        };

        self.n_samples_seen = rows as u64;
        self.n_features_in = Some(features.ncols());
        self.mean = (self.with_mean || self.with_std).then(|| mean.to_vec());
        if self.with_std {
            let var = features.var_axis(Axis(0), 0.0);
            let scale = var.mapv(|v| if v == 0.0 { 1.0 } else { v.sqrt() });
            self.var = Some(var.to_vec());
            self.scale = Some(scale.to_vec());
        } else {
            self.var = None;
            self.scale = None;
        }
        tracing::debug!(rows, columns = features.ncols(), "Fitted scaler");
        Ok(())
    }

    /// Centers and scales `features` according to the enabled flags.
    ///
    /// With both flags off this is the identity and needs no fit.
    pub fn transform(&self, features: ArrayView2<f32>) -> Result<Array2<f32>, ScalerError> {
        if let Some(expected) = self.n_features_in {
            if features.ncols() != expected {
                return Err(ScalerError::FeatureCount {
                    expected,
                    found: features.ncols(),
                });
            }
        }

        let mut out = features.to_owned();
        if self.with_mean {
            let mean = self.statistic(self.mean.as_deref())?;
            out -= &mean;
        }
        if self.with_std {
            let scale = self.statistic(self.scale.as_deref())?;
            out /= &scale;
        }
        Ok(out)
    }

    pub fn fit_transform(&mut self, features: ArrayView2<f32>) -> Result<Array2<f32>, ScalerError> {
        self.fit(features)?;
        self.transform(features)
    }

    fn statistic(&self, values: Option<&[f32]>) -> Result<Array1<f32>, ScalerError> {
        values
            .map(|v| Array1::from(v.to_vec()))
            .ok_or(ScalerError::NotFitted)
    }

    pub fn save(&self, path: &Path) -> Result<(), ScalerError> {
        let json = serde_json::to_string_pretty(self).map_err(|source| ScalerError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, json).map_err(|source| ScalerError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<StandardScaler, ScalerError> {
        let bytes = fs::read(path).map_err(|source| ScalerError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let scaler: StandardScaler =
            serde_json::from_slice(&bytes).map_err(|source| ScalerError::Json {
                path: path.to_path_buf(),
                source,
            })?;
        if scaler.format_version != SCALER_FORMAT_VERSION {
            return Err(ScalerError::UnsupportedVersion {
                found: scaler.format_version,
                expected: SCALER_FORMAT_VERSION,
            });
        }
        Ok(scaler)
    }
}

/// Writes a new unfitted scaler with centering and scaling disabled.
pub fn configure(outpath: &Path) -> Result<(), ScalerError> {
    configure_with(outpath, false, false)
}

pub fn configure_with(outpath: &Path, with_mean: bool, with_std: bool) -> Result<(), ScalerError> {
    let scaler = StandardScaler::new(with_mean, with_std);
    scaler.save(outpath)?;
    tracing::info!(
        path = %outpath.display(),
        with_mean,
        with_std,
        "Wrote scaler config"
    );
    Ok(())
}

pub fn build_scaler(config_path: &Path) -> Result<StandardScaler, ScalerError> {
    let scaler = StandardScaler::load(config_path)?;
    tracing::debug!(path = %config_path.display(), fitted = scaler.is_fitted(), "Loaded scaler config");
    Ok(scaler)
}
