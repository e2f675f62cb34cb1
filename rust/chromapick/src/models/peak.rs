use serde::{
    Deserialize,
    Serialize,
};

/// Parameters of the Gaussian fitted over a peak region.
///
/// `baseline` is the local offset subtracted before fitting, so the model
/// evaluated at time `t` is `baseline + amplitude * exp(-(t - mean)^2 / (2 sigma^2))`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GaussianFit {
    pub amplitude: f64,
    pub mean: f64,
    pub sigma: f64,
    pub baseline: f64,
}

impl GaussianFit {
    pub fn evaluate(&self, t: f64) -> f64 {
        let arg = (t - self.mean) / self.sigma;
        self.baseline + self.amplitude * (-0.5 * arg * arg).exp()
    }
}

/// A local maximum of a corrected trace plus its shape and quality metrics.
///
/// Indices refer to the corrected trace the peak was detected on. All derived
/// fields are filled by the peak analyzer in a single pass; only `score` may
/// be re-weighted later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Peak {
    pub time: f64,
    pub index: usize,
    pub height: f64,

    pub left_base_index: usize,
    pub right_base_index: usize,
    pub left_base_time: f64,
    pub right_base_time: f64,

    /// Full width at half maximum, in samples.
    pub width: f64,
    pub width_5: f64,
    pub area: f64,
    pub symmetry: f64,
    pub skewness: f64,
    pub prominence: f64,

    /// Normalized RMS residual of the Gaussian fit, 1.0 when the fit failed.
    pub gaussian_residual: f64,
    pub gaussian_fit: Option<GaussianFit>,

    /// `+inf` when the peak is alone in its chromatogram.
    pub resolution: f64,
    pub score: f64,
}

impl Peak {
    pub fn contains_index(&self, index: usize) -> bool {
        self.left_base_index <= index && index <= self.right_base_index
    }
}
