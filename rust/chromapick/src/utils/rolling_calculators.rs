use arrayvec::ArrayVec;
use serde::{
    Deserialize,
    Serialize,
};
use tracing::warn;

pub const MAX_WINDOW_SIZE: usize = 101;

/// How a signal is extended past its edges before a windowed operation.
///
/// Follows the usual array-padding conventions: `reflect` mirrors without
/// repeating the edge sample, `symmetric` repeats it. `nearest` and `mirror`
/// are accepted as aliases of `edge` and `reflect`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PadMode {
    #[default]
    #[serde(alias = "nearest")]
    Edge,
    #[serde(alias = "mirror")]
    Reflect,
    Symmetric,
    Constant,
    Wrap,
}

impl PadMode {
    fn source_index(&self, i: isize, n: usize) -> Option<usize> {
        let n_i = n as isize;
        if (0..n_i).contains(&i) {
            return Some(i as usize);
        }
        let out = match self {
            PadMode::Edge => i.clamp(0, n_i - 1),
            PadMode::Constant => return None,
            PadMode::Wrap => i.rem_euclid(n_i),
            PadMode::Reflect => {
                if n == 1 {
                    0
                } else {
                    let period = 2 * (n_i - 1);
                    let m = i.rem_euclid(period);
                    if m >= n_i { period - m } else { m }
                }
            }
            PadMode::Symmetric => {
                let period = 2 * n_i;
                let m = i.rem_euclid(period);
                if m >= n_i { period - 1 - m } else { m }
            }
        };
        Some(out as usize)
    }
}

/// Extends `values` by `pad` samples on both sides.
pub fn pad_signal(values: &[f64], pad: usize, mode: PadMode) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    let n = values.len();
    let start = -(pad as isize);
    let end = (n + pad) as isize;
    (start..end)
        .map(|i| match mode.source_index(i, n) {
            Some(j) => values[j],
            None => 0.0,
        })
        .collect()
}

/// Sliding minimum over a fixed window, backed by a monotonic queue.
///
/// The queue keeps `(value, insertion_index)` pairs with strictly
/// increasing values, so the front is always the minimum of the window.
pub struct RollingMinCalculator<T: PartialOrd + Copy + Clone> {
    window_size: usize,
    data: ArrayVec<(T, usize), MAX_WINDOW_SIZE>,
    index: usize,
}

impl<T: PartialOrd + Copy + Clone> RollingMinCalculator<T> {
    pub fn new(window_size: usize) -> Self {
        let mut window_size_use = window_size.max(1);
        if window_size > MAX_WINDOW_SIZE {
            warn!(
                "Window size {} is larger than max size {}. Clamping to max size.",
                window_size, MAX_WINDOW_SIZE
            );
            window_size_use = MAX_WINDOW_SIZE;
        }
        Self {
            window_size: window_size_use,
            data: ArrayVec::new(),
            index: 0,
        }
    }

    pub fn add(&mut self, value: T) {
        while let Some(last) = self.data.last() {
            if last.0 >= value {
                self.data.pop();
            } else {
                break;
            }
        }
        if self.index >= self.window_size {
            let min_index_keep = self.index + 1 - self.window_size;
            self.data.retain(|x| x.1 >= min_index_keep);
        }
        self.data.push((value, self.index));
        self.index += 1;
    }

    /// `None` until a full window has been seen.
    pub fn min(&self) -> Option<T> {
        if self.index < self.window_size {
            None
        } else {
            self.data.first().map(|x| x.0)
        }
    }
}

/// Minimum of every `window_size` wide window of `values`, centered.
///
/// The signal is padded by half a window using `mode`, so the output has
/// the same length as the input. `window_size` must be odd.
pub fn rolling_min_into(values: &[f64], window_size: usize, mode: PadMode, out: &mut Vec<f64>) {
    out.clear();
    if values.is_empty() {
        return;
    }
    let padded = pad_signal(values, window_size / 2, mode);
    let mut rolling = RollingMinCalculator::new(window_size);
    for value in padded.iter() {
        rolling.add(*value);
        if let Some(x) = rolling.min() {
            out.push(x);
        }
    }
}

/// Centered moving standard deviation with edge padding.
///
/// Computed from windowed first and second moments; the variance is floored
/// at zero to absorb cancellation error.
pub fn rolling_std_into(values: &[f64], window_size: usize, out: &mut Vec<f64>) {
    out.clear();
    if values.is_empty() || window_size == 0 {
        return;
    }
    let padded = pad_signal(values, window_size / 2, PadMode::Edge);
    let mut sum = 0.0;
    let mut sum_sq = 0.0;
    let w = window_size as f64;
    for (i, x) in padded.iter().enumerate() {
        sum += x;
        sum_sq += x * x;
        if i >= window_size {
            let old = padded[i - window_size];
            sum -= old;
            sum_sq -= old * old;
        }
        if i + 1 >= window_size {
            let mu = sum / w;
            let var = (sum_sq / w - mu * mu).max(0.0);
            out.push(var.sqrt());
        }
        if out.len() == values.len() {
            break;
        }
    }
}
