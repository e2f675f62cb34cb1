//! Local extrema search over 1-D signals.
//!
//! The peak search follows the conventional filter order: local maxima
//! (flat tops reduced to their midpoint), then height, then minimum
//! distance, then prominence, then width.

/// Prominence of one peak and the bases it was measured against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prominence {
    pub prominence: f64,
    pub left_base: usize,
    pub right_base: usize,
}

/// Width of one peak at `height - prominence * rel_height`.
///
/// The intersection points are interpolated, so they are fractional sample
/// positions and `width` is in samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Width {
    pub width: f64,
    pub width_height: f64,
    pub left_ip: f64,
    pub right_ip: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakCandidate {
    pub index: usize,
    pub height: f64,
    pub prominence: Prominence,
    pub width: Width,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FindPeaksOptions {
    pub height: Option<f64>,
    pub prominence: Option<f64>,
    pub width: Option<f64>,
    /// Minimum horizontal distance between peaks, in samples (>= 1).
    pub distance: Option<usize>,
    /// Window, in samples, that bounds the prominence base search.
    pub wlen: Option<usize>,
    pub rel_height: f64,
}

impl Default for FindPeaksOptions {
    fn default() -> Self {
        Self {
            height: None,
            prominence: None,
            width: None,
            distance: None,
            wlen: None,
            rel_height: 0.5,
        }
    }
}

/// Indices of all local maxima. Plateaus report their (rounded down) midpoint.
pub fn local_maxima(y: &[f64]) -> Vec<usize> {
    let mut out = Vec::new();
    if y.len() < 3 {
        return out;
    }
    let i_max = y.len() - 1;
    let mut i = 1;
    while i < i_max {
        if y[i - 1] < y[i] {
            let mut i_ahead = i + 1;
            while i_ahead < i_max && y[i_ahead] == y[i] {
                i_ahead += 1;
            }
            if y[i_ahead] < y[i] {
                let left_edge = i;
                let right_edge = i_ahead - 1;
                out.push((left_edge + right_edge) / 2);
                i = i_ahead;
            }
        }
        i += 1;
    }
    out
}

/// `true` when `y[i]` is not larger than either neighbor.
/// Edge samples are never local minima by this definition.
pub fn is_local_minimum(y: &[f64], i: usize) -> bool {
    i > 0 && i + 1 < y.len() && y[i] <= y[i - 1] && y[i] <= y[i + 1]
}

/// Walks outward from the neighbors of `index` until a local minimum or the
/// trace edge. The apex itself is never a boundary unless it sits on an edge,
/// so a flat top does not collapse the peak. Returns `(left, right)`.
pub fn local_minima_around(y: &[f64], index: usize) -> (usize, usize) {
    let mut left = index.saturating_sub(1);
    while left > 0 && !is_local_minimum(y, left) {
        left -= 1;
    }
    let mut right = (index + 1).min(y.len().saturating_sub(1));
    while right + 1 < y.len() && !is_local_minimum(y, right) {
        right += 1;
    }
    (left, right)
}

pub fn peak_prominence(y: &[f64], peak: usize, wlen: Option<usize>) -> Prominence {
    let n = y.len();
    let (i_min, i_max) = match wlen {
        Some(w) if w >= 2 => (peak.saturating_sub(w / 2), (peak + w / 2).min(n - 1)),
        _ => (0, n - 1),
    };
    let height = y[peak];

    let mut left_base = peak;
    let mut left_min = height;
    let mut i = peak;
    loop {
        if y[i] > height {
            break;
        }
        if y[i] < left_min {
            left_min = y[i];
            left_base = i;
        }
        if i == i_min {
            break;
        }
        i -= 1;
    }

    let mut right_base = peak;
    let mut right_min = height;
    let mut i = peak;
    while i <= i_max && y[i] <= height {
        if y[i] < right_min {
            right_min = y[i];
            right_base = i;
        }
        i += 1;
    }

    Prominence {
        prominence: height - left_min.max(right_min),
        left_base,
        right_base,
    }
}

pub fn peak_width(y: &[f64], peak: usize, rel_height: f64, prominence: &Prominence) -> Width {
    let height = y[peak] - prominence.prominence * rel_height;

    let mut i = peak;
    while prominence.left_base < i && height < y[i] {
        i -= 1;
    }
    let mut left_ip = i as f64;
    if y[i] < height {
        left_ip += (height - y[i]) / (y[i + 1] - y[i]);
    }

    let mut i = peak;
    while i < prominence.right_base && height < y[i] {
        i += 1;
    }
    let mut right_ip = i as f64;
    if y[i] < height {
        right_ip -= (height - y[i]) / (y[i - 1] - y[i]);
    }

    Width {
        width: right_ip - left_ip,
        width_height: height,
        left_ip,
        right_ip,
    }
}

/// Half-maximum width, using a full-signal prominence.
pub fn half_max_width(y: &[f64], peak: usize) -> f64 {
    let prom = peak_prominence(y, peak, None);
    peak_width(y, peak, 0.5, &prom).width
}

/// Keeps the highest peaks, removing any lower peak closer than `distance`.
fn select_by_distance(peaks: &[usize], y: &[f64], distance: usize) -> Vec<bool> {
    let mut keep = vec![true; peaks.len()];
    let mut priority: Vec<usize> = (0..peaks.len()).collect();
    priority.sort_by(|a, b| y[peaks[*a]].total_cmp(&y[peaks[*b]]));

    for &j in priority.iter().rev() {
        if !keep[j] {
            continue;
        }
        let mut k = j;
        while k > 0 && peaks[j] - peaks[k - 1] < distance {
            keep[k - 1] = false;
            k -= 1;
        }
        let mut k = j + 1;
        while k < peaks.len() && peaks[k] - peaks[j] < distance {
            keep[k] = false;
            k += 1;
        }
    }
    keep
}

pub fn find_peaks(y: &[f64], options: &FindPeaksOptions) -> Vec<PeakCandidate> {
    let mut peaks = local_maxima(y);

    if let Some(hmin) = options.height {
        peaks.retain(|&p| y[p] >= hmin);
    }

    if let Some(distance) = options.distance {
        if distance > 1 && peaks.len() > 1 {
            let keep = select_by_distance(&peaks, y, distance);
            peaks = peaks
                .into_iter()
                .zip(keep)
                .filter_map(|(p, k)| if k { Some(p) } else { None })
                .collect();
        }
    }

    let mut out: Vec<PeakCandidate> = peaks
        .into_iter()
        .map(|p| {
            let prominence = peak_prominence(y, p, options.wlen);
            let width = peak_width(y, p, options.rel_height, &prominence);
            PeakCandidate {
                index: p,
                height: y[p],
                prominence,
                width,
            }
        })
        .collect();

    if let Some(pmin) = options.prominence {
        out.retain(|c| c.prominence.prominence >= pmin);
    }
    if let Some(wmin) = options.width {
        out.retain(|c| c.width.width >= wmin);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_maxima_plateau() {
        let y = [0.0, 1.0, 0.0, 2.0, 2.0, 2.0, 0.0, 3.0, 3.0, 0.0, 1.0];
        assert_eq!(local_maxima(&y), vec![1, 4, 7]);
        // Rising edge to the end of the trace is not a maximum.
        assert!(local_maxima(&[0.0, 1.0, 2.0]).is_empty());
    }

    #[test]
    fn test_prominence_and_bases() {
        let y = [0.0, 2.0, 1.0, 5.0, 0.5, 3.0, 0.0];
        let p = peak_prominence(&y, 3, None);
        assert!((p.prominence - 5.0).abs() < 1e-12);
        assert_eq!((p.left_base, p.right_base), (0, 6));

        let p = peak_prominence(&y, 1, None);
        assert!((p.prominence - 1.0).abs() < 1e-12);
        assert_eq!((p.left_base, p.right_base), (0, 2));

        // A narrow window hides the deeper base on the right.
        let p = peak_prominence(&y, 5, Some(3));
        assert!((p.prominence - 2.5).abs() < 1e-12);
        assert_eq!(p.left_base, 4);
    }

    #[test]
    fn test_half_max_width_triangle() {
        let y = [0.0, 1.0, 2.0, 3.0, 4.0, 3.0, 2.0, 1.0, 0.0];
        let w = half_max_width(&y, 4);
        assert!((w - 4.0).abs() < 1e-12, "Got {}", w);
    }

    #[test]
    fn test_find_peaks_filters() {
        let y = [0.0, 1.0, 0.0, 10.0, 0.0, 0.5, 0.0, 8.0, 7.5, 9.0, 0.0];
        let all = find_peaks(&y, &FindPeaksOptions::default());
        let idx: Vec<usize> = all.iter().map(|c| c.index).collect();
        assert_eq!(idx, vec![1, 3, 5, 7, 9]);

        let opts = FindPeaksOptions {
            height: Some(2.0),
            ..Default::default()
        };
        let idx: Vec<usize> = find_peaks(&y, &opts).iter().map(|c| c.index).collect();
        assert_eq!(idx, vec![3, 7, 9]);

        let opts = FindPeaksOptions {
            height: Some(2.0),
            distance: Some(3),
            ..Default::default()
        };
        let idx: Vec<usize> = find_peaks(&y, &opts).iter().map(|c| c.index).collect();
        assert_eq!(idx, vec![3, 9]);

        let opts = FindPeaksOptions {
            prominence: Some(2.0),
            ..Default::default()
        };
        let idx: Vec<usize> = find_peaks(&y, &opts).iter().map(|c| c.index).collect();
        assert_eq!(idx, vec![3, 9]);
    }

    #[test]
    fn test_local_minima_around() {
        let y = [3.0, 1.0, 2.0, 5.0, 2.5, 0.5, 1.0];
        assert_eq!(local_minima_around(&y, 3), (1, 5));
        let y = [1.0, 2.0, 5.0, 3.0, 1.0];
        assert_eq!(local_minima_around(&y, 2), (0, 4));
    }

    #[test]
    fn test_local_minima_around_flat_top() {
        let y = [0.0, 1.0, 3.0, 6.0, 9.0, 9.0, 9.0, 6.0, 3.0, 1.0, 0.0];
        assert!(is_local_minimum(&y, 5));
        assert_eq!(local_minima_around(&y, 5), (0, 10));
        let y = [4.0, 2.0, 1.0];
        assert_eq!(local_minima_around(&y, 0), (0, 2));
    }
}
