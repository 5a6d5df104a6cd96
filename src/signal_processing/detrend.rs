use crate::constants::MIN_DETREND_WINDOW;

/// Moving-average drift remover
///
/// Subtracts a centered moving average from a finite segment. The average is
/// computed with edge reflection (`c b a | a b c | c b a`) so the window is
/// full at both ends of the segment. Segments shorter than the window fall
/// back to plain mean removal.
///
/// The window length is channel-specific: a long window (~10 s) keeps
/// breathing content, a short one (~2 s) tracks illumination drift under a
/// pulse signal.
#[derive(Debug, Clone, Copy)]
pub struct Detrender {
    window: usize,
}

impl Detrender {
    /// Create a detrender with a window of `window_secs` at `sample_rate`
    pub fn new(window_secs: f32, sample_rate: f32) -> Self {
        Self {
            window: window_samples(window_secs, sample_rate),
        }
    }

    /// Window length in samples
    pub fn window(&self) -> usize {
        self.window
    }

    /// Remove slow drift from `segment`. Output length equals input length.
    pub fn apply(&self, segment: &[f32]) -> Vec<f32> {
        if segment.is_empty() {
            return Vec::new();
        }

        if segment.len() >= self.window {
            let baseline = moving_average_reflect(segment, self.window);
            segment
                .iter()
                .zip(baseline.iter())
                .map(|(&x, &m)| x - m)
                .collect()
        } else {
            let mean =
                segment.iter().map(|&x| x as f64).sum::<f64>() / segment.len() as f64;
            segment.iter().map(|&x| (x as f64 - mean) as f32).collect()
        }
    }
}

/// Detrend `segment` with a `window_secs` moving average at `sample_rate`
pub fn detrend(segment: &[f32], window_secs: f32, sample_rate: f32) -> Vec<f32> {
    Detrender::new(window_secs, sample_rate).apply(segment)
}

/// Window length in samples, rounded, never below `MIN_DETREND_WINDOW`
pub fn window_samples(window_secs: f32, sample_rate: f32) -> usize {
    let w = (sample_rate * window_secs).round();
    if w.is_finite() && w >= MIN_DETREND_WINDOW as f32 {
        w as usize
    } else {
        MIN_DETREND_WINDOW
    }
}

/// Centered moving average with edge reflection
///
/// Output `i` averages `x[i - w/2 ..= i - w/2 + w - 1]`, reflecting indices
/// that fall outside the segment. Requires `window <= segment.len()`.
pub fn moving_average_reflect(segment: &[f32], window: usize) -> Vec<f32> {
    let n = segment.len();
    if n == 0 || window == 0 {
        return segment.to_vec();
    }
    debug_assert!(window <= n);

    let half = (window / 2) as isize;
    let n_i = n as isize;
    let reflect = |j: isize| -> usize {
        if j < 0 {
            (-j - 1) as usize
        } else if j >= n_i {
            (2 * n_i - j - 1) as usize
        } else {
            j as usize
        }
    };

    // Prefix sums over the reflected, padded sequence
    let padded_len = n + window - 1;
    let mut prefix = Vec::with_capacity(padded_len + 1);
    prefix.push(0.0f64);
    let mut acc = 0.0f64;
    for k in 0..padded_len {
        acc += segment[reflect(k as isize - half)] as f64;
        prefix.push(acc);
    }

    (0..n)
        .map(|i| ((prefix[i + window] - prefix[i]) / window as f64) as f32)
        .collect()
}
