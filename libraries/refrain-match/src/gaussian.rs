//! Gaussian smoothing for the alignment histogram

/// Smooth a histogram by convolution with a discrete Gaussian
///
/// The kernel is truncated at ±3σ and normalized to sum 1; values past the
/// histogram borders contribute nothing (zero padding).
pub(crate) fn smooth(histogram: &[f64], sigma: f64) -> Vec<f64> {
    let radius = (3.0 * sigma).ceil() as i64;
    let kernel = gaussian_kernel(sigma, radius);

    let len = histogram.len() as i64;
    let mut smoothed = vec![0.0; histogram.len()];
    for (i, out) in smoothed.iter_mut().enumerate() {
        let i = i as i64;
        let mut acc = 0.0;
        for (k, weight) in kernel.iter().enumerate() {
            let src = i + k as i64 - radius;
            if (0..len).contains(&src) {
                acc += weight * histogram[src as usize];
            }
        }
        *out = acc;
    }
    smoothed
}

fn gaussian_kernel(sigma: f64, radius: i64) -> Vec<f64> {
    let mut kernel: Vec<f64> = (-radius..=radius)
        .map(|x| (-((x * x) as f64) / (2.0 * sigma * sigma)).exp())
        .collect();
    let sum: f64 = kernel.iter().sum();
    for value in &mut kernel {
        *value /= sum;
    }
    kernel
}
