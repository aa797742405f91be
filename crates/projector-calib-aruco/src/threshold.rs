//! Global Otsu thresholding.

/// Otsu threshold over a set of intensities. Pixels strictly below the
/// returned value are dark.
pub(crate) fn otsu_threshold_from_samples(samples: &[u8]) -> u8 {
    let Some((min_v, max_v)) = samples
        .iter()
        .fold(None, |acc: Option<(u8, u8)>, &v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
    else {
        return 127;
    };
    if min_v == max_v {
        return min_v;
    }

    let mut hist = [0u32; 256];
    for &v in samples {
        hist[v as usize] += 1;
    }
    if hist.iter().filter(|&&h| h > 0).count() <= 2 {
        return ((min_v as u16 + max_v as u16).div_ceil(2)) as u8;
    }

    let total = samples.len() as f64;
    let sum_total: f64 = hist
        .iter()
        .enumerate()
        .map(|(i, &h)| i as f64 * h as f64)
        .sum();

    let mut sum_b = 0f64;
    let mut w_b = 0f64;
    let mut best_var = -1f64;
    let mut best_t = 127u8;

    for (t, &h) in hist.iter().enumerate() {
        w_b += h as f64;
        if w_b < 1.0 {
            continue;
        }
        let w_f = total - w_b;
        if w_f < 1.0 {
            break;
        }

        sum_b += t as f64 * h as f64;
        let m_b = sum_b / w_b;
        let m_f = (sum_total - sum_b) / w_f;

        let var_between = w_b * w_f * (m_b - m_f) * (m_b - m_f);
        if var_between > best_var {
            best_var = var_between;
            // Class "dark" is `<= t`, callers test `< thr`.
            best_t = (t + 1).min(255) as u8;
        }
    }

    best_t
}

/// Spread between the darkest and brightest sample.
pub(crate) fn contrast(samples: &[u8]) -> u8 {
    let (lo, hi) = samples
        .iter()
        .fold((u8::MAX, u8::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    hi.saturating_sub(lo)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bimodal_split() {
        let mut samples = vec![10u8; 50];
        samples.extend(std::iter::repeat_n(200u8, 50));
        let t = otsu_threshold_from_samples(&samples);
        assert!(10 < t && t <= 200, "threshold {t}");
    }

    #[test]
    fn separates_noisy_classes() {
        let samples: Vec<u8> = (0..20u8)
            .map(|i| 20 + i)
            .chain((0..20u8).map(|i| 180 + i))
            .collect();
        let t = otsu_threshold_from_samples(&samples);
        assert!(samples.iter().filter(|&&v| v < t).count() == 20, "threshold {t}");
    }

    #[test]
    fn flat_and_empty_inputs() {
        assert_eq!(otsu_threshold_from_samples(&[]), 127);
        assert_eq!(otsu_threshold_from_samples(&[42, 42]), 42);
        assert_eq!(contrast(&[42, 42]), 0);
        assert_eq!(contrast(&[0, 255, 12]), 255);
    }
}
