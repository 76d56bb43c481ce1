/// Peak absolute amplitude below which a window is treated as inaudible.
const MIN_AMPLITUDE: f32 = 0.002;

/// Normalized correlation a local maximum must reach to be taken as the
/// fundamental period.
const PEAK_THRESHOLD: f64 = 0.3;

/// Plausible musical range searched for a fundamental, in Hz.
const MIN_FREQ_HZ: f64 = 50.0;
const MAX_FREQ_HZ: f64 = 2000.0;

/// Estimate the dominant periodic frequency of a sample window via
/// autocorrelation. Returns None for silence, windows shorter than the
/// longest searched period, or winners outside the musical range.
///
/// Peak picking prefers the first local maximum above PEAK_THRESHOLD over
/// the global maximum: on harmonic-rich tones the global maximum can sit
/// on a harmonic and cause octave jumps.
pub fn estimate(samples: &[f32], sample_rate: u32) -> Option<f64> {
    if samples.is_empty() || sample_rate == 0 {
        return None;
    }

    let peak = samples.iter().fold(0.0_f32, |max, s| max.max(s.abs()));
    if peak < MIN_AMPLITUDE {
        return None;
    }

    let min_period = (sample_rate as f64 / MAX_FREQ_HZ) as usize;
    let max_period = (sample_rate as f64 / MIN_FREQ_HZ) as usize;
    if max_period >= samples.len() || min_period >= max_period {
        return None;
    }

    // Non-negative-lag half of the autocorrelation, normalized by zero lag.
    let mut correlation = vec![0.0_f64; max_period + 1];
    for (lag, value) in correlation.iter_mut().enumerate() {
        let mut sum = 0.0_f64;
        for i in 0..samples.len() - lag {
            sum += samples[i] as f64 * samples[i + lag] as f64;
        }
        *value = sum;
    }
    let zero_lag = correlation[0];
    if zero_lag > 0.0 {
        for value in correlation.iter_mut() {
            *value /= zero_lag;
        }
    }

    let search = &correlation[min_period..max_period];
    if search.is_empty() {
        return None;
    }

    let mut peak_index = None;
    for i in 1..search.len().saturating_sub(1) {
        if search[i] > search[i - 1] && search[i] > search[i + 1] && search[i] > PEAK_THRESHOLD {
            peak_index = Some(i + min_period);
            break;
        }
    }

    // No significant local maximum: fall back to the global maximum in range.
    let peak_index = peak_index.unwrap_or_else(|| {
        let mut best = 0;
        let mut best_value = f64::MIN;
        for (i, &value) in search.iter().enumerate() {
            if value > best_value {
                best_value = value;
                best = i;
            }
        }
        best + min_period
    });

    if peak_index == 0 {
        return None;
    }
    let frequency = sample_rate as f64 / peak_index as f64;
    if (MIN_FREQ_HZ..=MAX_FREQ_HZ).contains(&frequency) {
        Some(frequency)
    } else {
        None
    }
}
