use std::collections::VecDeque;

/// Tunables for the adaptive RMS + slope onset detector. The defaults are
/// the values the detector was tuned with against solo-instrument input.
#[derive(Debug, Clone)]
pub struct OnsetConfig {
    /// RMS history samples retained for slope and sustain checks.
    pub rms_window_size: usize,
    /// Starting estimate of the background noise level.
    pub initial_noise_floor: f64,
    /// Smoothing factor of the noise-floor exponential average.
    pub noise_floor_alpha: f64,
    /// The floor only updates while RMS stays within this multiple of it,
    /// so a note attack cannot drag the floor up.
    pub noise_floor_update_band: f64,
    /// RMS must exceed floor x this to count as a loud frame.
    pub loudness_threshold_factor: f64,
    /// Consecutive loud frames required before the full onset condition is
    /// evaluated at all.
    pub min_loud_frames: u32,
    /// Primary amplitude threshold, as a multiple of the floor.
    pub adaptive_threshold_factor: f64,
    /// Secondary amplitude threshold, as a multiple of the floor.
    pub secondary_threshold_factor: f64,
    /// Most recent history samples used for the slope estimate.
    pub slope_window: usize,
    /// Minimum RMS slope across the slope window.
    pub min_slope_threshold: f64,
    /// Samples inspected by the sustained-increase vote; one decrease is
    /// tolerated.
    pub min_sustained_samples: usize,
    /// History length required before an onset may fire.
    pub min_history_len: usize,
}

impl Default for OnsetConfig {
    fn default() -> Self {
        OnsetConfig {
            rms_window_size: 50,
            initial_noise_floor: 0.001,
            noise_floor_alpha: 0.002,
            noise_floor_update_band: 1.5,
            loudness_threshold_factor: 4.0,
            min_loud_frames: 6,
            adaptive_threshold_factor: 7.0,
            secondary_threshold_factor: 6.0,
            slope_window: 8,
            min_slope_threshold: 0.015,
            min_sustained_samples: 5,
            min_history_len: 20,
        }
    }
}

/// Decides the single instant a note attack begins, from volume trend and
/// persistence. Fires at most once per session: the latch freezes after
/// the first detection and only `reset` rearms it.
#[derive(Debug)]
pub struct OnsetDetector {
    config: OnsetConfig,
    rms_history: VecDeque<f64>,
    noise_floor: f64,
    consecutive_loud_frames: u32,
    fired: bool,
    onset_time: Option<f64>,
}

impl OnsetDetector {
    pub fn new(config: OnsetConfig) -> Self {
        let noise_floor = config.initial_noise_floor;
        OnsetDetector {
            config,
            rms_history: VecDeque::new(),
            noise_floor,
            consecutive_loud_frames: 0,
            fired: false,
            onset_time: None,
        }
    }

    pub fn fired(&self) -> bool {
        self.fired
    }

    pub fn onset_time(&self) -> Option<f64> {
        self.onset_time
    }

    /// Feed one chunk's RMS. Returns true only on the frame where the
    /// onset fires.
    pub fn observe(&mut self, rms: f64, timestamp_seconds: f64) -> bool {
        if self.fired {
            return false;
        }

        self.rms_history.push_back(rms);
        if self.rms_history.len() > self.config.rms_window_size {
            self.rms_history.pop_front();
        }

        if rms < self.noise_floor * self.config.noise_floor_update_band {
            self.noise_floor = (1.0 - self.config.noise_floor_alpha) * self.noise_floor
                + self.config.noise_floor_alpha * rms;
        }

        if rms > self.noise_floor * self.config.loudness_threshold_factor {
            self.consecutive_loud_frames += 1;
        } else {
            self.consecutive_loud_frames = 0;
        }
        if self.consecutive_loud_frames < self.config.min_loud_frames {
            return false;
        }

        let (slope, sustained) = self.trend();
        if rms > self.noise_floor * self.config.adaptive_threshold_factor
            && slope > self.config.min_slope_threshold
            && sustained
            && self.rms_history.len() >= self.config.min_history_len
            && rms > self.noise_floor * self.config.secondary_threshold_factor
        {
            self.fired = true;
            self.onset_time = Some(timestamp_seconds);
            log::info!(
                "onset at {:.2}s (rms {:.4}, noise floor {:.4}, slope {:.6}, loud frames {})",
                timestamp_seconds,
                rms,
                self.noise_floor,
                slope,
                self.consecutive_loud_frames
            );
            return true;
        }
        false
    }

    /// Slope across the last `slope_window` samples, plus the
    /// sustained-increase vote over the last `min_sustained_samples`.
    fn trend(&self) -> (f64, bool) {
        let window = self.config.slope_window;
        if self.rms_history.len() < window {
            return (0.0, false);
        }

        let recent: Vec<f64> = self
            .rms_history
            .iter()
            .skip(self.rms_history.len() - window)
            .copied()
            .collect();
        let slope = (recent[window - 1] - recent[0]) / (window - 1) as f64;

        let votes = self.config.min_sustained_samples;
        if recent.len() < votes {
            return (slope, false);
        }
        let mut increases = 0;
        for i in 1..votes {
            if recent[recent.len() - i] > recent[recent.len() - i - 1] {
                increases += 1;
            }
        }
        (slope, increases >= votes - 2)
    }

    pub fn reset(&mut self) {
        self.rms_history.clear();
        self.noise_floor = self.config.initial_noise_floor;
        self.consecutive_loud_frames = 0;
        self.fired = false;
        self.onset_time = None;
    }
}
