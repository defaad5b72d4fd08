//! Instantaneous velocity with caller-applied deadband.

/// `(cur_pos - prev_pos) / (cur_t - prev_t)`, or zero for a zero time delta.
pub fn velocity(prev_pos: f64, cur_pos: f64, prev_t: f64, cur_t: f64) -> f64 {
    let dt = cur_t - prev_t;
    if dt == 0.0 {
        return 0.0;
    }
    (cur_pos - prev_pos) / dt
}

/// Magnitudes strictly below `band` become exactly zero.
pub fn deadband(value: f64, band: f64) -> f64 {
    if value > -band && value < band {
        0.0
    } else {
        value
    }
}

/// Previous observation for one tracked axis.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VelocityState {
    previous: Option<(f64, f64)>,
}

impl VelocityState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn previous_position(&self) -> Option<f64> {
        self.previous.map(|(position, _)| position)
    }

    pub fn previous_timestamp(&self) -> Option<f64> {
        self.previous.map(|(_, timestamp)| timestamp)
    }

    /// Velocity against the stored observation, then remember this one.
    /// The first observation only seeds the state and reports zero.
    pub fn update(&mut self, position: f64, timestamp: f64) -> f64 {
        let v = match self.previous {
            Some((prev_pos, prev_t)) => velocity(prev_pos, position, prev_t, timestamp),
            None => 0.0,
        };
        self.previous = Some((position, timestamp));
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_time_delta_is_zero_velocity() {
        for (a, b) in [(0.0, 0.0), (10.0, 500.0), (-3.0, 7.5), (1e9, -1e9)] {
            assert_eq!(velocity(a, b, 12.5, 12.5), 0.0);
        }
    }

    #[test]
    fn velocity_is_position_over_time() {
        assert_eq!(velocity(100.0, 160.0, 1.0, 1.05), 60.0 / (1.05 - 1.0));
        assert_eq!(velocity(500.0, 400.0, 2.0, 2.5), -200.0);
    }

    #[test]
    fn deadband_zeroes_small_magnitudes() {
        for v in [-199.9, -100.0, 0.0, 50.0, 199.99] {
            assert_eq!(deadband(v, 200.0), 0.0);
        }
        assert_eq!(deadband(200.0, 200.0), 200.0);
        assert_eq!(deadband(-200.0, 200.0), -200.0);
        assert_eq!(deadband(99.0, 100.0), 0.0);
        assert_eq!(deadband(150.0, 100.0), 150.0);
    }

    #[test]
    fn state_seeds_on_first_update() {
        let mut state = VelocityState::new();
        assert_eq!(state.update(300.0, 1.0), 0.0);
        assert_eq!(state.previous_position(), Some(300.0));
        assert_eq!(state.update(400.0, 1.1), 100.0 / (1.1 - 1.0));
        assert_eq!(state.previous_timestamp(), Some(1.1));
    }
}
