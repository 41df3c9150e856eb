use std::fmt::Debug;

/// Produces a value of type `T` per step.
pub trait Schedule<T>: Debug {
    /// Returns the current value without advancing the schedule.
    fn get_value(&self) -> T;

    /// Advances the schedule by one step and returns the new value.
    fn update(&mut self) -> T;
}

/// Always returns the same value.
#[derive(Debug, Clone)]
pub struct ConstantSchedule<T> {
    value: T,
}

impl<T> ConstantSchedule<T> {
    /// Constructs the schedule.
    pub fn new(value: T) -> Self {
        Self { value }
    }
}

impl<T: Clone + Debug> Schedule<T> for ConstantSchedule<T> {
    fn get_value(&self) -> T {
        self.value.clone()
    }

    fn update(&mut self) -> T {
        self.value.clone()
    }
}

/// Moves linearly from `init_value` to `end_value` in `steps` updates,
/// then stays at `end_value`.
#[derive(Debug, Clone)]
pub struct LinearSchedule {
    value: f64,
    end_value: f64,
    delta: f64,
}

impl LinearSchedule {
    /// Constructs the schedule. `steps` of zero jumps to `end_value` at once.
    pub fn new(init_value: f64, end_value: f64, steps: usize) -> Self {
        let (value, delta) = match steps {
            0 => (end_value, 0.0),
            n => (init_value, (end_value - init_value) / n as f64),
        };
        Self {
            value,
            end_value,
            delta,
        }
    }
}

impl Schedule<f64> for LinearSchedule {
    fn get_value(&self) -> f64 {
        self.value
    }

    fn update(&mut self) -> f64 {
        let next = self.value + self.delta;
        self.value = if self.delta >= 0.0 {
            next.min(self.end_value)
        } else {
            next.max(self.end_value)
        };
        self.value
    }
}

/// Returns `off_value` until `steps` updates have been made, `on_value` from
/// then on.
#[derive(Debug, Clone)]
pub struct SwitchSchedule<T> {
    off_value: T,
    on_value: T,
    flip_step: usize,
    current_step: usize,
}

impl<T> SwitchSchedule<T> {
    /// Constructs the schedule.
    pub fn new(off_value: T, on_value: T, steps: usize) -> Self {
        Self {
            off_value,
            on_value,
            flip_step: steps,
            current_step: 0,
        }
    }
}

impl<T: Clone + Debug> Schedule<T> for SwitchSchedule<T> {
    fn get_value(&self) -> T {
        if self.current_step < self.flip_step {
            self.off_value.clone()
        } else {
            self.on_value.clone()
        }
    }

    fn update(&mut self) -> T {
        self.current_step = self.current_step.saturating_add(1);
        self.get_value()
    }
}

/// Returns `on_value` every `period` updates and `off_value` otherwise.
///
/// The counter starts at zero, so the value before the first update is
/// `on_value`.
#[derive(Debug, Clone)]
pub struct PeriodicSchedule<T> {
    off_value: T,
    on_value: T,
    period: usize,
    steps: usize,
}

impl<T> PeriodicSchedule<T> {
    /// Constructs the schedule. A `period` of zero is treated as one.
    pub fn new(off_value: T, on_value: T, period: usize) -> Self {
        Self {
            off_value,
            on_value,
            period: period.max(1),
            steps: 0,
        }
    }
}

impl<T: Clone + Debug> Schedule<T> for PeriodicSchedule<T> {
    fn get_value(&self) -> T {
        if self.steps % self.period == 0 {
            self.on_value.clone()
        } else {
            self.off_value.clone()
        }
    }

    fn update(&mut self) -> T {
        self.steps += 1;
        self.get_value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_schedule_reaches_end() {
        let mut s = LinearSchedule::new(1.0, 0.1, 3);
        assert_eq!(s.get_value(), 1.0);
        assert!((s.update() - 0.7).abs() < 1e-12);
        assert!((s.update() - 0.4).abs() < 1e-12);
        assert!((s.update() - 0.1).abs() < 1e-12);
        assert_eq!(s.update(), 0.1);
        assert_eq!(s.get_value(), 0.1);
    }

    #[test]
    fn test_linear_schedule_increasing() {
        let mut s = LinearSchedule::new(0.0, 1.0, 2);
        assert_eq!(s.update(), 0.5);
        assert_eq!(s.update(), 1.0);
        assert_eq!(s.update(), 1.0);
    }

    #[test]
    fn test_switch_schedule_flips_permanently() {
        let mut s = SwitchSchedule::new(false, true, 3);
        assert!(!s.get_value());
        assert!(!s.update());
        assert!(!s.update());
        assert!(s.update());
        for _ in 0..10 {
            assert!(s.update());
        }
    }

    #[test]
    fn test_switch_schedule_zero_steps() {
        let s = SwitchSchedule::new(0.0, 1.0, 0);
        assert_eq!(s.get_value(), 1.0);
    }

    #[test]
    fn test_periodic_schedule() {
        let mut s = PeriodicSchedule::new(false, true, 3);
        assert!(s.get_value());
        let fired = (0..9).map(|_| s.update()).collect::<Vec<_>>();
        assert_eq!(
            fired,
            vec![false, false, true, false, false, true, false, false, true]
        );
    }

    #[test]
    fn test_constant_schedule() {
        let mut s = ConstantSchedule::new(0.25);
        assert_eq!(s.update(), 0.25);
        assert_eq!(s.get_value(), 0.25);
    }
}
