//! Hooks inspecting the state of training.
//!
//! An [`Inspector`] receives a [`TrainingSnapshot`] every few updates and
//! returns findings. Findings are advisory: the agent logs them and continues.
use std::{collections::HashMap, fmt::Debug};

/// Values observed at a training update.
#[derive(Debug, Clone, Default)]
pub struct TrainingSnapshot {
    /// Number of updates of the agent.
    pub step: usize,

    /// Training loss.
    pub loss: f32,

    /// Predicted Q-values of the taken actions.
    pub q_values: Vec<f32>,

    /// Weights of the online network, keyed by parameter name.
    pub weights: Vec<(String, Vec<f32>)>,

    /// Biases of the online network, keyed by parameter name.
    pub biases: Vec<(String, Vec<f32>)>,

    /// Gradients of the online network, keyed by parameter name.
    pub gradients: Vec<(String, Vec<f32>)>,

    /// Intermediate outputs of the online network, keyed by layer name.
    pub activations: Vec<(String, Vec<f32>)>,
}

/// Kind of a [`Finding`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FindingKind {
    /// A NaN or infinite value.
    NonFinite,

    /// A value outside of its expected range.
    OutOfRange,

    /// Parameters growing without bound.
    Diverging,

    /// Parameters that look uninitialized.
    PoorInit,
}

/// A problem detected by an [`Inspector`].
#[derive(Debug, Clone, PartialEq)]
pub struct Finding {
    /// Kind of the problem.
    pub kind: FindingKind,

    /// Description including where the problem was found.
    pub message: String,
}

/// Inspects snapshots of training.
pub trait Inspector: Debug {
    /// Returns the findings on the given snapshot.
    fn inspect(&mut self, snapshot: &TrainingSnapshot) -> Vec<Finding>;
}

impl Inspector for Vec<Box<dyn Inspector>> {
    fn inspect(&mut self, snapshot: &TrainingSnapshot) -> Vec<Finding> {
        self.iter_mut()
            .flat_map(|inspector| inspector.inspect(snapshot))
            .collect()
    }
}

/// Inspector reporting nothing.
#[derive(Debug, Default, Clone)]
pub struct NullInspector;

impl Inspector for NullInspector {
    fn inspect(&mut self, _snapshot: &TrainingSnapshot) -> Vec<Finding> {
        vec![]
    }
}

/// Reports NaN or infinite values in the loss, Q-values and parameters.
///
/// Q-values with magnitude above `max_abs_q`, if given, are reported as
/// [`FindingKind::OutOfRange`].
#[derive(Debug, Default, Clone)]
pub struct NonFiniteCheck {
    max_abs_q: Option<f32>,
}

impl NonFiniteCheck {
    /// Constructs the inspector.
    pub fn new(max_abs_q: Option<f32>) -> Self {
        Self { max_abs_q }
    }

    fn check(findings: &mut Vec<Finding>, what: &str, name: &str, values: &[f32]) {
        let n = values.iter().filter(|v| !v.is_finite()).count();
        if n > 0 {
            findings.push(Finding {
                kind: FindingKind::NonFinite,
                message: format!("{} {} has {} non-finite values", what, name, n),
            });
        }
    }
}

impl Inspector for NonFiniteCheck {
    fn inspect(&mut self, snapshot: &TrainingSnapshot) -> Vec<Finding> {
        let mut findings = vec![];

        Self::check(&mut findings, "loss", "", &[snapshot.loss]);
        Self::check(&mut findings, "q_values", "", &snapshot.q_values);
        for (what, params) in [
            ("weight", &snapshot.weights),
            ("bias", &snapshot.biases),
            ("gradient", &snapshot.gradients),
        ] {
            for (name, values) in params.iter() {
                Self::check(&mut findings, what, name, values);
            }
        }

        if let Some(max) = self.max_abs_q {
            let n = snapshot
                .q_values
                .iter()
                .filter(|q| q.is_finite() && q.abs() > max)
                .count();
            if n > 0 {
                findings.push(Finding {
                    kind: FindingKind::OutOfRange,
                    message: format!("{} q_values exceed {} in magnitude", n, max),
                });
            }
        }

        findings
    }
}

/// Reports biases whose mean absolute value diverges.
///
/// For each bias, the mean absolute value is tracked across snapshots. It is
/// reported when it exceeds `max_mean_abs`, or when it grew by a factor of at
/// least `max_inc_rate` at every one of the last `window - 1` snapshots.
#[derive(Debug, Clone)]
pub struct BiasDivergenceCheck {
    max_mean_abs: f32,
    window: usize,
    max_inc_rate: f32,
    history: HashMap<String, Vec<f32>>,
}

impl Default for BiasDivergenceCheck {
    fn default() -> Self {
        Self::new(1000.0, 5, 2.0)
    }
}

impl BiasDivergenceCheck {
    /// Constructs the inspector.
    pub fn new(max_mean_abs: f32, window: usize, max_inc_rate: f32) -> Self {
        Self {
            max_mean_abs,
            window: window.max(2),
            max_inc_rate,
            history: HashMap::new(),
        }
    }
}

impl Inspector for BiasDivergenceCheck {
    fn inspect(&mut self, snapshot: &TrainingSnapshot) -> Vec<Finding> {
        let mut findings = vec![];

        for (name, values) in snapshot.biases.iter() {
            // Non-finite values are reported by NonFiniteCheck.
            if values.is_empty() || values.iter().any(|v| !v.is_finite()) {
                continue;
            }
            let mean_abs = values.iter().map(|v| v.abs()).sum::<f32>() / values.len() as f32;
            let history = self.history.entry(name.clone()).or_default();
            history.push(mean_abs);
            if history.len() > self.window {
                history.remove(0);
            }

            if mean_abs > self.max_mean_abs {
                findings.push(Finding {
                    kind: FindingKind::Diverging,
                    message: format!(
                        "bias {} has mean absolute value {} above {}",
                        name, mean_abs, self.max_mean_abs
                    ),
                });
            } else if history.len() == self.window {
                let rates = history
                    .windows(2)
                    .map(|w| w[1] / w[0])
                    .collect::<Vec<_>>();
                if rates.iter().all(|r| *r >= self.max_inc_rate) {
                    let max_rate = rates.iter().copied().fold(f32::MIN, f32::max);
                    findings.push(Finding {
                        kind: FindingKind::Diverging,
                        message: format!(
                            "bias {} grew by a factor up to {} in each of the last {} snapshots",
                            name,
                            max_rate,
                            self.window - 1
                        ),
                    });
                }
            }
        }

        findings
    }
}

/// Reports weights with (almost) zero variance, such as constant initialization.
#[derive(Debug, Clone)]
pub struct WeightInitCheck {
    min_var: f32,
}

impl Default for WeightInitCheck {
    fn default() -> Self {
        Self::new(1e-8)
    }
}

impl WeightInitCheck {
    /// Constructs the inspector reporting weights with variance at most `min_var`.
    pub fn new(min_var: f32) -> Self {
        Self { min_var }
    }
}

impl Inspector for WeightInitCheck {
    fn inspect(&mut self, snapshot: &TrainingSnapshot) -> Vec<Finding> {
        snapshot
            .weights
            .iter()
            .filter(|(_, values)| values.len() > 1)
            .filter_map(|(name, values)| {
                let n = values.len() as f32;
                let mean = values.iter().sum::<f32>() / n;
                let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / n;
                (var <= self.min_var).then(|| Finding {
                    kind: FindingKind::PoorInit,
                    message: format!("weight {} has variance {}", name, var),
                })
            })
            .collect()
    }
}

/// Reports activations outside of the range of their activation function.
///
/// Bounds are given per layer name; layers without bounds are only checked
/// for NaN or infinite values.
#[derive(Debug, Clone, Default)]
pub struct ActivationRangeCheck {
    bounds: HashMap<String, (f32, f32)>,
}

impl ActivationRangeCheck {
    /// Constructs the inspector without bounds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the range `[min, max]` of the activations of layer `name`.
    pub fn bound(mut self, name: impl Into<String>, min: f32, max: f32) -> Self {
        self.bounds.insert(name.into(), (min, max));
        self
    }
}

impl Inspector for ActivationRangeCheck {
    fn inspect(&mut self, snapshot: &TrainingSnapshot) -> Vec<Finding> {
        let mut findings = vec![];

        for (name, values) in snapshot.activations.iter() {
            NonFiniteCheck::check(&mut findings, "activation", name, values);
            if let Some((min, max)) = self.bounds.get(name) {
                let n = values.iter().filter(|v| **v < *min || **v > *max).count();
                if n > 0 {
                    findings.push(Finding {
                        kind: FindingKind::OutOfRange,
                        message: format!(
                            "activation {} has {} values outside of [{}, {}]",
                            name, n, min, max
                        ),
                    });
                }
            }
        }

        findings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_inspector() {
        let snapshot = TrainingSnapshot {
            loss: f32::NAN,
            ..Default::default()
        };
        assert!(NullInspector.inspect(&snapshot).is_empty());
    }

    #[test]
    fn test_non_finite_check() {
        let mut check = NonFiniteCheck::new(Some(100.0));
        let mut snapshot = TrainingSnapshot {
            step: 1,
            loss: 0.5,
            q_values: vec![1.0, -2.0],
            weights: vec![("q/w".to_string(), vec![0.1, 0.2])],
            ..Default::default()
        };
        assert!(check.inspect(&snapshot).is_empty());

        snapshot.weights[0].1[1] = f32::INFINITY;
        snapshot.q_values.push(-500.0);
        let findings = check.inspect(&snapshot);
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].kind, FindingKind::NonFinite);
        assert!(findings[0].message.contains("q/w"));
        assert_eq!(findings[1].kind, FindingKind::OutOfRange);
    }

    fn biases(v: f32) -> TrainingSnapshot {
        TrainingSnapshot {
            biases: vec![("q_head.bias".to_string(), vec![v, -v])],
            ..Default::default()
        }
    }

    #[test]
    fn test_bias_divergence_threshold() {
        let mut check = BiasDivergenceCheck::new(10.0, 3, 2.0);
        assert!(check.inspect(&biases(1.0)).is_empty());
        let findings = check.inspect(&biases(20.0));
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, FindingKind::Diverging);
        assert!(findings[0].message.contains("q_head.bias"));
    }

    #[test]
    fn test_bias_divergence_rate() {
        let mut check = BiasDivergenceCheck::new(100.0, 3, 2.0);
        assert!(check.inspect(&biases(1.0)).is_empty());
        assert!(check.inspect(&biases(2.0)).is_empty());
        // 1 -> 2 -> 4 doubles at each of the last two snapshots
        assert_eq!(check.inspect(&biases(4.0)).len(), 1);
        // 2 -> 4 -> 5 does not
        assert!(check.inspect(&biases(5.0)).is_empty());
    }

    #[test]
    fn test_weight_init_check() {
        let mut check = WeightInitCheck::default();
        let snapshot = TrainingSnapshot {
            weights: vec![
                ("ln0.weight".to_string(), vec![0.3, -0.1, 0.2]),
                ("q_head.weight".to_string(), vec![0.5; 4]),
                ("scalar".to_string(), vec![1.0]),
            ],
            ..Default::default()
        };
        let findings = check.inspect(&snapshot);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, FindingKind::PoorInit);
        assert!(findings[0].message.contains("q_head.weight"));
    }

    #[test]
    fn test_activation_range_check() {
        let mut check = ActivationRangeCheck::new().bound("features", -1.0, 1.0);
        let mut snapshot = TrainingSnapshot {
            activations: vec![
                ("features".to_string(), vec![-0.9, 0.0, 0.99]),
                ("other".to_string(), vec![250.0]),
            ],
            ..Default::default()
        };
        assert!(check.inspect(&snapshot).is_empty());

        snapshot.activations[0].1.push(1.5);
        snapshot.activations[1].1.push(f32::NAN);
        let kinds = check
            .inspect(&snapshot)
            .into_iter()
            .map(|f| f.kind)
            .collect::<Vec<_>>();
        assert_eq!(kinds, vec![FindingKind::OutOfRange, FindingKind::NonFinite]);
    }

    #[test]
    fn test_inspector_list() {
        let mut inspectors: Vec<Box<dyn Inspector>> = vec![
            Box::new(NonFiniteCheck::new(None)),
            Box::new(WeightInitCheck::default()),
        ];
        let snapshot = TrainingSnapshot {
            loss: f32::NAN,
            weights: vec![("w".to_string(), vec![0.0; 4])],
            ..Default::default()
        };
        assert_eq!(inspectors.inspect(&snapshot).len(), 2);
    }
}
