// src/controller.rs - Adaptive heating-curve controller
//
// The heating curve is linear in the outdoor deficit:
//   power = k1 * (target - outdoor) + k2
// k1 and k2 are nudged every cycle by the indoor error and persisted, and the
// resulting pump frequency is passed through a moving average and a deadband.
use crate::config::{ConfigError, ControllerConfig};
use crate::filter::{Deadband, FrequencyWindow, round_to};
use crate::persistence::{CoefficientStore, Coefficients, PersistenceError};
use thiserror::Error;

/// Bounds applied to `k1` after every update (W/°C).
pub const K1_LIMITS: (f64, f64) = (0.0, 20.0);
/// Bounds applied to `k2` after every update (W).
pub const K2_LIMITS: (f64, f64) = (0.0, 50.0);

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result of one coefficient update.
#[derive(Debug)]
pub struct CurveUpdate {
    /// `target_temp - indoor_temp`
    pub error: f64,
    pub coefficients: Coefficients,
    /// Set when the new coefficients could not be saved. They are still in use.
    pub persist_error: Option<PersistenceError>,
}

impl CurveUpdate {
    pub fn persisted(&self) -> bool {
        self.persist_error.is_none()
    }
}

pub struct CurveController {
    config: ControllerConfig,
    k1: f64,
    k2: f64,
    history: FrequencyWindow,
    gate: Deadband,
    store: Box<dyn CoefficientStore>,
}

impl std::fmt::Debug for CurveController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurveController")
            .field("config", &self.config)
            .field("k1", &self.k1)
            .field("k2", &self.k2)
            .field("history", &self.history)
            .field("last_accepted_frequency", &self.gate.accepted())
            .finish_non_exhaustive()
    }
}

impl CurveController {
    /// Build a controller, restoring coefficients from `store` when it holds
    /// any. A store that cannot be read is logged and the initial values are
    /// used instead.
    pub fn new(
        config: ControllerConfig,
        initial_k1: f64,
        initial_k2: f64,
        store: Box<dyn CoefficientStore>,
    ) -> Result<Self, ControllerError> {
        config.validate()?;
        let defaults = Coefficients { k1: initial_k1, k2: initial_k2 };
        let coefficients = match store.load() {
            Ok(Some(stored)) => {
                let restored = stored.or(defaults);
                tracing::info!(
                    "Restored heating curve: k1={:.3}, k2={:.3}",
                    restored.k1,
                    restored.k2
                );
                restored
            }
            Ok(None) => {
                tracing::info!(
                    "No stored heating curve, starting from k1={:.3}, k2={:.3}",
                    defaults.k1,
                    defaults.k2
                );
                defaults
            }
            Err(e) => {
                tracing::warn!("Could not load heating curve ({}), falling back to defaults", e);
                defaults
            }
        };
        Ok(Self {
            history: FrequencyWindow::new(config.window_size),
            gate: Deadband::new(config.hysteresis, config.f_min),
            k1: coefficients.k1,
            k2: coefficients.k2,
            config,
            store,
        })
    }

    /// Adjust the curve from the indoor error and persist the result.
    ///
    /// `outdoor_temp` is part of the cycle report but does not enter the rule.
    pub fn update_curve(&mut self, outdoor_temp: f64, indoor_temp: f64) -> CurveUpdate {
        let error = self.config.target_temp - indoor_temp;
        if error.is_nan() {
            // clamp would let NaN through into k1/k2
            tracing::warn!("Ignoring indoor reading {} for curve update", indoor_temp);
            return CurveUpdate {
                error,
                coefficients: self.coefficients(),
                persist_error: None,
            };
        }
        let step = self.config.learning_rate * error;

        self.k1 = (self.k1 + step).clamp(K1_LIMITS.0, K1_LIMITS.1);
        self.k2 = (self.k2 + step / 2.0).clamp(K2_LIMITS.0, K2_LIMITS.1);

        tracing::debug!(
            outdoor = outdoor_temp,
            indoor = indoor_temp,
            error,
            k1 = self.k1,
            k2 = self.k2,
            "Heating curve updated"
        );

        let coefficients = self.coefficients();
        let persist_error = match self.store.save(&coefficients) {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!("Heating curve not persisted, it will be lost on restart: {}", e);
                Some(e)
            }
        };

        CurveUpdate { error, coefficients, persist_error }
    }

    /// Pump frequency to command for this cycle, or `None` while the heater is
    /// warming up and the pump must be left alone.
    pub fn heating_frequency(&mut self, outdoor_temp: f64, heater_active: bool) -> Option<f64> {
        if !heater_active {
            tracing::debug!("Heater warming up, pump not steered");
            return None;
        }

        let frequency = self.raw_frequency(outdoor_temp);
        self.history.push(frequency);
        let average = self.history.mean().unwrap_or(frequency);
        if self.gate.offer(average) {
            tracing::debug!(raw = frequency, average, "Accepted new pump frequency");
        }

        Some(round_to(self.gate.accepted(), 2))
    }

    /// Thermal power demanded by the curve at `outdoor_temp`, in W.
    ///
    /// Floored at zero and capped at `p_max`. It is not floored at `p_min`;
    /// anything below `p_min` maps to `f_min` in [`raw_frequency`](Self::raw_frequency).
    pub fn power_demand(&self, outdoor_temp: f64) -> f64 {
        let power = (self.k1 * (self.config.target_temp - outdoor_temp) + self.k2).max(0.0);
        power.min(self.config.p_max)
    }

    /// Unfiltered pump frequency for `outdoor_temp`, clamped to the pump range
    /// and rounded to 0.01 Hz.
    pub fn raw_frequency(&self, outdoor_temp: f64) -> f64 {
        let c = &self.config;
        let fraction = (self.power_demand(outdoor_temp) - c.p_min) / (c.p_max - c.p_min);
        let frequency = c.f_min + fraction * (c.f_max - c.f_min);
        round_to(frequency.clamp(c.f_min, c.f_max), 2)
    }

    pub fn k1(&self) -> f64 {
        self.k1
    }

    pub fn k2(&self) -> f64 {
        self.k2
    }

    pub fn coefficients(&self) -> Coefficients {
        Coefficients { k1: self.k1, k2: self.k2 }
    }

    pub fn last_accepted_frequency(&self) -> f64 {
        self.gate.accepted()
    }

    /// Number of samples in the smoothing window.
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }
}
