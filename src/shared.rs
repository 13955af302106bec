// src/shared.rs - Thread-safe handle around a CurveController
use crate::controller::{CurveController, CurveUpdate};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Consistent view of the controller state taken under the lock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurveSnapshot {
    pub k1: f64,
    pub k2: f64,
    pub last_accepted_frequency: f64,
    pub history_len: usize,
}

/// Cloneable handle; every operation runs under a single lock, so callers
/// never see a half-applied coefficient update or window push.
#[derive(Debug, Clone)]
pub struct SharedCurveController {
    inner: Arc<Mutex<CurveController>>,
}

impl SharedCurveController {
    pub fn new(controller: CurveController) -> Self {
        Self {
            inner: Arc::new(Mutex::new(controller)),
        }
    }

    // Every method leaves the controller consistent before returning, so a
    // poisoned lock still guards valid state.
    fn lock(&self) -> MutexGuard<'_, CurveController> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn update_curve(&self, outdoor_temp: f64, indoor_temp: f64) -> CurveUpdate {
        self.lock().update_curve(outdoor_temp, indoor_temp)
    }

    pub fn heating_frequency(&self, outdoor_temp: f64, heater_active: bool) -> Option<f64> {
        self.lock().heating_frequency(outdoor_temp, heater_active)
    }

    /// Run `update_curve` then `heating_frequency` without releasing the lock.
    pub fn cycle(
        &self,
        outdoor_temp: f64,
        indoor_temp: f64,
        heater_active: bool,
    ) -> (CurveUpdate, Option<f64>) {
        let mut controller = self.lock();
        let update = controller.update_curve(outdoor_temp, indoor_temp);
        let frequency = controller.heating_frequency(outdoor_temp, heater_active);
        (update, frequency)
    }

    pub fn snapshot(&self) -> CurveSnapshot {
        let controller = self.lock();
        CurveSnapshot {
            k1: controller.k1(),
            k2: controller.k2(),
            last_accepted_frequency: controller.last_accepted_frequency(),
            history_len: controller.history_len(),
        }
    }
}
