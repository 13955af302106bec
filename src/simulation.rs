// src/simulation.rs - Telemetry sources and a lumped room model
//
// The controller never reads sensors itself. A TelemetrySource hands it one
// Reading per cycle and receives the commanded pump frequency back.
use crate::config::{ControllerConfig, SimulationConfig};
use crate::shared::SharedCurveController;
use std::collections::VecDeque;
use std::f64::consts::TAU;

/// One cycle's worth of inputs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub outdoor_temp: f64,
    pub indoor_temp: f64,
    /// False while the heater runs its own warm-up sequence
    pub heater_active: bool,
}

pub trait TelemetrySource {
    /// Next reading, `None` once the source is exhausted.
    fn next_reading(&mut self) -> Option<Reading>;

    /// Feedback of the frequency commanded for the last reading.
    fn actuate(&mut self, _frequency: Option<f64>) {}
}

/// Replays a fixed list of readings.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTelemetry {
    readings: VecDeque<Reading>,
    commanded: Vec<Option<f64>>,
}

impl ScriptedTelemetry {
    pub fn new(readings: impl IntoIterator<Item = Reading>) -> Self {
        Self {
            readings: readings.into_iter().collect(),
            commanded: Vec::new(),
        }
    }

    /// Frequencies received through `actuate`, in order.
    pub fn commanded(&self) -> &[Option<f64>] {
        &self.commanded
    }
}

impl TelemetrySource for ScriptedTelemetry {
    fn next_reading(&mut self) -> Option<Reading> {
        self.readings.pop_front()
    }

    fn actuate(&mut self, frequency: Option<f64>) {
        self.commanded.push(frequency);
    }
}

/// Single-node thermal model of a heated room.
#[derive(Debug, Clone)]
pub struct SimulatedRoom {
    sim: SimulationConfig,
    pump: ControllerConfig,
    indoor_temp: f64,
    cycle: u32,
}

impl SimulatedRoom {
    pub fn new(sim: SimulationConfig, pump: ControllerConfig) -> Self {
        Self {
            indoor_temp: sim.initial_indoor,
            sim,
            pump,
            cycle: 0,
        }
    }

    pub fn indoor_temp(&self) -> f64 {
        self.indoor_temp
    }

    pub fn outdoor_temp(&self) -> f64 {
        let period = self.sim.cycles_per_day.max(1) as f64;
        let phase = TAU * self.cycle as f64 / period;
        self.sim.outdoor_mean + self.sim.outdoor_swing * phase.sin()
    }

    /// Heat output for a pump frequency, inverse of the controller's mapping.
    /// Warm-up (`None`) runs at minimum output.
    pub fn heater_power(&self, frequency: Option<f64>) -> f64 {
        let p = &self.pump;
        match frequency {
            Some(f) => {
                let f = f.clamp(p.f_min, p.f_max);
                p.p_min + (f - p.f_min) / (p.f_max - p.f_min) * (p.p_max - p.p_min)
            }
            None => p.p_min,
        }
    }

    fn warming_up(&self) -> bool {
        self.cycle < self.sim.warmup_cycles
    }

    fn noise(&self) -> f64 {
        if self.sim.sensor_noise > 0.0 {
            self.sim.sensor_noise * (rand::random::<f64>() - 0.5)
        } else {
            0.0
        }
    }
}

impl TelemetrySource for SimulatedRoom {
    fn next_reading(&mut self) -> Option<Reading> {
        Some(Reading {
            outdoor_temp: self.outdoor_temp(),
            indoor_temp: self.indoor_temp + self.noise(),
            heater_active: !self.warming_up(),
        })
    }

    fn actuate(&mut self, frequency: Option<f64>) {
        let heat_gain = self.heater_power(frequency);
        let heat_loss = self.sim.loss_coefficient * (self.indoor_temp - self.outdoor_temp());
        let delta = (heat_gain - heat_loss) * self.sim.step_seconds / self.sim.heat_capacity;
        self.indoor_temp += delta;
        self.cycle += 1;
    }
}

/// What happened in one control cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleRecord {
    pub reading: Reading,
    pub frequency: Option<f64>,
    pub k1: f64,
    pub k2: f64,
    pub persisted: bool,
}

/// Pull one reading, run the controller on it and feed the result back.
pub fn run_cycle(
    controller: &SharedCurveController,
    source: &mut dyn TelemetrySource,
) -> Option<CycleRecord> {
    let reading = source.next_reading()?;
    let (update, frequency) =
        controller.cycle(reading.outdoor_temp, reading.indoor_temp, reading.heater_active);
    source.actuate(frequency);
    Some(CycleRecord {
        reading,
        frequency,
        k1: update.coefficients.k1,
        k2: update.coefficients.k2,
        persisted: update.persisted(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::CurveController;
    use crate::persistence::MemoryStore;

    fn quiet_sim() -> SimulationConfig {
        SimulationConfig {
            outdoor_swing: 0.0,
            warmup_cycles: 2,
            ..SimulationConfig::default()
        }
    }

    #[test]
    fn test_heater_power_inverts_mapping() {
        let room = SimulatedRoom::new(quiet_sim(), ControllerConfig::default());
        assert_eq!(room.heater_power(Some(1.4)), 1100.0);
        assert_eq!(room.heater_power(Some(5.5)), 4300.0);
        assert_eq!(room.heater_power(Some(9.0)), 4300.0);
        assert_eq!(room.heater_power(None), 1100.0);
    }

    #[test]
    fn test_warmup_cycles_report_inactive() {
        let mut room = SimulatedRoom::new(quiet_sim(), ControllerConfig::default());
        let first = room.next_reading().unwrap();
        assert!(!first.heater_active);
        assert_eq!(first.outdoor_temp, -2.0);
        room.actuate(None);
        room.actuate(None);
        assert!(room.next_reading().unwrap().heater_active);
    }

    #[test]
    fn test_room_warms_under_full_power() {
        let mut room = SimulatedRoom::new(quiet_sim(), ControllerConfig::default());
        let before = room.indoor_temp();
        room.actuate(Some(5.5));
        assert!(room.indoor_temp() > before);
    }

    #[test]
    fn test_scripted_run_stops_when_exhausted() {
        let ctrl = CurveController::new(
            ControllerConfig::with_target(22.0),
            10.0,
            30.0,
            Box::new(MemoryStore::new()),
        )
        .unwrap();
        let shared = SharedCurveController::new(ctrl);
        let reading = Reading { outdoor_temp: -5.0, indoor_temp: 18.0, heater_active: true };
        let mut source = ScriptedTelemetry::new([reading]);
        let record = run_cycle(&shared, &mut source).unwrap();
        assert_eq!(record.frequency, Some(1.4));
        assert!(record.persisted);
        assert!(run_cycle(&shared, &mut source).is_none());
        assert_eq!(source.commanded(), &[Some(1.4)]);
    }
}
