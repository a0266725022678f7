//! Greenhouse physics used as the training oracle
//!
//! A first-order exchange model: temperature and humidity relax toward the
//! outside air, the fan cools and dries, the mist cools and humidifies.
//! Optional Gaussian sensor noise is drawn from an injected random source so
//! training runs can be reproduced from a seed.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

/// Physical constants of the simulated greenhouse
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicsParams {
    pub external_temperature: f64,
    pub external_humidity: f64,
    /// Heat exchange with the outside air
    pub k_temp_external: f64,
    /// Moisture exchange with the outside air
    pub k_hum_external: f64,
    pub k_fan_temp: f64,
    pub k_fan_hum: f64,
    pub k_mist_temp: f64,
    pub k_mist_hum: f64,
    pub optimal_temperature: f64,
    pub optimal_humidity: f64,
    /// Standard deviation of the per-step noise; 0 disables it
    pub noise_sigma: f64,
    pub temperature_bounds: (f64, f64),
    pub humidity_bounds: (f64, f64),
    /// Episode start ranges, half-open
    pub reset_temperature: (f64, f64),
    pub reset_humidity: (f64, f64),
}

impl Default for PhysicsParams {
    fn default() -> Self {
        Self {
            external_temperature: 35.0,
            external_humidity: 40.0,
            k_temp_external: 0.05,
            k_hum_external: 0.05,
            k_fan_temp: 0.15,
            k_fan_hum: 0.1,
            k_mist_temp: 0.05,
            k_mist_hum: 0.2,
            optimal_temperature: 25.0,
            optimal_humidity: 70.0,
            noise_sigma: 0.1,
            temperature_bounds: (0.0, 50.0),
            humidity_bounds: (0.0, 100.0),
            reset_temperature: (10.0, 40.0),
            reset_humidity: (30.0, 90.0),
        }
    }
}

impl PhysicsParams {
    pub fn with_noise(mut self, sigma: f64) -> Self {
        self.noise_sigma = sigma;
        self
    }

    pub fn without_noise(self) -> Self {
        self.with_noise(0.0)
    }

    /// Negative distance from the optimum; humidity weighs half as much
    pub fn reward(&self, state: EnvState) -> f64 {
        -((state.temperature - self.optimal_temperature).abs()
            + 0.5 * (state.humidity - self.optimal_humidity).abs())
    }
}

/// Greenhouse climate reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnvState {
    pub temperature: f64,
    pub humidity: f64,
}

impl EnvState {
    /// State of a freshly built environment, before any reset
    pub const INITIAL: EnvState = EnvState {
        temperature: 25.0,
        humidity: 60.0,
    };

    pub fn new(temperature: f64, humidity: f64) -> Self {
        Self {
            temperature,
            humidity,
        }
    }
}

impl Default for EnvState {
    fn default() -> Self {
        Self::INITIAL
    }
}

/// Result of one environment step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepOutcome {
    pub state: EnvState,
    pub reward: f64,
    /// Never set by the greenhouse; episodes are bounded by the training loop
    pub done: bool,
}

/// Environment the learning agent is trained against
pub trait Environment {
    /// Start a new episode and return its initial state
    fn reset(&mut self) -> EnvState;

    /// Apply actuator powers in [0, 100]
    fn step(&mut self, fan_power: f64, mist_power: f64) -> StepOutcome;

    fn state(&self) -> EnvState;
}

/// Simulated greenhouse
pub struct GreenhouseEnv<R: Rng = StdRng> {
    params: PhysicsParams,
    state: EnvState,
    rng: R,
    noise: Option<Normal<f64>>,
}

impl<R: Rng> GreenhouseEnv<R> {
    pub fn new(params: PhysicsParams, rng: R) -> Self {
        let noise = if params.noise_sigma > 0.0 {
            match Normal::new(0.0, params.noise_sigma) {
                Ok(normal) => Some(normal),
                Err(e) => {
                    log::warn!("noise disabled, sigma {}: {}", params.noise_sigma, e);
                    None
                }
            }
        } else {
            None
        };

        Self {
            params,
            state: EnvState::INITIAL,
            rng,
            noise,
        }
    }

    pub fn params(&self) -> &PhysicsParams {
        &self.params
    }

    pub fn set_state(&mut self, state: EnvState) {
        self.state = self.clamp(state);
    }

    fn clamp(&self, state: EnvState) -> EnvState {
        let (t_lo, t_hi) = self.params.temperature_bounds;
        let (h_lo, h_hi) = self.params.humidity_bounds;
        EnvState {
            temperature: state.temperature.clamp(t_lo, t_hi),
            humidity: state.humidity.clamp(h_lo, h_hi),
        }
    }

    fn sample_noise(&mut self) -> f64 {
        match &self.noise {
            Some(normal) => normal.sample(&mut self.rng),
            None => 0.0,
        }
    }
}

impl GreenhouseEnv<StdRng> {
    /// Environment with a reproducible random source
    pub fn seeded(params: PhysicsParams, seed: u64) -> Self {
        Self::new(params, StdRng::seed_from_u64(seed))
    }

    /// Deterministic physics; only `reset` still draws from the (seeded) source
    pub fn without_noise(params: PhysicsParams) -> Self {
        Self::seeded(params.without_noise(), 0)
    }
}

impl<R: Rng> Environment for GreenhouseEnv<R> {
    fn reset(&mut self) -> EnvState {
        let (t_lo, t_hi) = self.params.reset_temperature;
        let (h_lo, h_hi) = self.params.reset_humidity;
        self.state = EnvState {
            temperature: self.rng.gen_range(t_lo..t_hi),
            humidity: self.rng.gen_range(h_lo..h_hi),
        };
        self.state
    }

    fn step(&mut self, fan_power: f64, mist_power: f64) -> StepOutcome {
        let fan = fan_power.clamp(0.0, 100.0) / 100.0;
        let mist = mist_power.clamp(0.0, 100.0) / 100.0;
        let p = &self.params;
        let EnvState {
            temperature,
            humidity,
        } = self.state;

        let d_temp = p.k_temp_external * (p.external_temperature - temperature)
            - p.k_fan_temp * (fan * 10.0)
            - p.k_mist_temp * (mist * 5.0);
        let d_hum = p.k_hum_external * (p.external_humidity - humidity)
            - p.k_fan_hum * (fan * 10.0)
            + p.k_mist_hum * (mist * 20.0);

        let noise_t = self.sample_noise();
        let noise_h = self.sample_noise();
        let next = self.clamp(EnvState {
            temperature: temperature + d_temp + noise_t,
            humidity: humidity + d_hum + noise_h,
        });
        self.state = next;

        StepOutcome {
            state: next,
            reward: self.params.reward(next),
            done: false,
        }
    }

    fn state(&self) -> EnvState {
        self.state
    }
}
