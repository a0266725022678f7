//! Action-value table over the discretized greenhouse
//!
//! Fixed shape `(temperature state, humidity state, fan level, mist level)` =
//! `(5, 5, 3, 3)`, stored flat in row-major order so that the 9 action values
//! of one state are contiguous. Within a row the flat action index is
//! `fan * 3 + mist`.
//!
//! ## Blob format
//!
//! ```text
//! "GHQT" | dims: 4 × u32 LE | values: 225 × f64 LE
//! ```
//!
//! Decoding rejects any blob whose length, magic or dimensions differ from
//! the fixed shape; a table is never reshaped on load.

use crate::error::{GreenhouseError, GreenhouseResult};

pub const TEMPERATURE_STATES: usize = 5;
pub const HUMIDITY_STATES: usize = 5;
pub const FAN_LEVELS: usize = 3;
pub const MIST_LEVELS: usize = 3;

/// Actions per state
pub const ACTIONS: usize = FAN_LEVELS * MIST_LEVELS;
/// States in the discretized space
pub const STATES: usize = TEMPERATURE_STATES * HUMIDITY_STATES;

pub const SHAPE: [usize; 4] = [TEMPERATURE_STATES, HUMIDITY_STATES, FAN_LEVELS, MIST_LEVELS];

const MAGIC: &[u8; 4] = b"GHQT";
const HEADER_LEN: usize = MAGIC.len() + SHAPE.len() * 4;
const BLOB_LEN: usize = HEADER_LEN + STATES * ACTIONS * 8;

/// Discretized state: dominant label index per input variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DiscreteState {
    pub temperature: usize,
    pub humidity: usize,
}

impl DiscreteState {
    pub fn new(temperature: usize, humidity: usize) -> Self {
        Self {
            temperature,
            humidity,
        }
    }

    /// Every state, temperature-major
    pub fn all() -> impl Iterator<Item = DiscreteState> {
        (0..TEMPERATURE_STATES)
            .flat_map(|t| (0..HUMIDITY_STATES).map(move |h| DiscreteState::new(t, h)))
    }

    fn offset(&self) -> usize {
        (self.temperature.min(TEMPERATURE_STATES - 1) * HUMIDITY_STATES
            + self.humidity.min(HUMIDITY_STATES - 1))
            * ACTIONS
    }
}

/// Joint actuator action: level index per actuator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Action {
    pub fan: usize,
    pub mist: usize,
}

impl Action {
    pub fn new(fan: usize, mist: usize) -> Self {
        Self { fan, mist }
    }

    /// Action for a flat index `fan * 3 + mist`; out-of-range indices wrap
    pub fn from_flat(index: usize) -> Self {
        let index = index % ACTIONS;
        Self {
            fan: index / MIST_LEVELS,
            mist: index % MIST_LEVELS,
        }
    }

    pub fn flat(&self) -> usize {
        self.fan.min(FAN_LEVELS - 1) * MIST_LEVELS + self.mist.min(MIST_LEVELS - 1)
    }

    pub fn all() -> impl Iterator<Item = Action> {
        (0..ACTIONS).map(Action::from_flat)
    }
}

/// The learned expected return of every (state, action) pair
#[derive(Debug, Clone, PartialEq)]
pub struct ActionValueTable {
    values: Vec<f64>,
}

impl Default for ActionValueTable {
    fn default() -> Self {
        Self::zeros()
    }
}

impl ActionValueTable {
    /// Zero-initialized table
    pub fn zeros() -> Self {
        Self {
            values: vec![0.0; STATES * ACTIONS],
        }
    }

    /// Build from flat row-major values
    pub fn from_values(values: Vec<f64>) -> GreenhouseResult<Self> {
        if values.len() != STATES * ACTIONS {
            return Err(GreenhouseError::invalid_table(format!(
                "expected {} values for shape {:?}, got {}",
                STATES * ACTIONS,
                SHAPE,
                values.len()
            )));
        }
        Ok(Self { values })
    }

    pub fn shape(&self) -> [usize; 4] {
        SHAPE
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn get(&self, state: DiscreteState, action: Action) -> f64 {
        self.values[state.offset() + action.flat()]
    }

    pub fn set(&mut self, state: DiscreteState, action: Action, value: f64) {
        self.values[state.offset() + action.flat()] = value;
    }

    /// The 9 action values of a state, in flat action order
    pub fn row(&self, state: DiscreteState) -> &[f64] {
        let start = state.offset();
        &self.values[start..start + ACTIONS]
    }

    pub fn row_mut(&mut self, state: DiscreteState) -> &mut [f64] {
        let start = state.offset();
        &mut self.values[start..start + ACTIONS]
    }

    /// Greedy action; ties go to the lowest flat index
    pub fn best_action(&self, state: DiscreteState) -> Action {
        let row = self.row(state);
        let mut best = 0;
        for (idx, value) in row.iter().enumerate().skip(1) {
            if *value > row[best] {
                best = idx;
            }
        }
        Action::from_flat(best)
    }

    /// Value of the greedy action
    pub fn max_value(&self, state: DiscreteState) -> f64 {
        self.get(state, self.best_action(state))
    }

    /// Encode as a self-describing binary blob
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(BLOB_LEN);
        out.extend_from_slice(MAGIC);
        for dim in SHAPE {
            out.extend_from_slice(&(dim as u32).to_le_bytes());
        }
        for value in &self.values {
            out.extend_from_slice(&value.to_le_bytes());
        }
        out
    }

    /// Decode a blob written by [`to_bytes`](Self::to_bytes)
    pub fn from_bytes(bytes: &[u8]) -> GreenhouseResult<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(GreenhouseError::invalid_table(format!(
                "blob of {} bytes is shorter than the {} byte header",
                bytes.len(),
                HEADER_LEN
            )));
        }

        let (magic, rest) = bytes.split_at(MAGIC.len());
        if magic != MAGIC {
            return Err(GreenhouseError::invalid_table("not an action-value table blob"));
        }

        let (dims, payload) = rest.split_at(SHAPE.len() * 4);
        let shape: Vec<usize> = dims
            .chunks_exact(4)
            .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]) as usize)
            .collect();
        if shape != SHAPE {
            return Err(GreenhouseError::invalid_table(format!(
                "persisted shape {:?} does not match {:?}",
                shape, SHAPE
            ))
            .with_context("expected", format!("{:?}", SHAPE))
            .with_context("found", format!("{:?}", shape)));
        }

        if bytes.len() != BLOB_LEN {
            return Err(GreenhouseError::invalid_table(format!(
                "expected {} payload bytes, got {}",
                BLOB_LEN - HEADER_LEN,
                payload.len()
            )));
        }

        let values = payload
            .chunks_exact(8)
            .map(|chunk| {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(chunk);
                f64::from_le_bytes(raw)
            })
            .collect();
        Self::from_values(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_flat_action_layout() {
        assert_eq!(Action::from_flat(7), Action::new(2, 1));
        assert_eq!(Action::new(2, 1).flat(), 7);
        assert_eq!(Action::all().count(), 9);
        assert_eq!(DiscreteState::all().count(), 25);
    }

    #[test]
    fn test_best_action_from_row() {
        let mut table = ActionValueTable::zeros();
        let state = DiscreteState::new(3, 1);
        table.row_mut(state)[7] = 4.2;
        table.row_mut(state)[2] = 1.0;
        assert_eq!(table.best_action(state), Action::new(2, 1));
        assert_eq!(table.max_value(state), 4.2);
        // other rows untouched
        assert_eq!(table.best_action(DiscreteState::new(3, 2)), Action::new(0, 0));
    }

    #[test]
    fn test_best_action_ties_break_low() {
        let mut table = ActionValueTable::zeros();
        let state = DiscreteState::new(0, 4);
        table.row_mut(state).copy_from_slice(&[-1.0, -0.5, -0.5, -2.0, -0.5, -3.0, -1.0, -1.0, -1.0]);
        assert_eq!(table.best_action(state), Action::from_flat(1));
    }

    #[test]
    fn test_get_set() {
        let mut table = ActionValueTable::zeros();
        let state = DiscreteState::new(4, 4);
        table.set(state, Action::new(1, 2), -3.5);
        assert_eq!(table.get(state, Action::new(1, 2)), -3.5);
        assert_eq!(table.values()[216 + 5], -3.5);
    }

    #[test]
    fn test_blob_preserves_values() {
        let values: Vec<f64> = (0..225).map(|i| i as f64 * -0.25).collect();
        let table = ActionValueTable::from_values(values).unwrap();
        let bytes = table.to_bytes();
        assert_eq!(bytes.len(), BLOB_LEN);
        assert_eq!(ActionValueTable::from_bytes(&bytes).unwrap(), table);
    }

    #[test]
    fn test_blob_shape_mismatch_rejected() {
        let mut bytes = ActionValueTable::zeros().to_bytes();
        // claim 4 fan levels
        bytes[12..16].copy_from_slice(&4u32.to_le_bytes());
        let err = ActionValueTable::from_bytes(&bytes).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidPersistedTable);
    }

    #[test]
    fn test_truncated_and_foreign_blobs_rejected() {
        let bytes = ActionValueTable::zeros().to_bytes();
        let err = ActionValueTable::from_bytes(&bytes[..bytes.len() - 8]).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidPersistedTable);

        let err = ActionValueTable::from_bytes(b"GH").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidPersistedTable);

        let mut foreign = bytes.clone();
        foreign[..4].copy_from_slice(b"NPY\0");
        assert!(ActionValueTable::from_bytes(&foreign).is_err());

        assert!(ActionValueTable::from_values(vec![0.0; 224]).is_err());
    }
}
