//! Machine state storage: the last motor-hours value the remote confirmed.

use crate::model::MachineState;

use super::{Result, Storage, keys};

impl Storage {
    /// Loads the confirmed state for `machine_id`.
    ///
    /// Returns a zeroed state if nothing is stored, or if the stored state
    /// belongs to a different machine.
    pub fn load_machine_state(&self, machine_id: &str) -> Result<MachineState> {
        let stored: Option<MachineState> = self.get_json(keys::MACHINE_STATE)?;
        Ok(stored
            .filter(|s| s.machine_id == machine_id)
            .unwrap_or_else(|| MachineState::new(machine_id)))
    }

    pub fn save_machine_state(&self, state: &MachineState) -> Result<()> {
        self.set_json(keys::MACHINE_STATE, state)
    }
}

#[cfg(test)]
mod tests {
    use jiff::Timestamp;

    use super::*;

    use crate::storage::tests::test_storage;

    #[test]
    fn missing_state_is_zeroed() {
        let (_dir, storage) = test_storage();
        let state = storage.load_machine_state("m1").unwrap();

        assert_eq!(state, MachineState::new("m1"));
    }

    #[test]
    fn save_and_load_state() {
        let (_dir, storage) = test_storage();
        let state = MachineState {
            machine_id: "m1".into(),
            motor_hours: 120.5,
            updated_at: Some(Timestamp::now()),
        };

        storage.save_machine_state(&state).unwrap();

        assert_eq!(storage.load_machine_state("m1").unwrap(), state);
    }

    #[test]
    fn state_for_other_machine_is_ignored() {
        let (_dir, storage) = test_storage();
        let mut state = MachineState::new("m1");
        state.motor_hours = 300.0;
        storage.save_machine_state(&state).unwrap();

        let loaded = storage.load_machine_state("m2").unwrap();
        assert!(loaded.motor_hours.abs() < f64::EPSILON);
    }
}
