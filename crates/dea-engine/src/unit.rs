use std::collections::HashSet;

use crate::error::DeaError;

/// One evaluated entity: a single input converted into a single output
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    /// Unique display name, stable across the run
    pub name: String,
    /// External key for downstream joins; not used by the scoring itself
    pub code: u64,
    /// Output value (e.g. a quality index)
    pub output: f64,
    /// Input value (e.g. spending per capita), strictly positive
    pub input: f64,
}

impl Unit {
    pub fn new(name: impl Into<String>, code: u64, output: f64, input: f64) -> Self {
        Self {
            name: name.into(),
            code,
            output,
            input,
        }
    }

    /// Output produced per unit of input
    pub fn productivity(&self) -> f64 {
        self.output / self.input
    }

    pub(crate) fn check(&self) -> Result<(), DeaError> {
        if !self.input.is_finite() {
            return Err(DeaError::malformed(&self.name, "input is not a finite number"));
        }
        if self.input <= 0.0 {
            return Err(DeaError::malformed(
                &self.name,
                format!("input must be positive, got {}", self.input),
            ));
        }
        if !self.output.is_finite() {
            return Err(DeaError::malformed(&self.name, "output is not a finite number"));
        }
        if self.output < 0.0 {
            return Err(DeaError::malformed(
                &self.name,
                format!("output must be non-negative, got {}", self.output),
            ));
        }
        Ok(())
    }
}

/// Position of a unit inside its [`PeerSet`]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitId(pub usize);

/// The validated, immutable, ordered collection of units observed at solve time.
///
/// Every unit is both an evaluated subject and a peer constraining every
/// other subject's program.
#[derive(Debug, Clone)]
pub struct PeerSet {
    units: Vec<Unit>,
}

impl PeerSet {
    /// Validate and freeze a peer set. Fails on an empty set, on any unit with
    /// a non-positive or non-finite input, and on duplicate names.
    pub fn new(units: Vec<Unit>) -> Result<Self, DeaError> {
        if units.is_empty() {
            return Err(DeaError::EmptyPeerSet);
        }

        let mut seen = HashSet::new();
        for unit in &units {
            unit.check()?;
            if !seen.insert(unit.name.as_str()) {
                return Err(DeaError::malformed(&unit.name, "duplicate unit name"));
            }
        }

        Ok(Self { units })
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn get(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(id.0)
    }

    pub fn ids(&self) -> impl Iterator<Item = UnitId> + '_ {
        (0..self.units.len()).map(UnitId)
    }

    pub fn iter(&self) -> impl Iterator<Item = (UnitId, &Unit)> {
        self.units.iter().enumerate().map(|(i, u)| (UnitId(i), u))
    }

    pub fn as_slice(&self) -> &[Unit] {
        &self.units
    }

    pub fn into_units(self) -> Vec<Unit> {
        self.units
    }
}

impl std::ops::Index<UnitId> for PeerSet {
    type Output = Unit;

    fn index(&self, id: UnitId) -> &Unit {
        &self.units[id.0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_peer_set() {
        assert_eq!(PeerSet::new(Vec::new()).unwrap_err(), DeaError::EmptyPeerSet);
    }

    #[test]
    fn test_zero_input_is_malformed() {
        let err = PeerSet::new(vec![Unit::new("A", 1, 5.0, 10.0), Unit::new("B", 2, 4.0, 0.0)]).unwrap_err();
        match err {
            DeaError::MalformedInput { unit, reason } => {
                assert_eq!(unit, "B");
                assert!(reason.contains("positive"), "reason: {}", reason);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_nan_values_are_malformed() {
        assert!(matches!(
            PeerSet::new(vec![Unit::new("A", 1, 5.0, f64::NAN)]),
            Err(DeaError::MalformedInput { .. })
        ));
        assert!(matches!(
            PeerSet::new(vec![Unit::new("A", 1, f64::INFINITY, 10.0)]),
            Err(DeaError::MalformedInput { .. })
        ));
    }

    #[test]
    fn test_duplicate_names_are_malformed() {
        let err = PeerSet::new(vec![Unit::new("A", 1, 5.0, 10.0), Unit::new("A", 2, 4.0, 8.0)]).unwrap_err();
        assert_eq!(
            err,
            DeaError::MalformedInput {
                unit: "A".to_string(),
                reason: "duplicate unit name".to_string(),
            }
        );
    }

    #[test]
    fn test_ids_follow_insertion_order() {
        let peers = PeerSet::new(vec![Unit::new("A", 1, 5.0, 10.0), Unit::new("B", 2, 8.0, 10.0)]).unwrap();
        let names: Vec<&str> = peers.iter().map(|(_, u)| u.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
        assert_eq!(peers[UnitId(1)].code, 2);
        assert!(peers.get(UnitId(2)).is_none());
    }
}
