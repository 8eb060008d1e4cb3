//! Gesture Bank
//!
//! The set of all gestures known to the engine, keyed by unique name and
//! kept in insertion order so listings are deterministic.

use super::example::GestureExample;
use super::gesture::Gesture;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// All gestures known to the engine
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct GestureBank {
    gestures: Vec<Gesture>,
}

impl GestureBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a bank from loaded gestures, rejecting duplicate names.
    pub fn from_gestures(gestures: Vec<Gesture>) -> crate::Result<Self> {
        let mut bank = Self::new();
        for gesture in gestures {
            if bank.contains(gesture.name()) {
                return Err(crate::Error::DuplicateName(gesture.name().to_string()));
            }
            bank.gestures.push(gesture);
        }
        Ok(bank)
    }

    /// Name used when the caller does not supply one
    pub fn default_name(&self) -> String {
        format!("Gesture {}", self.gestures.len() + 1)
    }

    /// Create an empty gesture.
    ///
    /// Without a name the gesture is called `"Gesture <count+1>"`. Fails with
    /// `DuplicateName` if the resulting name is taken.
    pub fn create(&mut self, name: Option<&str>) -> crate::Result<&Gesture> {
        let name = match name {
            Some(name) => name.to_string(),
            None => self.default_name(),
        };
        if self.contains(&name) {
            return Err(crate::Error::DuplicateName(name));
        }

        debug!(gesture = %name, "Created gesture");
        self.gestures.push(Gesture::new(name));
        let index = self.gestures.len() - 1;
        Ok(&self.gestures[index])
    }

    /// Delete a gesture and all of its examples
    pub fn delete(&mut self, name: &str) -> crate::Result<Gesture> {
        let index = self.position(name)?;
        let removed = self.gestures.remove(index);
        debug!(
            gesture = %name,
            examples = removed.example_count(),
            "Deleted gesture"
        );
        Ok(removed)
    }

    /// Gesture names in insertion order.
    ///
    /// The iterator is lazy and cloneable, so callers can walk it again
    /// without re-borrowing the bank.
    pub fn names(&self) -> impl Iterator<Item = &str> + Clone + '_ {
        self.gestures.iter().map(Gesture::name)
    }

    /// Append a finished example to a gesture, returning its index
    pub fn append_example(&mut self, name: &str, example: GestureExample) -> crate::Result<usize> {
        let index = self.position(name)?;
        if example.is_empty() {
            return Err(crate::Error::EmptyExample);
        }
        Ok(self.gestures[index].push_example(example))
    }

    /// Remove one example by position
    pub fn remove_example(&mut self, name: &str, index: usize) -> crate::Result<GestureExample> {
        let position = self.position(name)?;
        self.gestures[position].remove_example(index)
    }

    pub fn get(&self, name: &str) -> Option<&Gesture> {
        self.gestures.iter().find(|g| g.name() == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Gesture> {
        self.gestures.iter()
    }

    pub fn len(&self) -> usize {
        self.gestures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gestures.is_empty()
    }

    /// Total number of examples across all gestures
    pub fn example_count(&self) -> usize {
        self.gestures.iter().map(Gesture::example_count).sum()
    }

    /// Owned copy of every gesture that has examples, for the training worker
    pub fn snapshot(&self) -> TrainingSet {
        TrainingSet {
            classes: self
                .gestures
                .iter()
                .filter(|g| g.example_count() > 0)
                .map(|g| LabelledExamples {
                    label: g.name().to_string(),
                    examples: g.examples().to_vec(),
                })
                .collect(),
        }
    }

    fn position(&self, name: &str) -> crate::Result<usize> {
        self.gestures
            .iter()
            .position(|g| g.name() == name)
            .ok_or_else(|| crate::Error::NotFound(format!("gesture '{}'", name)))
    }
}

impl<'de> Deserialize<'de> for GestureBank {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let gestures = Vec::<Gesture>::deserialize(deserializer)?;
        GestureBank::from_gestures(gestures).map_err(serde::de::Error::custom)
    }
}

/// Examples of one gesture, detached from the bank
#[derive(Debug, Clone, PartialEq)]
pub struct LabelledExamples {
    pub label: String,
    pub examples: Vec<GestureExample>,
}

/// Snapshot of the bank handed to a training run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingSet {
    pub classes: Vec<LabelledExamples>,
}

impl TrainingSet {
    /// Labels in bank order
    pub fn labels(&self) -> Vec<String> {
        self.classes.iter().map(|c| c.label.clone()).collect()
    }

    pub fn example_count(&self) -> usize {
        self.classes.iter().map(|c| c.examples.len()).sum()
    }

    /// True when no gesture has an example
    pub fn is_empty(&self) -> bool {
        self.example_count() == 0
    }
}
