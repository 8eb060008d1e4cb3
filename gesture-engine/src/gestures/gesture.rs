//! Named gestures

use super::example::GestureExample;
use serde::{Deserialize, Serialize};

/// A named category of motion backed by recorded examples.
///
/// Examples keep recording order so an index is a stable handle for the
/// host's gallery view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gesture {
    name: String,
    #[serde(default)]
    examples: Vec<GestureExample>,
}

impl Gesture {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            examples: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn examples(&self) -> &[GestureExample] {
        &self.examples
    }

    pub fn example_count(&self) -> usize {
        self.examples.len()
    }

    /// Append an example, returning its index
    pub(crate) fn push_example(&mut self, example: GestureExample) -> usize {
        self.examples.push(example);
        self.examples.len() - 1
    }

    /// Remove the example at `index`, shifting later examples down
    pub(crate) fn remove_example(&mut self, index: usize) -> crate::Result<GestureExample> {
        if index >= self.examples.len() {
            return Err(crate::Error::IndexOutOfRange {
                index,
                len: self.examples.len(),
            });
        }
        Ok(self.examples.remove(index))
    }
}
