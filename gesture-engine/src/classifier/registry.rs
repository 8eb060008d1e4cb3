//! Classifier Registry
//!
//! Named classifiers available for selection, with at most one current.

use super::classifier::Classifier;
use super::model::TrainedModel;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info};

/// Registry shared between the engine owner and readers on other threads.
///
/// Only the owner writes, and only briefly (select, install, invalidate).
pub type SharedRegistry = Arc<RwLock<ClassifierRegistry>>;

/// Named classifier configurations
#[derive(Debug, Clone, Default)]
pub struct ClassifierRegistry {
    classifiers: Vec<Classifier>,
    current: Option<String>,
}

impl ClassifierRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with untrained classifiers
    pub fn with_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut registry = Self::new();
        for name in names {
            // Duplicates in the list are collapsed
            let _ = registry.register(name);
        }
        registry
    }

    pub fn into_shared(self) -> SharedRegistry {
        Arc::new(RwLock::new(self))
    }

    /// Add an untrained classifier
    pub fn register(&mut self, name: impl Into<String>) -> crate::Result<&Classifier> {
        let name = name.into();
        if self.contains(&name) {
            return Err(crate::Error::DuplicateName(name));
        }
        debug!(classifier = %name, "Registered classifier");
        self.classifiers.push(Classifier::new(name));
        let index = self.classifiers.len() - 1;
        Ok(&self.classifiers[index])
    }

    /// Add or replace a classifier with a trained model loaded from storage
    pub fn restore(&mut self, name: &str, model: TrainedModel) {
        let model = Arc::new(model);
        match self.classifiers.iter_mut().find(|c| c.name() == name) {
            Some(classifier) => classifier.install(model),
            None => {
                let mut classifier = Classifier::new(name);
                classifier.install(model);
                self.classifiers.push(classifier);
            }
        }
    }

    /// Remove a classifier. Clears the selection if it was current.
    pub fn remove(&mut self, name: &str) -> crate::Result<Classifier> {
        let index = self.position(name)?;
        if self.current.as_deref() == Some(name) {
            self.current = None;
        }
        Ok(self.classifiers.remove(index))
    }

    /// Make `name` the current classifier. Unknown names change nothing.
    pub fn select(&mut self, name: &str) -> crate::Result<()> {
        self.position(name)?;
        info!(classifier = %name, "Selected classifier");
        self.current = Some(name.to_string());
        Ok(())
    }

    /// Name of the current classifier
    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn current_classifier(&self) -> Option<&Classifier> {
        self.current.as_deref().and_then(|name| self.get(name))
    }

    pub fn get(&self, name: &str) -> Option<&Classifier> {
        self.classifiers.iter().find(|c| c.name() == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Classifier names in registration order
    pub fn names(&self) -> impl Iterator<Item = &str> + Clone + '_ {
        self.classifiers.iter().map(Classifier::name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Classifier> {
        self.classifiers.iter()
    }

    pub fn len(&self) -> usize {
        self.classifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classifiers.is_empty()
    }

    /// Swap in a freshly trained model
    pub(crate) fn install(&mut self, name: &str, model: Arc<TrainedModel>) -> crate::Result<()> {
        let index = self.position(name)?;
        self.classifiers[index].install(model);
        Ok(())
    }

    /// Drop the trained model of every classifier that knows `label`.
    /// Returns the names of the classifiers that were reset.
    pub(crate) fn invalidate_label(&mut self, label: &str) -> Vec<String> {
        let mut reset = Vec::new();
        for classifier in self.classifiers.iter_mut() {
            if classifier.labels().iter().any(|l| l == label) {
                classifier.invalidate();
                reset.push(classifier.name().to_string());
            }
        }
        reset
    }

    fn position(&self, name: &str) -> crate::Result<usize> {
        self.classifiers
            .iter()
            .position(|c| c.name() == name)
            .ok_or_else(|| crate::Error::NotFound(format!("classifier '{}'", name)))
    }
}
