//! Event and callback dispatch
//!
//! The projector never calls host code directly. `event` and `call`
//! instructions go through a [`Dispatcher`] passed in by the caller.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

use crate::projector::element::Element;
use crate::value::Value;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DispatchError {
    #[error("callback '{name}' not found")]
    UnknownCallback { name: String },

    #[error("callback '{name}' failed: {message}")]
    Failed { name: String, message: String },
}

/// Payload of an event or callback invocation
#[derive(Debug, Clone, Copy)]
pub struct Detail<'a> {
    /// Command value
    pub value: &'a Value,
    /// The data context the element was rendered with
    pub data: &'a Value,
    pub arguments: &'a [Value],
}

/// Host capability for the deferred `event` and `call` actions
pub trait Dispatcher {
    /// Fire a named event on the element
    fn dispatch_event(
        &mut self,
        element: &Element,
        name: &str,
        detail: Detail<'_>,
    ) -> Result<(), DispatchError>;

    /// Invoke a named callback with the element
    fn invoke(
        &mut self,
        element: &mut Element,
        name: &str,
        detail: Detail<'_>,
    ) -> Result<(), DispatchError>;
}

pub type Callback = Box<dyn FnMut(&mut Element, Detail<'_>) -> Result<(), String>>;

/// An event seen by [`Callbacks`]
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedEvent {
    pub name: String,
    /// Tag of the element the event was fired on
    pub target: String,
    pub value: Value,
    pub arguments: Vec<Value>,
}

/// Registry of named callbacks that also records dispatched events
#[derive(Default)]
pub struct Callbacks {
    callbacks: BTreeMap<String, Callback>,
    events: Vec<RecordedEvent>,
}

impl Callbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback, replacing any previous one with the same name
    pub fn register<F>(&mut self, name: impl Into<String>, callback: F) -> &mut Self
    where
        F: FnMut(&mut Element, Detail<'_>) -> Result<(), String> + 'static,
    {
        self.callbacks.insert(name.into(), Box::new(callback));
        self
    }

    pub fn with<F>(mut self, name: impl Into<String>, callback: F) -> Self
    where
        F: FnMut(&mut Element, Detail<'_>) -> Result<(), String> + 'static,
    {
        self.register(name, callback);
        self
    }

    /// Merge `local` into this registry; its callbacks win on name clashes
    pub fn extend(&mut self, local: Callbacks) {
        self.callbacks.extend(local.callbacks);
        self.events.extend(local.events);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.callbacks.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.callbacks.keys().map(|k| k.as_str())
    }

    pub fn events(&self) -> &[RecordedEvent] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<RecordedEvent> {
        std::mem::take(&mut self.events)
    }
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("callbacks", &self.callbacks.keys().collect::<Vec<_>>())
            .field("events", &self.events)
            .finish()
    }
}

impl Dispatcher for Callbacks {
    fn dispatch_event(
        &mut self,
        element: &Element,
        name: &str,
        detail: Detail<'_>,
    ) -> Result<(), DispatchError> {
        self.events.push(RecordedEvent {
            name: name.to_string(),
            target: element.tag().to_string(),
            value: detail.value.clone(),
            arguments: detail.arguments.to_vec(),
        });
        Ok(())
    }

    fn invoke(
        &mut self,
        element: &mut Element,
        name: &str,
        detail: Detail<'_>,
    ) -> Result<(), DispatchError> {
        let callback = self
            .callbacks
            .get_mut(name)
            .ok_or_else(|| DispatchError::UnknownCallback {
                name: name.to_string(),
            })?;
        callback(element, detail).map_err(|message| DispatchError::Failed {
            name: name.to_string(),
            message,
        })
    }
}
