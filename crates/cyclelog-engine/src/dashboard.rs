//! Operator-tunable dashboard inputs.
//!
//! Dashboard values are inputs to the control loop like any sensor, so
//! they are logged under `NetworkInputs/` every cycle. In record mode
//! each input reads its [`DashboardBackend`]; in replay mode it reads the
//! recorded value back from the table and the backend is ignored.
//!
//! Input handles are cheap clones sharing one state: register one clone
//! with the logger and read the current value through another.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use cyclelog_core::keys::NETWORK_INPUTS;
use cyclelog_core::{FromValue, Table, Value};
use indexmap::IndexMap;

/// A key-value store the operator edits while the loop runs.
pub trait DashboardBackend: Send + Sync {
    /// Current value at `key`, if any.
    fn get(&self, key: &str) -> Option<Value>;

    /// Publish `value` at `key`.
    fn set(&self, key: &str, value: Value);
}

/// An in-memory [`DashboardBackend`].
#[derive(Clone, Debug, Default)]
pub struct MemoryDashboard {
    values: Arc<Mutex<IndexMap<String, Value>>>,
}

impl MemoryDashboard {
    /// An empty dashboard.
    pub fn new() -> Self {
        Self::default()
    }
}

impl DashboardBackend for MemoryDashboard {
    fn get(&self, key: &str) -> Option<Value> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: Value) {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_owned(), value);
    }
}

/// Something the logger updates once per cycle before user code.
pub trait DashboardInput: Send {
    /// Refresh from the backend (record) or from `table` (replay), then
    /// log the current value into `table`. `table` is the root entry
    /// table.
    fn periodic(&mut self, table: &Table, replaying: bool);
}

fn remove_slash(key: &str) -> &str {
    key.strip_prefix('/').unwrap_or(key)
}

// ── Scalar inputs ────────────────────────────────────────────────

/// A logged dashboard value of type `T`.
///
/// Use the [`LoggedNumber`], [`LoggedBoolean`] and [`LoggedString`]
/// aliases.
pub struct LoggedInput<T> {
    key: String,
    default: T,
    backend: Arc<dyn DashboardBackend>,
    value: Arc<Mutex<T>>,
}

/// A logged dashboard number.
pub type LoggedNumber = LoggedInput<f64>;
/// A logged dashboard toggle.
pub type LoggedBoolean = LoggedInput<bool>;
/// A logged dashboard text field.
pub type LoggedString = LoggedInput<String>;

impl<T> LoggedInput<T>
where
    T: Clone + FromValue + Into<Value> + Send + 'static,
{
    /// An input at `key`, publishing `default` to the backend unless the
    /// backend already holds a value.
    pub fn new(key: impl Into<String>, default: T, backend: Arc<dyn DashboardBackend>) -> Self {
        let key = key.into();
        let current = backend
            .get(&key)
            .and_then(|v| T::from_value(&v))
            .unwrap_or_else(|| default.clone());
        backend.set(&key, current.clone().into());
        Self {
            key,
            default,
            backend,
            value: Arc::new(Mutex::new(current)),
        }
    }

    /// The dashboard key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The value seen by the control loop this cycle.
    pub fn get(&self) -> T {
        self.value
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Publish a new value to the backend. It reaches the control loop
    /// on the next record-mode cycle.
    pub fn set(&self, value: T) {
        self.backend.set(&self.key, value.into());
    }
}

impl<T> Clone for LoggedInput<T>
where
    T: Clone,
{
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            default: self.default.clone(),
            backend: Arc::clone(&self.backend),
            value: Arc::clone(&self.value),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for LoggedInput<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggedInput")
            .field("key", &self.key)
            .field("default", &self.default)
            .finish_non_exhaustive()
    }
}

impl<T> DashboardInput for LoggedInput<T>
where
    T: Clone + FromValue + Into<Value> + Send + 'static,
{
    fn periodic(&mut self, table: &Table, replaying: bool) {
        let inputs = table.subtable(NETWORK_INPUTS);
        let key = remove_slash(&self.key);
        let mut value = self.value.lock().unwrap_or_else(PoisonError::into_inner);
        if replaying {
            *value = inputs.get(key, self.default.clone());
        } else {
            *value = self
                .backend
                .get(&self.key)
                .and_then(|v| T::from_value(&v))
                .unwrap_or_else(|| self.default.clone());
            inputs.put(key, value.clone());
        }
    }
}

// ── Chooser ──────────────────────────────────────────────────────

type ChangeListener<T> = Box<dyn FnMut(&T) + Send>;

struct ChooserState<T> {
    options: IndexMap<String, T>,
    default_option: Option<String>,
    selected: String,
    previous: String,
    listener: Option<ChangeListener<T>>,
}

/// A logged dashboard selection among named options.
///
/// The backend holds the selected option name at `<key>/selected` and
/// the option list at `<key>/options`. The selected name is logged at
/// `NetworkInputs/SmartDashboard/<key>`.
pub struct LoggedChooser<T> {
    key: String,
    backend: Arc<dyn DashboardBackend>,
    state: Arc<Mutex<ChooserState<T>>>,
}

impl<T: Clone + Send + 'static> LoggedChooser<T> {
    /// A chooser with no options.
    pub fn new(key: impl Into<String>, backend: Arc<dyn DashboardBackend>) -> Self {
        Self {
            key: key.into(),
            backend,
            state: Arc::new(Mutex::new(ChooserState {
                options: IndexMap::new(),
                default_option: None,
                selected: String::new(),
                previous: String::new(),
                listener: None,
            })),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ChooserState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish_options(&self, state: &ChooserState<T>) {
        let names: Vec<String> = state.options.keys().cloned().collect();
        self.backend
            .set(&format!("{}/options", self.key), Value::from(names));
        if let Some(default) = &state.default_option {
            self.backend
                .set(&format!("{}/default", self.key), Value::string(default.clone()));
        }
    }

    /// Add a selectable option.
    pub fn add_option(&self, name: impl Into<String>, value: T) {
        let mut state = self.lock();
        state.options.insert(name.into(), value);
        self.publish_options(&state);
    }

    /// Add the option used when nothing is selected.
    pub fn add_default_option(&self, name: impl Into<String>, value: T) {
        let name = name.into();
        let mut state = self.lock();
        state.options.insert(name.clone(), value);
        state.default_option = Some(name);
        self.publish_options(&state);
    }

    /// Call `listener` with the new value whenever the selection changes.
    pub fn on_change(&self, listener: impl FnMut(&T) + Send + 'static) {
        self.lock().listener = Some(Box::new(listener));
    }

    /// Name of the selected option this cycle.
    pub fn selected_name(&self) -> String {
        self.lock().selected.clone()
    }

    /// Value of the selected option, falling back to the default option.
    pub fn get(&self) -> Option<T> {
        let state = self.lock();
        state
            .options
            .get(&state.selected)
            .or_else(|| {
                state
                    .default_option
                    .as_ref()
                    .and_then(|d| state.options.get(d))
            })
            .cloned()
    }

    /// Select `name` on the backend, as an operator would.
    pub fn select(&self, name: &str) {
        self.backend
            .set(&format!("{}/selected", self.key), Value::string(name));
    }
}

impl<T> Clone for LoggedChooser<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            backend: Arc::clone(&self.backend),
            state: Arc::clone(&self.state),
        }
    }
}

impl<T> fmt::Debug for LoggedChooser<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggedChooser")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl<T: Clone + Send + 'static> DashboardInput for LoggedChooser<T> {
    fn periodic(&mut self, table: &Table, replaying: bool) {
        let inputs = table.subtable(NETWORK_INPUTS).subtable("SmartDashboard");
        let key = remove_slash(&self.key).to_owned();
        let mut state = self.lock();

        if replaying {
            let current = state.selected.clone();
            state.selected = inputs.get(&key, current);
        } else {
            let default = state.default_option.clone().unwrap_or_default();
            state.selected = self
                .backend
                .get(&format!("{}/selected", self.key))
                .and_then(|v| v.as_str().map(str::to_owned))
                .unwrap_or(default);
            inputs.put(&key, state.selected.clone());
        }

        if state.previous == state.selected {
            return;
        }
        state.previous = state.selected.clone();
        let value = state
            .options
            .get(&state.selected)
            .or_else(|| {
                state
                    .default_option
                    .as_ref()
                    .and_then(|d| state.options.get(d))
            })
            .cloned();
        let listener = state.listener.take();
        drop(state);

        // Called unlocked so the listener may read the chooser.
        if let Some(mut listener) = listener {
            if let Some(value) = value {
                listener(&value);
            }
            let mut state = self.lock();
            if state.listener.is_none() {
                state.listener = Some(listener);
            }
        }
    }
}
