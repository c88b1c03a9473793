// Copyright (c) 2019-present Vesper Engine contributors.
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

//! Script-agnostic behavior runtime.
//!
//! A behavior *meta* is the static per-file data: a table of optional named
//! callbacks plus a static environment shared by every instance. A *state
//! behavior* additionally maps state names to their own callback tables and
//! names an initial state. An *instance* binds a meta to one entity and holds
//! that entity's private environment.
//!
//! The runtime does not know any scripting language. A host implements
//! [`BehaviorSource`] to produce [`BehaviorDefinition`]s from files; reloading
//! goes through the source again, keeps the old meta when loading fails, and
//! resets live instances to the new initial state only if their current state
//! vanished.

use crate::core::log::Log;
use crate::scene::entity::Entity;
use fxhash::FxHashMap;
use std::{
    cell::RefCell,
    fmt::{Display, Formatter},
    path::{Path, PathBuf},
    rc::Rc,
};
use strum_macros::{AsRefStr, EnumString};

/// The callbacks a behavior file may define.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, AsRefStr, EnumString)]
pub enum CallbackKind {
    OnCreate,
    OnInit,
    OnUpdate,
    OnExit,
    OnCollisionBegin,
    OnCollisionEnd,
    OnMouseEnter,
    OnMouseExit,
    OnMouseClick,
    OnMouseReleased,
}

/// A dynamically typed value in a behavior environment.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    #[default]
    Nil,
    Bool(bool),
    Number(f64),
    Str(String),
}

/// A flat name -> value table. Instances own one; metas own the static one.
#[derive(Clone, Debug, Default)]
pub struct Environment {
    values: FxHashMap<String, Value>,
}

impl Environment {
    pub fn get(&self, name: &str) -> &Value {
        static NIL: Value = Value::Nil;
        self.values.get(name).unwrap_or(&NIL)
    }

    pub fn set<S: Into<String>>(&mut self, name: S, value: Value) {
        self.values.insert(name.into(), value);
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}

/// Everything a callback may touch while it runs.
pub struct BehaviorContext<'a> {
    pub entity: Entity,
    pub delta: f32,
    /// The instance's private environment.
    pub env: &'a mut Environment,
    /// The environment shared between all instances of the meta.
    pub statics: &'a RefCell<Environment>,
}

/// A single behavior callback.
pub type Callback = Rc<dyn Fn(&mut BehaviorContext)>;

/// Set of optional named callbacks.
#[derive(Clone, Default)]
pub struct CallbackTable {
    callbacks: FxHashMap<CallbackKind, Callback>,
}

impl CallbackTable {
    pub fn insert<F>(&mut self, kind: CallbackKind, callback: F)
    where
        F: Fn(&mut BehaviorContext) + 'static,
    {
        self.callbacks.insert(kind, Rc::new(callback));
    }

    pub fn get(&self, kind: CallbackKind) -> Option<&Callback> {
        self.callbacks.get(&kind)
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}

impl std::fmt::Debug for CallbackTable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_set()
            .entries(self.callbacks.keys().map(|kind| kind.as_ref()))
            .finish()
    }
}

/// What a [`BehaviorSource`] produces for one behavior file.
pub struct BehaviorDefinition {
    pub name: String,
    /// Values of the shared static environment.
    pub statics: Environment,
    /// Callbacks outside any state.
    pub global: CallbackTable,
    /// State name -> callbacks; the first entry is the initial state. Empty
    /// for plain (stateless) behaviors.
    pub states: Vec<(String, CallbackTable)>,
}

/// Loads behavior definitions from files. Implemented by the host against its
/// embedded scripting language.
pub trait BehaviorSource {
    fn load(&self, path: &Path) -> Result<BehaviorDefinition, BehaviorError>;
}

/// Errors of the behavior runtime.
#[derive(Debug, Clone)]
pub enum BehaviorError {
    /// The behavior file does not exist.
    FileNotFound(PathBuf),
    /// The source failed to parse or execute the file.
    LoadFailure { path: PathBuf, reason: String },
    /// An instance references a meta the manager does not know.
    UnknownMeta(String),
}

impl Display for BehaviorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            BehaviorError::FileNotFound(path) => {
                write!(f, "Behavior file {} was not found!", path.display())
            }
            BehaviorError::LoadFailure { path, reason } => {
                write!(f, "Unable to load behavior {}. Reason: {}", path.display(), reason)
            }
            BehaviorError::UnknownMeta(name) => {
                write!(f, "Unknown behavior meta {}!", name)
            }
        }
    }
}

impl std::error::Error for BehaviorError {}

struct MetaRecord {
    path: PathBuf,
    global: CallbackTable,
    states: Vec<(String, CallbackTable)>,
    statics: Rc<RefCell<Environment>>,
    /// Bumped on every successful reload; instances revalidate against it.
    version: u64,
}

impl MetaRecord {
    fn initial_state(&self) -> Option<&str> {
        self.states.first().map(|(name, _)| name.as_str())
    }

    fn state_table(&self, state: &str) -> Option<&CallbackTable> {
        self.states
            .iter()
            .find(|(name, _)| name == state)
            .map(|(_, table)| table)
    }
}

/// An instance of a behavior, bound to exactly one entity.
#[derive(Debug)]
pub struct BehaviorInstance {
    meta: String,
    state: Option<String>,
    env: Environment,
    seen_version: u64,
}

impl BehaviorInstance {
    pub fn meta_name(&self) -> &str {
        &self.meta
    }

    pub fn state(&self) -> Option<&str> {
        self.state.as_deref()
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut Environment {
        &mut self.env
    }
}

/// Owns the loaded metas and runs instances. See module docs.
pub struct BehaviorManager {
    source: Box<dyn BehaviorSource>,
    metas: FxHashMap<String, MetaRecord>,
}

impl BehaviorManager {
    pub fn new(source: Box<dyn BehaviorSource>) -> Self {
        Self {
            source,
            metas: FxHashMap::default(),
        }
    }

    /// Loads the behavior file and registers its meta under the definition's
    /// name. Returns that name.
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<String, BehaviorError> {
        let path = path.as_ref();
        let definition = self.source.load(path)?;
        let name = definition.name.clone();
        let version = self
            .metas
            .get(&name)
            .map(|record| record.version + 1)
            .unwrap_or(0);
        self.metas.insert(
            name.clone(),
            MetaRecord {
                path: path.to_path_buf(),
                global: definition.global,
                states: definition.states,
                statics: Rc::new(RefCell::new(definition.statics)),
                version,
            },
        );
        Ok(name)
    }

    /// Reconstructs the meta from its file. On failure the old meta stays
    /// valid and the error only goes to the log; live instances are not
    /// touched. On success, instances whose state still exists continue
    /// unaffected, the rest reset to the new initial state at their next run.
    pub fn reload(&mut self, name: &str) {
        let Some(record) = self.metas.get(name) else {
            Log::err(format!("Attempt to reload unknown behavior {}!", name));
            return;
        };
        let path = record.path.clone();
        match self.source.load(&path) {
            Ok(definition) => {
                let record = self.metas.get_mut(name).unwrap();
                record.global = definition.global;
                record.states = definition.states;
                *record.statics.borrow_mut() = definition.statics;
                record.version += 1;
            }
            Err(error) => {
                Log::err(format!(
                    "Behavior reload failed, keeping the previous meta. Reason: {}",
                    error
                ));
            }
        }
    }

    /// Creates an instance of the named meta. State behaviors start in their
    /// initial state.
    pub fn instantiate(&self, name: &str) -> Result<BehaviorInstance, BehaviorError> {
        let record = self
            .metas
            .get(name)
            .ok_or_else(|| BehaviorError::UnknownMeta(name.to_string()))?;
        Ok(BehaviorInstance {
            meta: name.to_string(),
            state: record.initial_state().map(str::to_string),
            env: Environment::default(),
            seen_version: record.version,
        })
    }

    /// Switches a state behavior instance to another state, if it exists.
    pub fn switch_state(&self, instance: &mut BehaviorInstance, state: &str) -> bool {
        let Some(record) = self.metas.get(&instance.meta) else {
            return false;
        };
        if record.state_table(state).is_some() {
            instance.state = Some(state.to_string());
            true
        } else {
            false
        }
    }

    /// Runs the given callback of the instance, if present. State callbacks
    /// shadow global ones. Instances whose meta was reloaded under them are
    /// revalidated first.
    pub fn run(
        &self,
        kind: CallbackKind,
        instance: &mut BehaviorInstance,
        entity: Entity,
        delta: f32,
    ) {
        let Some(record) = self.metas.get(&instance.meta) else {
            return;
        };

        if instance.seen_version != record.version {
            instance.seen_version = record.version;
            let state_still_exists = instance
                .state
                .as_deref()
                .is_some_and(|state| record.state_table(state).is_some());
            if !state_still_exists {
                instance.state = record.initial_state().map(str::to_string);
                instance.env.clear();
            }
        }

        let callback = instance
            .state
            .as_deref()
            .and_then(|state| record.state_table(state))
            .and_then(|table| table.get(kind))
            .or_else(|| record.global.get(kind))
            .cloned();

        if let Some(callback) = callback {
            let mut context = BehaviorContext {
                entity,
                delta,
                env: &mut instance.env,
                statics: &record.statics,
            };
            callback(&mut context);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::cell::Cell;

    struct TestSource {
        /// Which state set to serve; lets tests simulate edited files.
        variant: Rc<Cell<u32>>,
        calls: Rc<Cell<u32>>,
    }

    impl BehaviorSource for TestSource {
        fn load(&self, path: &Path) -> Result<BehaviorDefinition, BehaviorError> {
            if path.to_string_lossy().contains("missing") {
                return Err(BehaviorError::FileNotFound(path.to_path_buf()));
            }

            let calls = self.calls.clone();
            let mut idle = CallbackTable::default();
            idle.insert(CallbackKind::OnUpdate, move |ctx| {
                calls.set(calls.get() + 1);
                ctx.env.set("ticks", Value::Number(f64::from(calls.get())));
            });

            let states = match self.variant.get() {
                0 => vec![
                    ("idle".to_string(), idle),
                    ("chase".to_string(), CallbackTable::default()),
                ],
                _ => vec![("patrol".to_string(), idle)],
            };

            Ok(BehaviorDefinition {
                name: "guard".to_string(),
                statics: Environment::default(),
                global: CallbackTable::default(),
                states,
            })
        }
    }

    fn manager() -> (BehaviorManager, Rc<Cell<u32>>, Rc<Cell<u32>>) {
        let variant = Rc::new(Cell::new(0));
        let calls = Rc::new(Cell::new(0));
        let manager = BehaviorManager::new(Box::new(TestSource {
            variant: variant.clone(),
            calls: calls.clone(),
        }));
        (manager, variant, calls)
    }

    #[test]
    fn instances_start_in_the_initial_state() {
        let (mut manager, _, calls) = manager();
        manager.load("guard.behavior").unwrap();

        let mut instance = manager.instantiate("guard").unwrap();
        assert_eq!(instance.state(), Some("idle"));

        manager.run(CallbackKind::OnUpdate, &mut instance, Entity::NONE, 0.016);
        assert_eq!(calls.get(), 1);
        assert_eq!(instance.env().get("ticks"), &Value::Number(1.0));
    }

    #[test]
    fn switch_state_rejects_unknown_states() {
        let (mut manager, _, _) = manager();
        manager.load("guard.behavior").unwrap();
        let mut instance = manager.instantiate("guard").unwrap();

        assert!(manager.switch_state(&mut instance, "chase"));
        assert_eq!(instance.state(), Some("chase"));
        assert!(!manager.switch_state(&mut instance, "flee"));
        assert_eq!(instance.state(), Some("chase"));
    }

    #[test]
    fn reload_preserves_surviving_states() {
        let (mut manager, _, _) = manager();
        manager.load("guard.behavior").unwrap();
        let mut instance = manager.instantiate("guard").unwrap();
        instance.env_mut().set("hp", Value::Number(10.0));

        // Same file again, the idle state still exists.
        manager.reload("guard");
        manager.run(CallbackKind::OnUpdate, &mut instance, Entity::NONE, 0.016);
        assert_eq!(instance.state(), Some("idle"));
        assert_eq!(instance.env().get("hp"), &Value::Number(10.0));
    }

    #[test]
    fn reload_resets_instances_with_vanished_states() {
        let (mut manager, variant, _) = manager();
        manager.load("guard.behavior").unwrap();
        let mut instance = manager.instantiate("guard").unwrap();
        instance.env_mut().set("hp", Value::Number(10.0));

        // The edited file only has a "patrol" state.
        variant.set(1);
        manager.reload("guard");
        manager.run(CallbackKind::OnUpdate, &mut instance, Entity::NONE, 0.016);
        assert_eq!(instance.state(), Some("patrol"));
        assert_eq!(instance.env().get("hp"), &Value::Nil);
    }

    #[test]
    fn failed_reload_keeps_the_old_meta() {
        let (mut manager, _, calls) = manager();
        manager.load("guard.behavior").unwrap();
        let mut instance = manager.instantiate("guard").unwrap();

        // Point the record at a missing file and reload; the old callbacks
        // must stay in place.
        manager.metas.get_mut("guard").unwrap().path = PathBuf::from("missing.behavior");
        manager.reload("guard");

        manager.run(CallbackKind::OnUpdate, &mut instance, Entity::NONE, 0.016);
        assert_eq!(calls.get(), 1);
        assert_eq!(instance.state(), Some("idle"));
    }
}
