//! CommonJS-style module loader executed in an isolated context
//!
//! A [`Sandbox`] owns its module registry: created per evaluation, disposed
//! with it, never process-global. Wrapped module text registers factories by
//! calling `__wd40_module(path, factory)`; `require` installs the module
//! instance in the cache *before* running its factory so circular imports
//! observe a partially populated exports object instead of deadlocking.

use std::cell::RefCell;
use std::rc::Rc;

use fxhash::FxHashMap;
use log::debug;
use parser::{parse_program, MODULE_WRAPPER_FN};

use crate::interpreter::{native, Interpreter, RuntimeError};
use crate::value::{JsObject, ObjectRef, Value};

#[derive(Default)]
struct SandboxState {
    /// path → factory function
    registered: RefCell<FxHashMap<String, Value>>,
    /// path → module instance ({ exports, id, loaded })
    installed: RefCell<FxHashMap<String, ObjectRef>>,
}

/// An isolated module-evaluation context
pub struct Sandbox {
    interpreter: Interpreter,
    state: Rc<SandboxState>,
}

impl Sandbox {
    pub fn new() -> Self {
        let interpreter = Interpreter::new();
        let state = Rc::new(SandboxState::default());

        let register_state = Rc::clone(&state);
        interpreter.define_global(
            MODULE_WRAPPER_FN,
            native(MODULE_WRAPPER_FN, move |_, args| {
                let filename = match args.first() {
                    Some(Value::Str(s)) => s.as_ref().clone(),
                    other => {
                        return Err(RuntimeError::new(format!(
                            "module registration expects a path string, got {}",
                            other.map(|v| v.type_of()).unwrap_or("undefined")
                        )))
                    }
                };
                let factory = match args.get(1) {
                    Some(factory @ (Value::Function(_) | Value::Native(_))) => factory.clone(),
                    other => {
                        return Err(RuntimeError::new(format!(
                            "module registration expects a factory function, got {}",
                            other.map(|v| v.type_of()).unwrap_or("undefined")
                        )))
                    }
                };

                debug!("sandbox: registered module {}", filename);
                register_state.registered.borrow_mut().insert(filename, factory);
                Ok(Value::Undefined)
            }),
        );

        Self { interpreter, state }
    }

    /// Parse and run concatenated wrapped-module text, registering factories
    pub fn execute(&mut self, code: &str) -> Result<(), RuntimeError> {
        let program = parse_program("<wd40-sandbox>", code)
            .map_err(|e| RuntimeError::new(format!("sandbox code failed to parse: {}", e)))?;
        self.interpreter.run_program(&program)
    }

    /// Require a registered module, loading it on first use
    pub fn require(&mut self, id: &str) -> Result<Value, RuntimeError> {
        require_module(&mut self.interpreter, &self.state, id)
    }

    /// Number of registered module factories
    pub fn registered_count(&self) -> usize {
        self.state.registered.borrow().len()
    }
}

impl Default for Sandbox {
    fn default() -> Self {
        Self::new()
    }
}

fn require_module(
    interpreter: &mut Interpreter,
    state: &Rc<SandboxState>,
    id: &str,
) -> Result<Value, RuntimeError> {
    let cached = {
        let installed = state.installed.borrow();
        installed.get(id).map(Rc::clone)
    };
    if let Some(module) = cached {
        let exports = module.borrow().get("exports").unwrap_or(Value::Undefined);
        return Ok(exports);
    }

    let factory = {
        let registered = state.registered.borrow();
        registered.get(id).cloned()
    };
    let factory = factory
        .ok_or_else(|| RuntimeError::new(format!("module is not registered in sandbox: {}", id)))?;

    let exports = Rc::new(RefCell::new(JsObject::new()));
    let mut module = JsObject::new();
    module.insert("exports".to_string(), Value::Object(Rc::clone(&exports)));
    module.insert("id".to_string(), Value::string(id));
    module.insert("loaded".to_string(), Value::Bool(false));
    let module = Rc::new(RefCell::new(module));

    // Install before invoking the factory: a circular require sees the
    // partially populated exports object, matching CommonJS semantics
    state
        .installed
        .borrow_mut()
        .insert(id.to_string(), Rc::clone(&module));

    let require_state = Rc::clone(state);
    let require_fn = native("require", move |interpreter, args| {
        let id = match args.first() {
            Some(Value::Str(s)) => s.as_ref().clone(),
            other => {
                return Err(RuntimeError::new(format!(
                    "require expects a module path string, got {}",
                    other.map(|v| v.type_of()).unwrap_or("undefined")
                )))
            }
        };
        require_module(interpreter, &require_state, &id)
    });

    let export_star_fn = native("export_star", |_, args| {
        let from = match args.first() {
            Some(Value::Object(from)) => Rc::clone(from),
            other => {
                return Err(RuntimeError::new(format!(
                    "export_star expects an exports object, got {}",
                    other.map(|v| v.type_of()).unwrap_or("undefined")
                )))
            }
        };
        let to = match args.get(1) {
            Some(Value::Object(to)) => Rc::clone(to),
            other => {
                return Err(RuntimeError::new(format!(
                    "export_star expects a target object, got {}",
                    other.map(|v| v.type_of()).unwrap_or("undefined")
                )))
            }
        };

        let keys = from.borrow().keys();
        for key in keys {
            if key == "default" {
                continue;
            }
            // Lazy alias, first writer wins
            to.borrow_mut().insert_alias_if_absent(key, Rc::clone(&from));
        }
        Ok(Value::Object(from))
    });

    debug!("sandbox: loading module {}", id);
    interpreter.call_value(
        &factory,
        vec![
            Value::Object(Rc::clone(&module)),
            Value::Object(Rc::clone(&exports)),
            require_fn,
            export_star_fn,
        ],
    )?;

    module.borrow_mut().insert("loaded".to_string(), Value::Bool(true));

    let exports = module.borrow().get("exports").unwrap_or(Value::Undefined);
    Ok(exports)
}
