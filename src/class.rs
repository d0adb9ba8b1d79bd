use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::callable::{Callable, LoxFunction};
use crate::error::{LoxError, Result};
use crate::interpreter::Interpreter;
use crate::token::Token;
use crate::value::Value;

/// Shared handle to a class object; clones refer to the same class.
#[derive(Clone)]
pub struct LoxClass {
    data: Rc<ClassData>,
}

struct ClassData {
    name: String,
    superclass: Option<LoxClass>,
    methods: HashMap<String, LoxFunction>,
}

impl LoxClass {
    pub fn new(
        name: String,
        superclass: Option<LoxClass>,
        methods: HashMap<String, LoxFunction>,
    ) -> Self {
        LoxClass {
            data: Rc::new(ClassData {
                name,
                superclass,
                methods,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.data.name
    }

    /// Look a method up on this class, then along the superclass chain.
    pub fn find_method(&self, name: &str) -> Option<LoxFunction> {
        match self.data.methods.get(name) {
            Some(method) => Some(method.clone()),
            None => self
                .data
                .superclass
                .as_ref()
                .and_then(|superclass| superclass.find_method(name)),
        }
    }

    pub fn ptr_eq(&self, other: &LoxClass) -> bool {
        Rc::ptr_eq(&self.data, &other.data)
    }
}

impl Callable for LoxClass {
    fn arity(&self) -> usize {
        self.find_method("init").map_or(0, |init| init.arity())
    }

    /// Instantiate, running `init` (if any) against the fresh instance.
    fn call(&self, interpreter: &mut Interpreter<'_>, arguments: Vec<Value>) -> Result<Value> {
        let instance = LoxInstance::new(self.clone());

        if let Some(initializer) = self.find_method("init") {
            initializer.bind(&instance).call(interpreter, arguments)?;
        }

        Ok(Value::Instance(instance))
    }
}

impl fmt::Display for LoxClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<class {}>", self.data.name)
    }
}

impl fmt::Debug for LoxClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoxClass")
            .field("name", &self.data.name)
            .field("superclass", &self.data.superclass)
            .finish_non_exhaustive()
    }
}

/// Shared handle to an instance; field writes are visible through every clone.
#[derive(Clone)]
pub struct LoxInstance {
    data: Rc<InstanceData>,
}

struct InstanceData {
    class: LoxClass,
    fields: RefCell<HashMap<String, Value>>,
}

impl LoxInstance {
    pub fn new(class: LoxClass) -> Self {
        LoxInstance {
            data: Rc::new(InstanceData {
                class,
                fields: RefCell::new(HashMap::new()),
            }),
        }
    }

    /// Fields shadow methods; a method comes back bound to this instance.
    pub fn get(&self, name: &Token) -> Result<Value> {
        let field: Option<Value> = self.data.fields.borrow().get(&name.lexeme).cloned();

        if let Some(value) = field {
            return Ok(value);
        }

        self.data
            .class
            .find_method(&name.lexeme)
            .map(|method| Value::Function(method.bind(self)))
            .ok_or_else(|| {
                LoxError::runtime(name.line, format!("Undefined property '{}'.", name.lexeme))
            })
    }

    pub fn set(&self, name: &Token, value: Value) {
        self.data
            .fields
            .borrow_mut()
            .insert(name.lexeme.clone(), value);
    }

    pub fn ptr_eq(&self, other: &LoxInstance) -> bool {
        Rc::ptr_eq(&self.data, &other.data)
    }
}

impl fmt::Display for LoxInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<instance {}>", self.data.class.name())
    }
}

impl fmt::Debug for LoxInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoxInstance")
            .field("class", &self.data.class.name())
            .finish_non_exhaustive()
    }
}
