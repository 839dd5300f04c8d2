//! The program unit: functions and globals in declaration order.

use std::{collections::HashMap, fmt};

use crate::{
    ir::{FuncId, Function, GlobalId, GlobalVariable, IrType, Value},
    Error, Result,
};

/// A compiled program unit.
///
/// Functions and globals are stored in declaration order and identified by
/// their index, so ids handed out stay valid while new items are appended.
/// Items are never removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Module {
    name: String,
    functions: Vec<Function>,
    globals: Vec<GlobalVariable>,
    symbols: HashMap<String, FuncId>,
}

impl Module {
    /// Creates an empty module.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Returns the module name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Appends a function and returns its id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateSymbol`] if a function with the same name
    /// already exists.
    pub fn add_function(&mut self, mut function: Function) -> Result<FuncId> {
        if self.symbols.contains_key(function.name()) {
            return Err(Error::DuplicateSymbol(function.name().to_string()));
        }
        let id = FuncId::new(self.functions.len());
        function.set_id(id);
        self.symbols.insert(function.name().to_string(), id);
        self.functions.push(function);
        Ok(id)
    }

    /// Appends a global and returns its id.
    pub fn add_global(&mut self, mut global: GlobalVariable) -> GlobalId {
        let id = GlobalId::new(self.globals.len());
        global.set_id(id);
        self.globals.push(global);
        id
    }

    /// Returns the functions in declaration order.
    #[must_use]
    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    /// Returns the number of functions.
    #[must_use]
    pub fn function_count(&self) -> usize {
        self.functions.len()
    }

    /// Returns the ids of all functions in declaration order.
    pub fn function_ids(&self) -> impl Iterator<Item = FuncId> {
        (0..self.functions.len()).map(FuncId::new)
    }

    /// Returns the function with `id`.
    #[must_use]
    pub fn function(&self, id: FuncId) -> Option<&Function> {
        self.functions.get(id.index())
    }

    /// Returns mutable access to the function with `id`.
    pub fn function_mut(&mut self, id: FuncId) -> Option<&mut Function> {
        self.functions.get_mut(id.index())
    }

    /// Returns mutable access to every function in declaration order.
    pub fn functions_mut(&mut self) -> impl Iterator<Item = &mut Function> {
        self.functions.iter_mut()
    }

    /// Returns the function with `id` or a [`Error::FunctionNotFound`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::FunctionNotFound`] for a dangling id.
    pub fn try_function(&self, id: FuncId) -> Result<&Function> {
        self.function(id).ok_or(Error::FunctionNotFound(id))
    }

    /// Looks up a function by symbol name.
    #[must_use]
    pub fn function_by_name(&self, name: &str) -> Option<&Function> {
        self.symbols.get(name).and_then(|id| self.function(*id))
    }

    /// Returns the globals in declaration order.
    #[must_use]
    pub fn globals(&self) -> &[GlobalVariable] {
        &self.globals
    }

    /// Returns the global with `id`.
    #[must_use]
    pub fn global(&self, id: GlobalId) -> Option<&GlobalVariable> {
        self.globals.get(id.index())
    }

    /// Returns the global with `id` or a [`Error::GlobalNotFound`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::GlobalNotFound`] for a dangling id.
    pub fn try_global(&self, id: GlobalId) -> Result<&GlobalVariable> {
        self.global(id).ok_or(Error::GlobalNotFound(id))
    }

    /// Returns the type of `value` as seen from inside `func`.
    ///
    /// Global references have the pointer type of the global.
    #[must_use]
    pub fn value_type(&self, func: FuncId, value: &Value) -> Option<IrType> {
        match value {
            Value::Global(g) => self.global(*g).map(GlobalVariable::pointer_type),
            _ => self.function(func)?.local_value_type(value),
        }
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "; module {}", self.name)?;
        for global in &self.globals {
            writeln!(f, "{global}")?;
        }
        for function in &self.functions {
            writeln!(f)?;
            write!(f, "{function}")?;
        }
        Ok(())
    }
}
