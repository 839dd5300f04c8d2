//! Module-level global variables.

use std::fmt;

use crate::ir::{GlobalId, IrType, Linkage};

/// A global variable.
///
/// A reference to a global, [`Value::Global`](crate::ir::Value::Global), is a
/// pointer to its [`value_type`](Self::value_type).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalVariable {
    id: GlobalId,
    name: String,
    value_type: IrType,
    linkage: Linkage,
    is_constant: bool,
    initializer: Option<i64>,
}

impl GlobalVariable {
    /// Creates a mutable, uninitialized global with external linkage.
    #[must_use]
    pub fn new(name: impl Into<String>, value_type: IrType) -> Self {
        Self {
            id: GlobalId(0),
            name: name.into(),
            value_type,
            linkage: Linkage::External,
            is_constant: false,
            initializer: None,
        }
    }

    /// Builder-style integer initializer.
    #[must_use]
    pub fn with_initializer(mut self, value: i64) -> Self {
        self.initializer = Some(value);
        self
    }

    /// Builder-style constant marker.
    #[must_use]
    pub fn constant(mut self) -> Self {
        self.is_constant = true;
        self
    }

    /// Builder-style linkage setter.
    #[must_use]
    pub fn with_linkage(mut self, linkage: Linkage) -> Self {
        self.linkage = linkage;
        self
    }

    pub(crate) fn set_id(&mut self, id: GlobalId) {
        self.id = id;
    }

    /// Returns the global id.
    #[must_use]
    pub const fn id(&self) -> GlobalId {
        self.id
    }

    /// Returns the symbol name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the type of the stored value.
    #[must_use]
    pub const fn value_type(&self) -> &IrType {
        &self.value_type
    }

    /// Returns the type of a reference to this global.
    #[must_use]
    pub fn pointer_type(&self) -> IrType {
        IrType::ptr(self.value_type.clone())
    }

    /// Returns the linkage.
    #[must_use]
    pub const fn linkage(&self) -> Linkage {
        self.linkage
    }

    /// Returns `true` for read-only globals.
    #[must_use]
    pub const fn is_constant(&self) -> bool {
        self.is_constant
    }

    /// Returns the integer initializer, if any.
    #[must_use]
    pub const fn initializer(&self) -> Option<i64> {
        self.initializer
    }
}

impl fmt::Display for GlobalVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_constant { "constant" } else { "global" };
        write!(
            f,
            "@{} = {} {kind} {}",
            self.name,
            self.linkage.name(),
            self.value_type
        )?;
        if let Some(init) = self.initializer {
            write!(f, " {init}")?;
        }
        Ok(())
    }
}
