//! IR values and identifiers.
//!
//! Every operand in the IR is a [`Value`], a closed sum type over the four
//! things an instruction can consume: a function argument, a literal
//! constant, a global variable, or the result of another instruction.
//! Consumers match on it exhaustively; there is no catch-all value kind.
//!
//! Values are plain data and do not own their users. The users of a value are
//! found by scanning instruction operands, see [`Function::uses_of`].
//!
//! [`Function::uses_of`]: crate::ir::Function::uses_of

use std::fmt;

use crate::ir::IrType;

/// Identifier of a function within a [`Module`](crate::ir::Module).
///
/// Identifiers are indices in declaration order and stay stable while
/// functions are appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FuncId(pub u32);

impl FuncId {
    /// Creates an identifier from a declaration index.
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index as u32)
    }

    /// Returns the declaration index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for FuncId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fn#{}", self.0)
    }
}

/// Identifier of a global variable within a [`Module`](crate::ir::Module).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GlobalId(pub u32);

impl GlobalId {
    /// Creates an identifier from a declaration index.
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index as u32)
    }

    /// Returns the declaration index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for GlobalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "global#{}", self.0)
    }
}

/// Identifier of an instruction, unique within its function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstId(pub u32);

impl fmt::Display for InstId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// A literal constant.
///
/// Floating-point payloads are stored as raw IEEE-754 bits so constants are
/// `Eq` and `Hash`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Constant {
    /// Integer literal of the given type.
    Int {
        /// Integer type of the literal.
        ty: IrType,
        /// Sign-extended value.
        value: i64,
    },
    /// Floating-point literal (`f32` or `f64`).
    Float {
        /// Floating-point type of the literal.
        ty: IrType,
        /// Raw bits of the value widened to `f64`.
        bits: u64,
    },
    /// Null pointer of the given pointer type.
    Null(IrType),
    /// Undefined value of the given type.
    Undef(IrType),
}

impl Constant {
    /// Integer literal.
    #[must_use]
    pub fn int(ty: IrType, value: i64) -> Self {
        Self::Int { ty, value }
    }

    /// Double-precision literal.
    #[must_use]
    pub fn f64(value: f64) -> Self {
        Self::Float {
            ty: IrType::F64,
            bits: value.to_bits(),
        }
    }

    /// Single-precision literal.
    #[must_use]
    pub fn f32(value: f32) -> Self {
        Self::Float {
            ty: IrType::F32,
            bits: f64::from(value).to_bits(),
        }
    }

    /// Returns the type of the constant.
    #[must_use]
    pub fn ty(&self) -> &IrType {
        match self {
            Self::Int { ty, .. } | Self::Float { ty, .. } | Self::Null(ty) | Self::Undef(ty) => {
                ty
            }
        }
    }

    /// Returns `true` for integer and floating-point literals.
    ///
    /// These are the constants with a compile-time known numeric payload.
    #[must_use]
    pub const fn is_literal(&self) -> bool {
        matches!(self, Self::Int { .. } | Self::Float { .. })
    }

    /// Decimal text of a numeric literal, `None` for null and undef.
    #[must_use]
    pub fn decimal_text(&self) -> Option<String> {
        match self {
            Self::Int { value, .. } => Some(value.to_string()),
            Self::Float { ty, bits } => Some(float_text(ty, *bits)),
            Self::Null(_) | Self::Undef(_) => None,
        }
    }
}

/// Shortest text that reads back as the same value at the literal's own width.
fn float_text(ty: &IrType, bits: u64) -> String {
    let value = f64::from_bits(bits);
    if *ty == IrType::F32 {
        #[allow(clippy::cast_possible_truncation)]
        let narrow = value as f32;
        narrow.to_string()
    } else {
        value.to_string()
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int { ty, value } => write!(f, "{ty} {value}"),
            Self::Float { ty, bits } => write!(f, "{ty} {}", float_text(ty, *bits)),
            Self::Null(ty) => write!(f, "{ty} null"),
            Self::Undef(ty) => write!(f, "{ty} undef"),
        }
    }
}

/// An instruction operand.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    /// The function's parameter at this index.
    Argument(u32),
    /// A literal constant.
    Constant(Constant),
    /// The address of a global variable.
    Global(GlobalId),
    /// The result of an instruction in the same function.
    Result(InstId),
}

impl Value {
    /// The argument at `index`.
    #[must_use]
    pub const fn arg(index: u32) -> Self {
        Self::Argument(index)
    }

    /// An integer literal.
    #[must_use]
    pub fn int(ty: IrType, value: i64) -> Self {
        Self::Constant(Constant::int(ty, value))
    }

    /// An `i32` literal.
    #[must_use]
    pub fn i32(value: i32) -> Self {
        Self::int(IrType::i32(), i64::from(value))
    }

    /// Returns the constant if this value is one.
    #[must_use]
    pub const fn as_constant(&self) -> Option<&Constant> {
        match self {
            Self::Constant(c) => Some(c),
            _ => None,
        }
    }

    /// Returns the global if this value references one.
    #[must_use]
    pub const fn as_global(&self) -> Option<GlobalId> {
        match self {
            Self::Global(g) => Some(*g),
            _ => None,
        }
    }

    /// Returns `true` for integer and floating-point literals.
    #[must_use]
    pub fn is_literal(&self) -> bool {
        self.as_constant().is_some_and(Constant::is_literal)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Argument(index) => write!(f, "%arg{index}"),
            Self::Constant(c) => write!(f, "{c}"),
            Self::Global(g) => write!(f, "@{}", g.0),
            Self::Result(id) => write!(f, "{id}"),
        }
    }
}
