//! IR instructions with explicit operands.
//!
//! Each [`Instruction`] pairs a function-unique [`InstId`] with an [`Opcode`]
//! that names its operation and carries its operand [`Value`]s, the result
//! type (`void` when the instruction produces nothing) and a small string
//! metadata map. Direct calls carry the callee's [`FuncId`] and the ordered
//! actual arguments.

use std::{collections::BTreeMap, fmt};

use strum::IntoStaticStr;

use crate::ir::{FuncId, InstId, IrType, Value};

/// Block index inside a function.
pub type BlockIndex = usize;

/// Binary arithmetic and bitwise operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum BinaryOp {
    /// Integer addition.
    Add,
    /// Integer subtraction.
    Sub,
    /// Integer multiplication.
    Mul,
    /// Signed division.
    SDiv,
    /// Unsigned division.
    UDiv,
    /// Signed remainder.
    SRem,
    /// Bitwise and.
    And,
    /// Bitwise or.
    Or,
    /// Bitwise xor.
    Xor,
    /// Shift left.
    Shl,
    /// Arithmetic shift right.
    AShr,
    /// Floating-point addition.
    FAdd,
    /// Floating-point subtraction.
    FSub,
    /// Floating-point multiplication.
    FMul,
    /// Floating-point division.
    FDiv,
}

/// Comparison predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum ComparePredicate {
    /// Equal.
    Eq,
    /// Not equal.
    Ne,
    /// Signed less than.
    Slt,
    /// Signed less or equal.
    Sle,
    /// Signed greater than.
    Sgt,
    /// Signed greater or equal.
    Sge,
}

/// The operation performed by an instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Opcode {
    /// Read the value stored at `ptr`.
    Load {
        /// Address read from.
        ptr: Value,
    },
    /// Write `value` to `ptr`.
    Store {
        /// Value written.
        value: Value,
        /// Address written to.
        ptr: Value,
    },
    /// Two-operand arithmetic.
    Binary {
        /// Operator.
        op: BinaryOp,
        /// Left operand.
        lhs: Value,
        /// Right operand.
        rhs: Value,
    },
    /// Comparison producing an `i1`.
    Compare {
        /// Predicate.
        pred: ComparePredicate,
        /// Left operand.
        lhs: Value,
        /// Right operand.
        rhs: Value,
    },
    /// Conversion of `value` to the instruction's result type.
    Cast {
        /// Converted value.
        value: Value,
    },
    /// Address arithmetic: `base` offset by `indices`.
    ElementPtr {
        /// Base address.
        base: Value,
        /// Offsets applied in order.
        indices: Vec<Value>,
    },
    /// Stack slot holding one value of `allocated`.
    Alloca {
        /// Type of the slot contents.
        allocated: IrType,
    },
    /// Direct call to a known function.
    Call {
        /// Called function.
        callee: FuncId,
        /// Actual arguments in call order.
        args: Vec<Value>,
    },
    /// Call through a computed function address.
    CallIndirect {
        /// Callee address.
        callee: Value,
        /// Actual arguments in call order.
        args: Vec<Value>,
    },
    /// Unconditional jump.
    Jump {
        /// Target block.
        target: BlockIndex,
    },
    /// Two-way conditional branch.
    Branch {
        /// Condition (`i1`).
        cond: Value,
        /// Target when `cond` is true.
        then_block: BlockIndex,
        /// Target when `cond` is false.
        else_block: BlockIndex,
    },
    /// Return from the function.
    Return {
        /// Returned value, `None` for `void` functions.
        value: Option<Value>,
    },
    /// Control never reaches this point.
    Unreachable,
}

impl Opcode {
    /// Returns the mnemonic of this opcode.
    #[must_use]
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Self::Load { .. } => "load",
            Self::Store { .. } => "store",
            Self::Binary { op, .. } => op.into(),
            Self::Compare { .. } => "icmp",
            Self::Cast { .. } => "cast",
            Self::ElementPtr { .. } => "getelementptr",
            Self::Alloca { .. } => "alloca",
            Self::Call { .. } => "call",
            Self::CallIndirect { .. } => "call.indirect",
            Self::Jump { .. } => "br",
            Self::Branch { .. } => "br.cond",
            Self::Return { .. } => "ret",
            Self::Unreachable => "unreachable",
        }
    }

    /// Returns the operand values in order.
    #[must_use]
    pub fn operands(&self) -> Vec<&Value> {
        match self {
            Self::Load { ptr } => vec![ptr],
            Self::Store { value, ptr } => vec![value, ptr],
            Self::Binary { lhs, rhs, .. } | Self::Compare { lhs, rhs, .. } => vec![lhs, rhs],
            Self::Cast { value } => vec![value],
            Self::ElementPtr { base, indices } => {
                let mut ops = vec![base];
                ops.extend(indices);
                ops
            }
            Self::Call { args, .. } => args.iter().collect(),
            Self::CallIndirect { callee, args } => {
                let mut ops = vec![callee];
                ops.extend(args);
                ops
            }
            Self::Branch { cond, .. } => vec![cond],
            Self::Return { value } => value.iter().collect(),
            Self::Alloca { .. } | Self::Jump { .. } | Self::Unreachable => Vec::new(),
        }
    }

    /// Returns mutable references to the operand values in order.
    pub fn operands_mut(&mut self) -> Vec<&mut Value> {
        match self {
            Self::Load { ptr } => vec![ptr],
            Self::Store { value, ptr } => vec![value, ptr],
            Self::Binary { lhs, rhs, .. } | Self::Compare { lhs, rhs, .. } => vec![lhs, rhs],
            Self::Cast { value } => vec![value],
            Self::ElementPtr { base, indices } => {
                let mut ops = vec![base];
                ops.extend(indices.iter_mut());
                ops
            }
            Self::Call { args, .. } => args.iter_mut().collect(),
            Self::CallIndirect { callee, args } => {
                let mut ops = vec![callee];
                ops.extend(args.iter_mut());
                ops
            }
            Self::Branch { cond, .. } => vec![cond],
            Self::Return { value } => value.iter_mut().collect(),
            Self::Alloca { .. } | Self::Jump { .. } | Self::Unreachable => Vec::new(),
        }
    }

    /// Returns the callee and arguments of a direct call.
    #[must_use]
    pub fn as_call(&self) -> Option<(FuncId, &[Value])> {
        match self {
            Self::Call { callee, args } => Some((*callee, args)),
            _ => None,
        }
    }

    /// Returns `true` if this opcode ends a basic block.
    #[must_use]
    pub const fn is_terminator(&self) -> bool {
        matches!(
            self,
            Self::Jump { .. } | Self::Branch { .. } | Self::Return { .. } | Self::Unreachable
        )
    }
}

/// An instruction in a basic block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    id: InstId,
    op: Opcode,
    ty: IrType,
    metadata: BTreeMap<String, String>,
}

impl Instruction {
    /// Creates an instruction producing a value of type `ty`.
    ///
    /// Use [`IrType::Void`] for instructions without a result.
    #[must_use]
    pub fn new(id: InstId, op: Opcode, ty: IrType) -> Self {
        Self {
            id,
            op,
            ty,
            metadata: BTreeMap::new(),
        }
    }

    /// Returns the instruction id.
    #[must_use]
    pub const fn id(&self) -> InstId {
        self.id
    }

    /// Returns the operation.
    #[must_use]
    pub const fn op(&self) -> &Opcode {
        &self.op
    }

    /// Returns a mutable reference to the operation.
    pub fn op_mut(&mut self) -> &mut Opcode {
        &mut self.op
    }

    /// Returns the result type (`void` when there is no result).
    #[must_use]
    pub const fn ty(&self) -> &IrType {
        &self.ty
    }

    /// Returns the result value, if the instruction produces one.
    #[must_use]
    pub fn result(&self) -> Option<Value> {
        (!self.ty.is_void()).then_some(Value::Result(self.id))
    }

    /// Returns a metadata entry.
    #[must_use]
    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    /// Sets a metadata entry, replacing any previous value.
    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.metadata.insert(key.into(), value.into());
    }

    /// Builder-style [`set_metadata`](Self::set_metadata).
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_metadata(key, value);
        self
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.ty.is_void() {
            write!(f, "{} = ", self.id)?;
        }

        match &self.op {
            Opcode::Load { ptr } => write!(f, "load {}, {ptr}", self.ty)?,
            Opcode::Store { value, ptr } => write!(f, "store {value}, {ptr}")?,
            Opcode::Compare { pred, lhs, rhs } => {
                let pred: &'static str = pred.into();
                write!(f, "icmp {pred} {lhs}, {rhs}")?;
            }
            Opcode::Alloca { allocated } => write!(f, "alloca {allocated}")?,
            Opcode::Call { callee, args } => {
                write!(f, "call {} {callee}(", self.ty)?;
                write_list(f, args)?;
                write!(f, ")")?;
            }
            Opcode::CallIndirect { callee, args } => {
                write!(f, "call {} {callee}(", self.ty)?;
                write_list(f, args)?;
                write!(f, ")")?;
            }
            Opcode::Jump { target } => write!(f, "br bb{target}")?,
            Opcode::Branch {
                cond,
                then_block,
                else_block,
            } => write!(f, "br {cond}, bb{then_block}, bb{else_block}")?,
            Opcode::Return { value: Some(v) } => write!(f, "ret {v}")?,
            Opcode::Return { value: None } => write!(f, "ret void")?,
            op => {
                write!(f, "{} ", op.mnemonic())?;
                let operands: Vec<&Value> = op.operands();
                for (i, operand) in operands.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{operand}")?;
                }
            }
        }

        for (key, value) in &self.metadata {
            write!(f, " !{key} \"{value}\"")?;
        }
        Ok(())
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, values: &[Value]) -> fmt::Result {
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{value}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::GlobalId;

    #[test]
    fn test_operands_cover_every_value() {
        let op = Opcode::ElementPtr {
            base: Value::arg(0),
            indices: vec![Value::i32(1), Value::Global(GlobalId(2))],
        };
        assert_eq!(op.operands().len(), 3);

        let op = Opcode::CallIndirect {
            callee: Value::arg(1),
            args: vec![Value::i32(4)],
        };
        assert_eq!(op.operands(), vec![&Value::arg(1), &Value::i32(4)]);

        assert!(Opcode::Unreachable.operands().is_empty());
        assert_eq!(Opcode::Return { value: None }.operands().len(), 0);
    }

    #[test]
    fn test_operands_mut_rewrites_in_place() {
        let mut op = Opcode::Store {
            value: Value::Result(InstId(3)),
            ptr: Value::arg(0),
        };
        for operand in op.operands_mut() {
            if *operand == Value::Result(InstId(3)) {
                *operand = Value::Result(InstId(9));
            }
        }
        assert_eq!(
            op,
            Opcode::Store {
                value: Value::Result(InstId(9)),
                ptr: Value::arg(0),
            }
        );
    }

    #[test]
    fn test_result_and_metadata() {
        let call = Instruction::new(
            InstId(4),
            Opcode::Call {
                callee: FuncId(1),
                args: vec![Value::arg(0)],
            },
            IrType::i32(),
        )
        .with_metadata("memo.key", "5");

        assert_eq!(call.result(), Some(Value::Result(InstId(4))));
        assert_eq!(call.metadata("memo.key"), Some("5"));
        assert_eq!(call.op().as_call().map(|(f, _)| f), Some(FuncId(1)));
        assert_eq!(
            call.to_string(),
            "%4 = call i32 fn#1(%arg0) !memo.key \"5\""
        );

        let store = Instruction::new(
            InstId(5),
            Opcode::Store {
                value: Value::i32(1),
                ptr: Value::arg(0),
            },
            IrType::Void,
        );
        assert_eq!(store.result(), None);
    }
}
