//! Convenience builder for constructing a `Function`'s `Body` programmatically
//! — used by the test suite to assemble the end-to-end scenarios in §8
//! without hand-indexing block/instruction offsets.

use crate::ids::IdAllocator;
use crate::ir::blocks::{Block, BlockId, Body};
use crate::ir::functions::Function;
use crate::ir::instructions::{Instruction, InstructionId, InstructionKind};
use crate::ir::types::{QualifiedName, TempVar};

pub struct BodyBuilder<'a> {
    alloc: &'a IdAllocator,
    body: Body,
    current: BlockId,
}

impl<'a> BodyBuilder<'a> {
    pub fn new(alloc: &'a IdAllocator) -> Self {
        let mut body = Body::new();
        let entry = body.push_block();
        Self {
            alloc,
            body,
            current: entry,
        }
    }

    pub fn current_block(&self) -> BlockId {
        self.current
    }

    pub fn new_block(&mut self) -> BlockId {
        self.body.push_block()
    }

    pub fn set_current(&mut self, block: BlockId) {
        self.current = block;
    }

    /// Appends `kind` to the current block, returning the new instruction's
    /// id so callers can reference it as a `ValueRef.bind_id`.
    pub fn push(&mut self, kind: InstructionKind) -> InstructionId {
        let block = self.body.block_mut(self.current);
        let offset = block.instructions.len() as u32;
        let id = InstructionId::new(self.current.0, offset);
        let tvi = self.alloc.next_tvi();
        block.push(Instruction::new(id, tvi, kind));
        id
    }

    pub fn finish(self) -> Body {
        self.body
    }
}

/// Builds a trivial single-argument, single-block function whose body is
/// just `Return(arg0)` — the skeleton for scenario 1 ("trivial move").
pub fn build_identity_function(name: QualifiedName, alloc: &IdAllocator) -> Function {
    let mut f = Function::new(name, 1, alloc);
    let mut b = BodyBuilder::new(alloc);
    let bind_id = b.push(InstructionKind::Bind {
        name: TempVar::arg(0),
        rhs: InstructionId::new(0, 0),
    });
    b.push(InstructionKind::ValueRef {
        name: TempVar::arg(0),
        bind_id,
        fields: vec![],
        indices: vec![],
        borrow: false,
        move_: true,
        clone: false,
    });
    b.push(InstructionKind::Return {
        arg: Some(TempVar::arg(0)),
    });
    f.body = b.finish();
    f
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_function_has_three_instructions_in_one_block() {
        let alloc = IdAllocator::new();
        let f = build_identity_function(QualifiedName::function("m", "f"), &alloc);
        assert_eq!(f.body.blocks.len(), 1);
        assert_eq!(f.body.blocks[0].instructions.len(), 3);
    }
}
