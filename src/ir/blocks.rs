//! Component B — `Body`/`Block`: a function's structured, nested-block
//! form before CFG lowering.
//!
//! Blocks reference each other by small-integer id through a side table
//! (`Body.blocks[i]`), never by pointer — cyclic structural-loop back-edges
//! live only in the CFG, and only as edge records there (see design notes
//! on arena+index layout).

use crate::ir::instructions::{Instruction, InstructionId, InstructionKind};
use crate::ir::types::MemberInfo;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockId(pub u32);

impl BlockId {
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for BlockId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "block{}", self.0)
    }
}

/// A straight-line sequence of instructions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    pub instructions: Vec<Instruction>,
}

impl Block {
    pub fn new(id: BlockId) -> Self {
        Self {
            id,
            instructions: Vec::new(),
        }
    }

    pub fn push(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }

    /// The block's value for type- and ownership-propagation: the last
    /// non-`Drop`, non-`Nop` instruction.
    pub fn last_real(&self) -> Option<&Instruction> {
        self.instructions
            .iter()
            .rev()
            .find(|i| !i.is_drop() && !i.is_nop())
    }

    pub fn last_real_mut(&mut self) -> Option<&mut Instruction> {
        self.instructions
            .iter_mut()
            .rev()
            .find(|i| !i.is_drop() && !i.is_nop())
    }

    /// Trims trailing `Nop`s (including drops already rewritten to `Nop` by
    /// the borrow-path analyzer) from the tail of the block. Controlled by
    /// `InferenceConfig::trim_trailing_nops` (default on, matching the
    /// reference implementation).
    pub fn trim_trailing_nops(&mut self) {
        while matches!(self.instructions.last(), Some(i) if i.is_nop()) {
            self.instructions.pop();
        }
    }
}

/// A function's structured body: a sequence of blocks referenced by index.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Body {
    pub blocks: Vec<Block>,
}

impl Body {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_block(&mut self) -> BlockId {
        let id = BlockId::new(self.blocks.len() as u32);
        self.blocks.push(Block::new(id));
        id
    }

    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.index()]
    }

    pub fn block_mut(&mut self, id: BlockId) -> &mut Block {
        &mut self.blocks[id.index()]
    }

    pub fn instruction(&self, id: InstructionId) -> &Instruction {
        &self.blocks[id.block_index as usize].instructions[id.offset as usize]
    }

    pub fn instruction_mut(&mut self, id: InstructionId) -> &mut Instruction {
        &mut self.blocks[id.block_index as usize].instructions[id.offset as usize]
    }

    pub fn entry(&self) -> BlockId {
        BlockId::new(0)
    }

    /// Iterates every instruction across every block in block order.
    pub fn iter_instructions(&self) -> impl Iterator<Item = &Instruction> {
        self.blocks.iter().flat_map(|b| b.instructions.iter())
    }

    /// Collates `MemberInfo`s from every instruction and every supplied
    /// path's src/dest members — drives the Equality engine's member-merge
    /// fixed point (§4.F).
    pub fn all_members(&self, extra: &[&[MemberInfo]]) -> Vec<MemberInfo> {
        let mut members = Vec::new();
        for instr in self.iter_instructions() {
            members.extend(instr.members.iter().copied());
        }
        for group in extra {
            members.extend(group.iter().copied());
        }
        members
    }

    pub fn rewrite_cancelled_drops_to_nop(&mut self) {
        for block in &mut self.blocks {
            for instr in &mut block.instructions {
                if let InstructionKind::DropVar {
                    cancelled: true, ..
                } = &instr.kind
                {
                    instr.kind = InstructionKind::Nop;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::IdAllocator;
    use crate::ir::types::TempVar;

    fn bool_instr(id: InstructionId, alloc: &IdAllocator) -> Instruction {
        Instruction::new(id, alloc.next_tvi(), InstructionKind::BoolLiteral { value: true })
    }

    #[test]
    fn last_real_skips_trailing_drops_and_nops() {
        let alloc = IdAllocator::new();
        let mut block = Block::new(BlockId::new(0));
        block.push(bool_instr(InstructionId::new(0, 0), &alloc));
        block.push(Instruction::new(
            InstructionId::new(0, 1),
            alloc.next_tvi(),
            InstructionKind::DropVar {
                name: TempVar::local(0),
                cancelled: false,
            },
        ));
        block.push(Instruction::new(
            InstructionId::new(0, 2),
            alloc.next_tvi(),
            InstructionKind::Nop,
        ));
        let last = block.last_real().unwrap();
        assert_eq!(last.id, InstructionId::new(0, 0));
    }

    #[test]
    fn trim_trailing_nops_removes_only_the_tail() {
        let alloc = IdAllocator::new();
        let mut block = Block::new(BlockId::new(0));
        block.push(bool_instr(InstructionId::new(0, 0), &alloc));
        block.push(Instruction::new(
            InstructionId::new(0, 1),
            alloc.next_tvi(),
            InstructionKind::Nop,
        ));
        block.push(Instruction::new(
            InstructionId::new(0, 2),
            alloc.next_tvi(),
            InstructionKind::Nop,
        ));
        block.trim_trailing_nops();
        assert_eq!(block.instructions.len(), 1);
    }
}
