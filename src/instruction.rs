use crate::opcode::Opcode;
use crate::operations::*;

/// A decoded opcode: its mnemonic and the operation that executes it
#[derive(Clone, Copy)]
pub struct Instruction {
    pub name: &'static str,
    pub execute: Operation,
}

fn instruction(name: &'static str, execute: Operation) -> Instruction {
    Instruction { name, execute }
}

/// Selects the correct Instruction for a given Opcode
///
/// The first nibble picks a category. Within 0x0, 0xE and 0xF the low byte picks the instruction,
/// within 0x8 the low nibble does. Anything else decodes to `unknown`.
pub fn from_op(op: Opcode) -> Instruction {
    match op.nibbles() {
        (0x0, _, 0xE, 0x0) => instruction("cls", clr),
        (0x0, _, 0xE, 0xE) => instruction("rts", rts),
        (0x1, ..) => instruction("jmp", jump),
        (0x2, ..) => instruction("jsr", call),
        (0x3, ..) => instruction("skeq", ske),
        (0x4, ..) => instruction("skne", skne),
        (0x5, ..) => instruction("skeq", skre),
        (0x6, ..) => instruction("mov", load),
        (0x7, ..) => instruction("add", add),
        (0x8, .., 0x0) => instruction("mov", mv),
        (0x8, .., 0x1) => instruction("or", or),
        (0x8, .., 0x2) => instruction("and", and),
        (0x8, .., 0x3) => instruction("xor", xor),
        (0x8, .., 0x4) => instruction("add", addr),
        (0x8, .., 0x5) => instruction("sub", sub),
        (0x8, .., 0x6) => instruction("shr", shr),
        (0x8, .., 0x7) => instruction("rsb", subn),
        (0x8, .., 0xE) => instruction("shl", shl),
        (0x9, ..) => instruction("skne", skrne),
        (0xA, ..) => instruction("mvi", loadi),
        (0xB, ..) => instruction("jmi", jumpi),
        (0xC, ..) => instruction("rand", rand),
        (0xD, ..) => instruction("sprite", draw),
        (0xE, _, 0x9, 0xE) => instruction("skpr", skpr),
        (0xE, _, 0xA, 0x1) => instruction("skup", skup),
        (0xF, _, 0x0, 0x7) => instruction("gdelay", moved),
        (0xF, _, 0x0, 0xA) => instruction("key", keyd),
        (0xF, _, 0x1, 0x5) => instruction("sdelay", loads),
        (0xF, _, 0x1, 0x8) => instruction("ssound", ld),
        (0xF, _, 0x1, 0xE) => instruction("adi", addi),
        (0xF, _, 0x2, 0x9) => instruction("font", ldspr),
        (0xF, _, 0x3, 0x3) => instruction("bcd", bcd),
        (0xF, _, 0x5, 0x5) => instruction("str", stor),
        (0xF, _, 0x6, 0x5) => instruction("ldr", read),
        _ => instruction("unknown", unknown),
    }
}
