use rand::RngCore;

use crate::constants::{
    ADDRESS_MASK, DISPLAY_HEIGHT, DISPLAY_WIDTH, INSTRUCTION_SIZE, SPRITE_BYTES,
};
use crate::error::Chip8Error;
use crate::opcode::Opcode;
use crate::state::State;

/// What the CPU should do after an operation has run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// The operation ran to completion; timers tick
    Next,
    /// No key is held for a key wait; nothing changed and the same opcode runs again next step
    Wait,
    /// A jump to its own address; the program will never make progress again
    SelfLoop,
}

/// Every operation has the same signature so they can be dispatched through a table
pub type Operation =
    fn(op: Opcode, state: &mut State, rng: &mut dyn RngCore) -> Result<Flow, Chip8Error>;

/// pc += 2
fn next(state: &mut State) -> Result<Flow, Chip8Error> {
    state.pc += INSTRUCTION_SIZE;
    Ok(Flow::Next)
}

/// if condition then pc += 4 else pc += 2
fn skip_if(state: &mut State, condition: bool) -> Result<Flow, Chip8Error> {
    state.pc += if condition {
        2 * INSTRUCTION_SIZE
    } else {
        INSTRUCTION_SIZE
    };
    Ok(Flow::Next)
}

/// clear
pub fn clr(_op: Opcode, state: &mut State, _rng: &mut dyn RngCore) -> Result<Flow, Chip8Error> {
    state.clear_screen();
    next(state)
}

/// PC = STACK.pop() + 2
/// The stack holds the address of the call itself, so execution resumes after it
pub fn rts(_op: Opcode, state: &mut State, _rng: &mut dyn RngCore) -> Result<Flow, Chip8Error> {
    state.pc = state.pop()?;
    next(state)
}

/// PC = addr
pub fn jump(op: Opcode, state: &mut State, _rng: &mut dyn RngCore) -> Result<Flow, Chip8Error> {
    if op.addr() == state.pc {
        return Ok(Flow::SelfLoop);
    }
    state.pc = op.addr();
    Ok(Flow::Next)
}

/// STACK.push(PC); PC = addr
pub fn call(op: Opcode, state: &mut State, _rng: &mut dyn RngCore) -> Result<Flow, Chip8Error> {
    state.push(state.pc)?;
    state.pc = op.addr();
    Ok(Flow::Next)
}

/// if Vx == kk then pc += 2
pub fn ske(op: Opcode, state: &mut State, _rng: &mut dyn RngCore) -> Result<Flow, Chip8Error> {
    let condition = state.v[op.x() as usize] == op.kk();
    skip_if(state, condition)
}

/// if Vx != kk then pc += 2
pub fn skne(op: Opcode, state: &mut State, _rng: &mut dyn RngCore) -> Result<Flow, Chip8Error> {
    let condition = state.v[op.x() as usize] != op.kk();
    skip_if(state, condition)
}

/// if Vx == Vy then pc += 2
pub fn skre(op: Opcode, state: &mut State, _rng: &mut dyn RngCore) -> Result<Flow, Chip8Error> {
    let condition = state.v[op.x() as usize] == state.v[op.y() as usize];
    skip_if(state, condition)
}

/// Vx = kk
pub fn load(op: Opcode, state: &mut State, _rng: &mut dyn RngCore) -> Result<Flow, Chip8Error> {
    state.v[op.x() as usize] = op.kk();
    next(state)
}

/// Vx += kk
/// Add kk to Vx; allow for overflow but implicitly drop it
pub fn add(op: Opcode, state: &mut State, _rng: &mut dyn RngCore) -> Result<Flow, Chip8Error> {
    let x = op.x() as usize;
    state.v[x] = state.v[x].wrapping_add(op.kk());
    next(state)
}

/// Vx = Vy
pub fn mv(op: Opcode, state: &mut State, _rng: &mut dyn RngCore) -> Result<Flow, Chip8Error> {
    state.v[op.x() as usize] = state.v[op.y() as usize];
    next(state)
}

/// Vx |= Vy
pub fn or(op: Opcode, state: &mut State, _rng: &mut dyn RngCore) -> Result<Flow, Chip8Error> {
    state.v[op.x() as usize] |= state.v[op.y() as usize];
    next(state)
}

/// Vx &= Vy
pub fn and(op: Opcode, state: &mut State, _rng: &mut dyn RngCore) -> Result<Flow, Chip8Error> {
    state.v[op.x() as usize] &= state.v[op.y() as usize];
    next(state)
}

/// Vx ^= Vy
pub fn xor(op: Opcode, state: &mut State, _rng: &mut dyn RngCore) -> Result<Flow, Chip8Error> {
    state.v[op.x() as usize] ^= state.v[op.y() as usize];
    next(state)
}

/// Vx += Vy; VF = carry || Vx > 0xFF - Vx
/// The comparison is made on the wrapped result, after the addition.
pub fn addr(op: Opcode, state: &mut State, _rng: &mut dyn RngCore) -> Result<Flow, Chip8Error> {
    let (res, carry) = state.v[op.x() as usize].overflowing_add(state.v[op.y() as usize]);
    state.v[op.x() as usize] = res;
    state.v[0xF] = (carry || res > 0xFF - res) as u8;
    next(state)
}

/// Vx -= Vy; VF = !borrow
pub fn sub(op: Opcode, state: &mut State, _rng: &mut dyn RngCore) -> Result<Flow, Chip8Error> {
    let (vx, vy) = (state.v[op.x() as usize], state.v[op.y() as usize]);
    state.v[0xF] = if vy > vx { 0x0 } else { 0x1 };
    state.v[op.x() as usize] = vx.wrapping_sub(vy);
    next(state)
}

/// Vx >>= 1; VF = lsb
pub fn shr(op: Opcode, state: &mut State, _rng: &mut dyn RngCore) -> Result<Flow, Chip8Error> {
    let vx = state.v[op.x() as usize];
    state.v[0xF] = vx & 0x1;
    state.v[op.x() as usize] = vx >> 1;
    next(state)
}

/// Vx = Vy - Vx; VF = !borrow
pub fn subn(op: Opcode, state: &mut State, _rng: &mut dyn RngCore) -> Result<Flow, Chip8Error> {
    let (vx, vy) = (state.v[op.x() as usize], state.v[op.y() as usize]);
    state.v[0xF] = if vx > vy { 0x0 } else { 0x1 };
    state.v[op.x() as usize] = vy.wrapping_sub(vx);
    next(state)
}

/// Vx <<= 1; VF = msb
pub fn shl(op: Opcode, state: &mut State, _rng: &mut dyn RngCore) -> Result<Flow, Chip8Error> {
    let vx = state.v[op.x() as usize];
    state.v[0xF] = vx >> 7;
    state.v[op.x() as usize] = vx << 1;
    next(state)
}

/// if Vx != Vy then pc += 2
pub fn skrne(op: Opcode, state: &mut State, _rng: &mut dyn RngCore) -> Result<Flow, Chip8Error> {
    let condition = state.v[op.x() as usize] != state.v[op.y() as usize];
    skip_if(state, condition)
}

/// I = addr
pub fn loadi(op: Opcode, state: &mut State, _rng: &mut dyn RngCore) -> Result<Flow, Chip8Error> {
    state.i = op.addr();
    next(state)
}

/// PC = V0 + addr
pub fn jumpi(op: Opcode, state: &mut State, _rng: &mut dyn RngCore) -> Result<Flow, Chip8Error> {
    state.pc = (op.addr() + u16::from(state.v[0x0])) & ADDRESS_MASK;
    Ok(Flow::Next)
}

/// Vx = rand_byte & kk
pub fn rand(op: Opcode, state: &mut State, rng: &mut dyn RngCore) -> Result<Flow, Chip8Error> {
    let rand_byte = rng.next_u32() as u8;
    state.v[op.x() as usize] = rand_byte & op.kk();
    next(state)
}

/// draw_sprite(x=Vx y=Vy size=n)
/// XORs a sprite from memory i..i+n at position x, y on the FrameBuffer with wrapping.
/// Sets VF if any pixels were erased
pub fn draw(op: Opcode, state: &mut State, _rng: &mut dyn RngCore) -> Result<Flow, Chip8Error> {
    // Nothing is drawn unless all n rows are addressable
    let mut sprite = [0u8; 0xF];
    let height = op.n() as usize;
    sprite[..height].copy_from_slice(state.read_slice(state.i, height)?);

    let origin_x = state.v[op.x() as usize] as usize;
    let origin_y = state.v[op.y() as usize] as usize;
    let mut collision = 0x0;

    for (row, byte) in sprite[..height].iter().enumerate() {
        let y = (origin_y + row) % DISPLAY_HEIGHT;
        for bit in 0..8 {
            if (byte >> (7 - bit)) & 0x1 == 0 {
                continue;
            }
            let x = (origin_x + bit) % DISPLAY_WIDTH;
            let pixel = &mut state.frame_buffer[y][x];
            if *pixel != 0 {
                collision = 0x1;
            }
            *pixel = (*pixel != 0) as u8 ^ 0x1;
        }
    }

    state.v[0xF] = collision;
    state.draw_flag = true;
    next(state)
}

/// if Vx.pressed then pc += 2
pub fn skpr(op: Opcode, state: &mut State, _rng: &mut dyn RngCore) -> Result<Flow, Chip8Error> {
    let condition = state.is_pressed(state.v[op.x() as usize]);
    skip_if(state, condition)
}

/// if !Vx.pressed then pc += 2
pub fn skup(op: Opcode, state: &mut State, _rng: &mut dyn RngCore) -> Result<Flow, Chip8Error> {
    let condition = !state.is_pressed(state.v[op.x() as usize]);
    skip_if(state, condition)
}

/// Vx = DT
pub fn moved(op: Opcode, state: &mut State, _rng: &mut dyn RngCore) -> Result<Flow, Chip8Error> {
    state.v[op.x() as usize] = state.delay_timer;
    next(state)
}

/// await keypress for Vx
/// Re-runs on every step until a key is held
pub fn keyd(op: Opcode, state: &mut State, _rng: &mut dyn RngCore) -> Result<Flow, Chip8Error> {
    match state.last_pressed() {
        Some(key) => {
            state.v[op.x() as usize] = key;
            next(state)
        }
        None => Ok(Flow::Wait),
    }
}

/// DT = Vx
pub fn loads(op: Opcode, state: &mut State, _rng: &mut dyn RngCore) -> Result<Flow, Chip8Error> {
    state.delay_timer = state.v[op.x() as usize];
    next(state)
}

/// ST = Vx
pub fn ld(op: Opcode, state: &mut State, _rng: &mut dyn RngCore) -> Result<Flow, Chip8Error> {
    state.sound_timer = state.v[op.x() as usize];
    next(state)
}

/// I += Vx; VF = I > 0xFFF
pub fn addi(op: Opcode, state: &mut State, _rng: &mut dyn RngCore) -> Result<Flow, Chip8Error> {
    let i = state.i.wrapping_add(u16::from(state.v[op.x() as usize]));
    state.v[0xF] = (i > ADDRESS_MASK) as u8;
    state.i = i;
    next(state)
}

/// I = Vx * 5
/// Set I to the memory address of the sprite for Vx
/// See constants::SPRITE_SHEET for more details
pub fn ldspr(op: Opcode, state: &mut State, _rng: &mut dyn RngCore) -> Result<Flow, Chip8Error> {
    state.i = u16::from(state.v[op.x() as usize]) * SPRITE_BYTES;
    next(state)
}

/// mem[I..I+3] = bcd(Vx)
/// Store BCD repr of Vx in memory starting at address i
pub fn bcd(op: Opcode, state: &mut State, _rng: &mut dyn RngCore) -> Result<Flow, Chip8Error> {
    let vx = state.v[op.x() as usize];
    state.write_slice(state.i, &[vx / 100, vx / 10 % 10, vx % 10])?;
    next(state)
}

/// mem[I..=I+x] = V0..=Vx; I += x + 1
pub fn stor(op: Opcode, state: &mut State, _rng: &mut dyn RngCore) -> Result<Flow, Chip8Error> {
    let x = op.x() as usize;
    let v = state.v;
    state.write_slice(state.i, &v[..=x])?;
    state.i = state.i.wrapping_add(x as u16 + 1);
    next(state)
}

/// V0..=Vx = mem[I..=I+x]; I += x + 1
pub fn read(op: Opcode, state: &mut State, _rng: &mut dyn RngCore) -> Result<Flow, Chip8Error> {
    let x = op.x() as usize;
    let mut v = state.v;
    v[..=x].copy_from_slice(state.read_slice(state.i, x + 1)?);
    state.v = v;
    state.i = state.i.wrapping_add(x as u16 + 1);
    next(state)
}

/// Anything that doesn't decode to a known instruction
pub fn unknown(op: Opcode, _state: &mut State, _rng: &mut dyn RngCore) -> Result<Flow, Chip8Error> {
    Err(Chip8Error::UnknownOpcode { opcode: op.0 })
}
