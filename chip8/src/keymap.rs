use sdl2::keyboard::Scancode;

/// # Keymap
/// Chip-8 input is generated with a hexadecimal keypad.
///
/// The COSMAC VIP hex keypad is mapped to the left 4 alphanumeric columns by physical position,
/// so it works the same on any keyboard layout.
/// ```text
/// |1|2|3|C|      |1|2|3|4|
/// |4|5|6|D|  ->  |Q|W|E|R|
/// |7|8|9|E|  ->  |A|S|D|F|
/// |A|0|B|F|      |Z|X|C|V|
/// ```
pub fn keymap(scancode: Scancode) -> Option<u8> {
    const LAYOUT: [Scancode; 16] = [
        Scancode::X,
        Scancode::Num1,
        Scancode::Num2,
        Scancode::Num3,
        Scancode::Q,
        Scancode::W,
        Scancode::E,
        Scancode::A,
        Scancode::S,
        Scancode::D,
        Scancode::Z,
        Scancode::C,
        Scancode::Num4,
        Scancode::R,
        Scancode::F,
        Scancode::V,
    ];
    LAYOUT
        .iter()
        .position(|&key| key == scancode)
        .map(|key| key as u8)
}
