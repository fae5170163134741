// Instruction Formats
//
//          +--------+---+---+---+---+---+---+----------------+
// Format 1 | op:8   |
//          +--------+----+----+
// Format 2 | op:8   |r1:4|r2:4|
//          +--------+---+---+---+---+---+---+----------------+
// Format 3 | op:6   | n | i | x | b | p | e | disp:12        |
//          +--------+---+---+---+---+---+---+----------------+
// Format 4 | op:6   | n | i | x | b | p | e | addr:20        |
//          +--------+---+---+---+---+---+---+----------------+
//
// The n and i flags occupy the low two bits of the opcode byte, so every
// opcode byte value is a multiple of four.

pub const BYTE_WIDTH        : u32 = 8;

pub const WORD_BYTES        : u32 = 3;
pub const WORD_WIDTH        : u32 = WORD_BYTES * BYTE_WIDTH;
pub const WORD_MASK         : u32 = 0x00FF_FFFF;

pub const DISP_WIDTH        : u32 = 12;
pub const ADDR_WIDTH        : u32 = 20;

pub const F2_R1_OFFSET      : u32 = 4;
pub const F2_R1_MASK        : u16 = 0x00F0;
pub const F2_R2_MASK        : u16 = 0x000F;

pub const F3_OPCODE_MASK    : u32 = 0xFC_0000;
pub const F3_FLAG_N         : u32 = 0x02_0000;
pub const F3_FLAG_I         : u32 = 0x01_0000;
pub const F3_FLAG_X         : u32 = 0x00_8000;
pub const F3_FLAG_B         : u32 = 0x00_4000;
pub const F3_FLAG_P         : u32 = 0x00_2000;
pub const F3_FLAG_E         : u32 = 0x00_1000;
pub const F3_DISP_MASK      : u32 = 0x00_0FFF;

pub const F4_OPCODE_MASK    : u32 = 0xFC00_0000;
pub const F4_FLAG_N         : u32 = 0x0200_0000;
pub const F4_FLAG_I         : u32 = 0x0100_0000;
pub const F4_FLAG_X         : u32 = 0x0080_0000;
pub const F4_FLAG_B         : u32 = 0x0040_0000;
pub const F4_FLAG_P         : u32 = 0x0020_0000;
pub const F4_FLAG_E         : u32 = 0x0010_0000;
pub const F4_ADDR_MASK      : u32 = 0x000F_FFFF;

/// Signed range of the format 3 displacement under PC-relative addressing.
pub const PC_DISP_MIN       : i32 = -2048;
pub const PC_DISP_MAX       : i32 = 2047;

/// Unsigned range of the format 3 displacement under base-relative addressing.
pub const BASE_DISP_MAX     : i32 = 4095;
