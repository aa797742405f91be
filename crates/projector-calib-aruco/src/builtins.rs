//! Embedded built-in dictionaries.
//!
//! Code tables are the AprilTag 16h5 and 25h9 families. Each code lists its
//! bits most significant first; bit `i` sits at module `(BIT_X[i], BIT_Y[i])`
//! of the border-inclusive grid and is set for a white module.

#![allow(clippy::unreadable_literal)]

use crate::Dictionary;

const TAG16H5_BIT_X: [u8; 16] = [1, 2, 3, 2, 4, 4, 4, 3, 4, 3, 2, 3, 1, 1, 1, 2];
const TAG16H5_BIT_Y: [u8; 16] = [1, 1, 1, 2, 1, 2, 3, 2, 4, 4, 4, 3, 4, 3, 2, 3];

const TAG16H5_CODES: [u64; 30] = [
    0x27c8, 0x31b6, 0x3859, 0x569c, 0x6c76, 0x7ddb, 0xaf09, 0xf5a1, 0xfb8b, 0x1cb9, 0x28ca,
    0xe8dc, 0x1426, 0x5770, 0x9253, 0xb702, 0x063a, 0x8f34, 0xb4c0, 0x51ec, 0xe6f0, 0x5fa4,
    0xdd43, 0x1aaa, 0xe62f, 0x6dbc, 0xb6eb, 0xde10, 0x154d, 0xb57a,
];

const TAG25H9_BIT_X: [u8; 25] = [
    1, 2, 3, 4, 2, 3, 5, 5, 5, 5, 4, 4, 5, 4, 3, 2, 4, 3, 1, 1, 1, 1, 2, 2, 3,
];
const TAG25H9_BIT_Y: [u8; 25] = [
    1, 1, 1, 1, 2, 2, 1, 2, 3, 4, 2, 3, 5, 5, 5, 5, 4, 4, 5, 4, 3, 2, 4, 3, 3,
];

const TAG25H9_CODES: [u64; 35] = [
    0x156f1f4, 0x1f28cd5, 0x16ce32c, 0x1ea379c, 0x1390f89, 0x034fad0, 0x07dcdb5, 0x119ba95,
    0x1ae9daa, 0x0df02aa, 0x082fc15, 0x0465123, 0x0ceee98, 0x1f17260, 0x14429cd, 0x17248a8,
    0x16ad452, 0x09670ad, 0x16f65b2, 0x0b8322b, 0x05d715b, 0x1a1c7e7, 0x0d7890d, 0x1813522,
    0x1c9c611, 0x099e4a4, 0x0855234, 0x17b81c0, 0x0c294bb, 0x089fae3, 0x044df5f, 0x1360159,
    0x0ec31e8, 0x1bcc0f6, 0x0a64f8d,
];

pub const DICT_APRILTAG_16H5: Dictionary = Dictionary {
    name: "DICT_APRILTAG_16h5",
    marker_size: 4,
    max_correction_bits: 2,
    codes: &TAG16H5_CODES,
    bit_x: &TAG16H5_BIT_X,
    bit_y: &TAG16H5_BIT_Y,
};

pub const DICT_APRILTAG_25H9: Dictionary = Dictionary {
    name: "DICT_APRILTAG_25h9",
    marker_size: 5,
    max_correction_bits: 4,
    codes: &TAG25H9_CODES,
    bit_x: &TAG25H9_BIT_X,
    bit_y: &TAG25H9_BIT_Y,
};

/// Look up a built-in dictionary by its exact name.
pub fn builtin_dictionary(name: &str) -> Option<Dictionary> {
    match name {
        "DICT_APRILTAG_16h5" => Some(DICT_APRILTAG_16H5),
        "DICT_APRILTAG_25h9" => Some(DICT_APRILTAG_25H9),
        _ => None,
    }
}
