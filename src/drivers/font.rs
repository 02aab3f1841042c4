//! Font for 7-segment displays.
//!
//! A glyph has one bit per segment, `0bPGFEDCBA`:
//!
//! ```text
//!    AAA
//!   F   B
//!   F   B
//!    GGG
//!   E   C
//!   E   C
//!    DDD   P
//! ```
//!
//! Only printable ASCII has a glyph. Some characters are stand-ins: `#` is the degree sign,
//! and `>` `<` are the left and right halves of an `x` spread over two digits (as in `lu><`).

/// The decimal point segment.
pub const SEG_DP: u8 = 0x80;

const FIRST: u8 = b' ';

#[rustfmt::skip]
static GLYPHS: [u8; 96] = [
    //  ' '   !     "     #     $     %     &     '
    0x00, 0x86, 0x22, 0x63, 0x6D, 0x52, 0x7D, 0x02,
    //  (     )     *     +     ,     -     .     /
    0x39, 0x0F, 0x49, 0x46, 0x80, 0x40, 0x80, 0x52,
    //  0     1     2     3     4     5     6     7
    0x3F, 0x06, 0x5B, 0x4F, 0x66, 0x6D, 0x7D, 0x07,
    //  8     9     :     ;     <     =     >     ?
    0x7F, 0x6F, 0x09, 0x0D, 0x70, 0x48, 0x46, 0x53,
    //  @     A     B     C     D     E     F     G
    0x7B, 0x77, 0x7C, 0x39, 0x5E, 0x79, 0x71, 0x3D,
    //  H     I     J     K     L     M     N     O
    0x76, 0x06, 0x1E, 0x75, 0x38, 0x37, 0x54, 0x3F,
    //  P     Q     R     S     T     U     V     W
    0x73, 0x67, 0x50, 0x6D, 0x78, 0x3E, 0x3E, 0x2A,
    //  X     Y     Z     [     \     ]     ^     _
    0x76, 0x6E, 0x5B, 0x39, 0x64, 0x0F, 0x23, 0x08,
    //  `     a     b     c     d     e     f     g
    0x20, 0x5F, 0x7C, 0x58, 0x5E, 0x7B, 0x71, 0x6F,
    //  h     i     j     k     l     m     n     o
    0x74, 0x04, 0x0E, 0x75, 0x30, 0x55, 0x54, 0x5C,
    //  p     q     r     s     t     u     v     w
    0x73, 0x67, 0x50, 0x6D, 0x78, 0x1C, 0x1C, 0x2A,
    //  x     y     z     {     |     }     ~    DEL
    0x76, 0x6E, 0x5B, 0x39, 0x30, 0x0F, 0x01, 0x00,
];

/// Segments for character `ch`; blank for anything outside printable ASCII.
pub fn glyph(ch: u8) -> u8 {
    ch.checked_sub(FIRST)
        .and_then(|i| GLYPHS.get(usize::from(i)))
        .copied()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digits() {
        let digits: Vec<u8> = (b'0'..=b'9').map(glyph).collect();
        assert_eq!(
            digits,
            [0x3F, 0x06, 0x5B, 0x4F, 0x66, 0x6D, 0x7D, 0x07, 0x7F, 0x6F]
        );
    }

    #[test]
    fn test_specials() {
        assert_eq!(glyph(b' '), 0);
        assert_eq!(glyph(b'.'), SEG_DP);
        assert_eq!(glyph(b'#'), 0x63);
        assert_eq!(glyph(b'-'), 0x40);
        assert_eq!(glyph(b'\n'), 0);
        assert_eq!(glyph(0xB0), 0);
    }
}
