//! Folds Windows-1252 text down to what the HD44780 character ROM can show.

/// Stand-in for high bytes with no ASCII counterpart.
pub const UNMAPPED: u8 = b'?';

/// Map one Windows-1252 byte to its unaccented ASCII approximation.
///
/// ASCII passes through untouched. Accented Latin letters lose their
/// diacritic. The few symbols with an obvious ASCII look-alike get it and
/// every other high byte becomes [`UNMAPPED`], so the result is always 7-bit.
pub fn fold_byte(byte: u8) -> u8 {
    match byte {
        0x00..=0x7F => byte,
        0x8A => b'S',
        0x8E => b'Z',
        0x9A => b's',
        0x9E => b'z',
        0x9F => b'Y',
        0xC0..=0xC6 => b'A',
        0xC7 => b'C',
        0xC8..=0xCB => b'E',
        0xCC..=0xCF => b'I',
        0xD0 => b'D',
        0xD1 => b'N',
        0xD2..=0xD6 | 0xD8 => b'O',
        0xD9..=0xDC => b'U',
        0xDD => b'Y',
        0xDE => b'P',
        0xDF => b'B',
        0xE0..=0xE6 => b'a',
        0xE7 => b'c',
        0xE8..=0xEB => b'e',
        0xEC..=0xEF => b'i',
        0xF0 => b'd',
        0xF1 => b'n',
        0xF2..=0xF6 | 0xF8 => b'o',
        0xF9..=0xFC => b'u',
        0xFD | 0xFF => b'y',
        0xFE => b'p',
        0x82 | 0x91 | 0x92 | 0xB4 => b'\'',
        0x84 | 0x93 | 0x94 => b'"',
        0x96 | 0x97 | 0xAD => b'-',
        0xA0 => b' ',
        0xD7 => b'x',
        0xF7 => b'/',
        _ => UNMAPPED,
    }
}

/// Fold a whole body in place.
pub fn fold_in_place(bytes: &mut [u8]) {
    for byte in bytes.iter_mut() {
        *byte = fold_byte(*byte);
    }
}

/// Fold a body into an ASCII `String`, one char per input byte.
pub fn fold_to_string(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| fold_byte(b) as char).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_passes_through() {
        for b in 0u8..=0x7F {
            assert_eq!(fold_byte(b), b);
        }
    }

    #[test]
    fn portuguese_accents_are_stripped() {
        // "Ação Índio Pêssego" in Windows-1252
        let raw = b"A\xe7\xe3o \xcdndio P\xeass\xeago";
        assert_eq!(fold_to_string(raw), "Acao Indio Pessego");
    }

    #[test]
    fn uppercase_and_lowercase_vowels_fold() {
        assert_eq!(fold_to_string(b"\xc1\xc9\xcd\xd3\xda"), "AEIOU");
        assert_eq!(fold_to_string(b"\xe1\xe9\xed\xf3\xfa"), "aeiou");
        assert_eq!(fold_to_string(b"\xdc\xfc\xd1\xf1\xff"), "UuNny");
    }

    #[test]
    fn symbols_fold_to_look_alikes() {
        // multiplication sign, division sign, curly quotes, en dash
        assert_eq!(fold_to_string(b"\xd7\xf7\x93\x94\x96"), "x/\"\"-");
    }

    #[test]
    fn unmapped_high_bytes_become_placeholder() {
        // degree sign, euro sign, section sign
        assert_eq!(fold_to_string(b"20\xb0C \x80 \xa7"), "20?C ? ?");
    }

    #[test]
    fn every_byte_folds_to_seven_bits() {
        for b in 0u8..=0xFF {
            assert!(fold_byte(b).is_ascii(), "byte {b:#04x}");
        }
    }

    #[test]
    fn fold_in_place_rewrites_buffer() {
        let mut buf = *b"caf\xe9";
        fold_in_place(&mut buf);
        assert_eq!(&buf, b"cafe");
    }
}
