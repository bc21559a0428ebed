//! International Morse Code table for letters and digits

/// Dot/dash code for an uppercase letter or digit
pub fn code_for(c: char) -> Option<&'static str> {
    let code = match c {
        'A' => ".-",
        'B' => "-...",
        'C' => "-.-.",
        'D' => "-..",
        'E' => ".",
        'F' => "..-.",
        'G' => "--.",
        'H' => "....",
        'I' => "..",
        'J' => ".---",
        'K' => "-.-",
        'L' => ".-..",
        'M' => "--",
        'N' => "-.",
        'O' => "---",
        'P' => ".--.",
        'Q' => "--.-",
        'R' => ".-.",
        'S' => "...",
        'T' => "-",
        'U' => "..-",
        'V' => "...-",
        'W' => ".--",
        'X' => "-..-",
        'Y' => "-.--",
        'Z' => "--..",
        '0' => "-----",
        '1' => ".----",
        '2' => "..---",
        '3' => "...--",
        '4' => "....-",
        '5' => ".....",
        '6' => "-....",
        '7' => "--...",
        '8' => "---..",
        '9' => "----.",
        _ => return None,
    };
    Some(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_letter_and_digit_has_a_code() {
        for c in ('A'..='Z').chain('0'..='9') {
            let code = code_for(c).unwrap();
            assert!(!code.is_empty());
            assert!(code.bytes().all(|b| b == b'.' || b == b'-'));
        }
    }

    #[test]
    fn test_lowercase_and_symbols_are_unmapped() {
        assert_eq!(code_for('a'), None);
        assert_eq!(code_for(' '), None);
        assert_eq!(code_for('?'), None);
    }
}
