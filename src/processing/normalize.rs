// Canonical form for recognized text: uppercase ASCII letters and digits,
// a handful of document punctuation, single spaces.

/// Replace accented capitals and typographic punctuation OCR tends to emit.
fn substitute(c: char) -> Option<char> {
    let replacement = match c {
        'Á' | 'À' | 'Â' | 'Ä' => 'A',
        'É' | 'È' | 'Ê' | 'Ë' => 'E',
        'Í' | 'Ì' | 'Î' | 'Ï' => 'I',
        'Ó' | 'Ò' | 'Ô' | 'Ö' => 'O',
        'Ú' | 'Ù' | 'Û' | 'Ü' => 'U',
        'Ñ' => 'N',
        'Ç' => 'C',
        '|' => 'I',
        '“' | '”' | '‘' | '’' => ' ',
        '—' | '–' => '-',
        _ => return None,
    };
    Some(replacement)
}

fn is_allowed(c: char) -> bool {
    c.is_ascii_uppercase() || c.is_ascii_digit() || matches!(c, ' ' | '-' | '/' | ':' | '.' | ',')
}

pub fn normalize(text: &str) -> String {
    let mapped: String = text
        .to_uppercase()
        .chars()
        .map(|c| {
            let c = substitute(c).unwrap_or(c);
            if is_allowed(c) {
                c
            } else {
                ' '
            }
        })
        .collect();

    mapped.split_whitespace().collect::<Vec<&str>>().join(" ")
}
