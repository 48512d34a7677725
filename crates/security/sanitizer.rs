/// Strips markup tags from merchant-supplied text and trims surrounding whitespace.
pub fn clean_input(raw: &str) -> String {
    let mut cleaned = String::with_capacity(raw.len());
    let mut inside_tag = false;

    for ch in raw.chars() {
        match ch {
            '<' => inside_tag = true,
            '>' if inside_tag => inside_tag = false,
            _ if !inside_tag => cleaned.push(ch),
            _ => {}
        }
    }

    cleaned.trim().to_string()
}
