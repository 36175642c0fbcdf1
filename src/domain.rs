use anyhow::{Result, anyhow};

/// IDNA ASCII form of `input`, lowercased, without surrounding whitespace or
/// a trailing dot.
pub fn normalize_domain(input: &str) -> Result<String> {
    let trimmed = input.trim().trim_end_matches('.');
    if trimmed.is_empty() {
        return Err(anyhow!("domain name is required"));
    }
    let ascii = idna::domain_to_ascii(trimmed)
        .map_err(|err| anyhow!("invalid domain name: {err}"))?;
    Ok(ascii.to_lowercase())
}

/// Case-insensitive domain comparison. Names that fail IDNA conversion are
/// compared as plain trimmed strings.
pub fn same_domain(left: &str, right: &str) -> bool {
    match (normalize_domain(left), normalize_domain(right)) {
        (Ok(left), Ok(right)) => left == right,
        _ => left
            .trim()
            .trim_end_matches('.')
            .eq_ignore_ascii_case(right.trim().trim_end_matches('.')),
    }
}
