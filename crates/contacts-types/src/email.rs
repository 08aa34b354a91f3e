/// Basic syntactic check for an email address.
///
/// Accepts `local@domain` with both parts non-empty, a single `@`, and no
/// whitespace or angle brackets. No case folding or other normalization is
/// applied; the address is used as an opaque key.
pub fn is_valid_email(email: &str) -> bool {
    if email.is_empty() || email.chars().any(|c| c.is_whitespace() || c == '<' || c == '>') {
        return false;
    }

    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    }
}
