use uuid::Uuid;

pub const INVITE_CODE_LEN: usize = 8;

/// Short opaque invite code, uppercase alphanumeric.
pub fn generate_invite_code() -> String {
    let mut code = Uuid::new_v4().simple().to_string();
    code.truncate(INVITE_CODE_LEN);
    code.to_uppercase()
}

/// Accepts codes as typed by a person: surrounding whitespace is ignored.
pub fn normalize_invite_code(raw: &str) -> Option<&str> {
    let code = raw.trim();
    if code.is_empty() {
        None
    } else {
        Some(code)
    }
}
