use crate::types::RuntimeTag;

/// Interpreter family whose functions get a dependency layer.
pub const PYTHON_FAMILY: &str = "Python";

/// Normalize a raw runtime identifier (`python3.9`) into a [`RuntimeTag`] (`Python39`).
///
/// The first character is uppercased, the remainder lowercased, and every
/// character that is not ASCII alphanumeric is dropped so the tag can be
/// embedded in logical ids. Classifying an existing tag returns it unchanged.
pub fn classify_runtime(raw: &str) -> RuntimeTag {
    let mut chars = raw.trim().chars().filter(char::is_ascii_alphanumeric);
    let mut tag = String::with_capacity(raw.len());
    if let Some(first) = chars.next() {
        tag.push(first.to_ascii_uppercase());
    }
    tag.extend(chars.map(|c| c.to_ascii_lowercase()));
    RuntimeTag::new(tag)
}
