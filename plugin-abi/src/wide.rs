use crate::errors::AbiError;

/// Upper bound on string length read from a plugin, in UTF-16 code units
pub const MAX_WIDE_LEN: usize = 1 << 20;

/// Encode `value` as NUL-terminated UTF-16
pub fn encode_wide(value: &str) -> Vec<u16> {
    value.encode_utf16().chain(std::iter::once(0)).collect()
}

/// Copy a NUL-terminated UTF-16 string out of plugin memory
///
/// A null pointer reads as the empty string.
///
/// # Safety
///
/// `ptr` must be null or point to readable memory that holds a NUL code unit
/// within [`MAX_WIDE_LEN`] units or extends at least that far.
pub unsafe fn read_wide(ptr: *const u16) -> Result<String, AbiError> {
    if ptr.is_null() {
        return Ok(String::new());
    }

    let mut len = 0usize;
    while *ptr.add(len) != 0 {
        len += 1;
        if len >= MAX_WIDE_LEN {
            return Err(AbiError::UnterminatedString(MAX_WIDE_LEN));
        }
    }

    let units = std::slice::from_raw_parts(ptr, len);
    String::from_utf16(units).map_err(|_| AbiError::InvalidUtf16)
}
