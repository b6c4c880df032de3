//! Machine hostname lookup

use std::ffi::CStr;

/// Hostname of this machine, as reported by `gethostname(2)`.
///
/// Returns `None` when the call fails or the name is not valid UTF-8.
pub fn hostname() -> Option<String> {
    let mut buf = [0u8; 256];
    // SAFETY: buf is writable for its full length and gethostname
    // NUL-terminates on success when the name fits.
    let rc = unsafe { libc::gethostname(buf.as_mut_ptr().cast(), buf.len()) };
    if rc != 0 {
        return None;
    }
    buf[buf.len() - 1] = 0;
    let name = CStr::from_bytes_until_nul(&buf).ok()?;
    name.to_str().ok().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hostname_is_not_empty() {
        let name = hostname().expect("gethostname should succeed");
        assert!(!name.is_empty());
    }
}
