//! Version string carried in hello packets

/// Size of the fixed, NUL-padded version field in a hello packet.
pub const VERSION_STRING_SIZE: usize = 64;

/// Version string this implementation announces in its hello.
pub const BRIDGE_VERSION: &str = concat!("usb-bridge ", env!("CARGO_PKG_VERSION"));

/// Render a version string into the fixed hello field.
///
/// Longer strings are truncated at a character boundary so the field stays
/// valid UTF-8 when read back.
pub fn encode_version(version: &str) -> [u8; VERSION_STRING_SIZE] {
    let mut field = [0u8; VERSION_STRING_SIZE];
    let mut end = version.len().min(VERSION_STRING_SIZE);
    while !version.is_char_boundary(end) {
        end -= 1;
    }
    field[..end].copy_from_slice(&version.as_bytes()[..end]);
    field
}

/// Read a version string back out of the fixed hello field.
///
/// The field is untrusted peer data: it is cut at the first NUL and any
/// invalid UTF-8 is replaced rather than rejected, since the version string
/// is informational only.
pub fn decode_version(field: &[u8]) -> String {
    let end = field.iter().position(|b| *b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).into_owned()
}
