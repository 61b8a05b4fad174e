/// Longest word, in bytes of the dictionary encoding, that is handed to a
/// spell engine. Mirrors Hunspell's `MAXWORDUTF8LEN`.
pub const MAX_WORD_LEN: usize = 256;

/// Upper bound on the length of the count line at the top of a `.dic` file.
pub const MAX_HEADER_LEN: usize = 100;

/// Default cap on the number of sort batches open at once during a merge.
pub const DEFAULT_MAX_TEMP_FILES: usize = 1024;

/// Default memory budget for the split phase of the external sort.
pub const DEFAULT_MAX_MEMORY: usize = 64 * 1024 * 1024;

/// Rough heap cost of one buffered line on top of its bytes.
pub const LINE_OVERHEAD: usize = 48;

/// Byte order mark that may precede the count line.
pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    #[test]
    fn test_LINE_OVERHEAD() {
        use std::mem;

        assert!(LINE_OVERHEAD >= mem::size_of::<String>());
    }

    #[test]
    fn test_MAX_HEADER_LEN() {
        let widest = u64::MAX.to_string();
        assert!(widest.len() + UTF8_BOM.len() + 2 < MAX_HEADER_LEN);
    }
}
