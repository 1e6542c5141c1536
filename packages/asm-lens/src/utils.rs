use std::path::{Component, Path, PathBuf};

/// Normalise a source path from the debug info so the same file always maps
/// to the same key.
///
/// Existing files are resolved through `dunce` (which also drops the `\\?\`
/// prefix on Windows). Files that are not present on this machine are
/// normalised lexically so `.` and `..` components still collapse.
pub fn canonicalize_path(source_path: &str) -> String {
    let path = Path::new(source_path);
    let canonical = dunce::canonicalize(path).unwrap_or_else(|_| lexical_normalize(path));

    // Forward slashes everywhere, the report is shared across platforms
    canonical.to_string_lossy().replace('\\', "/")
}

fn lexical_normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Parse hex address from string (supports "0x1234" or "1234" format)
pub fn parse_hex_address(input: &str) -> Option<u64> {
    let trimmed = input.trim();
    let hex_str = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    u64::from_str_radix(hex_str, 16).ok()
}

/// Lowercase hex, one pair per byte, space separated ("55 48 89 e5").
pub fn hex_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 3);
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(&format!("{:02x}", b));
    }
    out
}

/// Serde adapter: 64-bit addresses travel as "0x..." strings so JavaScript
/// consumers don't lose precision.
pub mod hex_address {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{:x}", value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::parse_hex_address(&s)
            .ok_or_else(|| de::Error::custom(format!("invalid hex address: {}", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_with_and_without_prefix() {
        assert_eq!(parse_hex_address("0x1000"), Some(0x1000));
        assert_eq!(parse_hex_address(" 1a2B "), Some(0x1a2b));
        assert_eq!(parse_hex_address("0xzz"), None);
    }

    #[test]
    fn formats_bytes() {
        assert_eq!(hex_bytes(&[0x55, 0x48, 0x89, 0xe5]), "55 48 89 e5");
        assert_eq!(hex_bytes(&[]), "");
    }

    #[test]
    fn missing_files_collapse_lexically() {
        let p = canonicalize_path("/no/such/dir/./sub/../main.c");
        assert_eq!(p, "/no/such/dir/main.c");
    }

    #[test]
    fn existing_files_resolve() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.c");
        std::fs::write(&file, "int a;\n").unwrap();
        let dotted = format!("{}/./a.c", dir.path().display());
        assert_eq!(
            canonicalize_path(&dotted),
            canonicalize_path(&file.to_string_lossy())
        );
    }
}
