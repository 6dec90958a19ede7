use std::path::Path;

use crate::archive::{Archive, Entry};

pub(crate) enum Scheme<'a> {
    // data: URI, never decoded
    Data,
    // Relative path, percent-decoded
    Relative(String),
    // Anything else with a scheme, http: or file: included
    Other(&'a str),
}

// RFC 3986: ALPHA *( ALPHA / DIGIT / "+" / "-" / "." ) ":"
fn scheme_name(uri: &str) -> Option<&str> {
    let (name, _) = uri.split_once(':')?;
    let mut chars = name.chars();
    let first = chars.next()?;
    if !first.is_ascii_alphabetic() {
        return None;
    }
    chars
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        .then_some(name)
}

fn hex_value(digit: u8) -> Option<u8> {
    match digit {
        b'0'..=b'9' => Some(digit - b'0'),
        b'a'..=b'f' => Some(digit - b'a' + 10),
        b'A'..=b'F' => Some(digit - b'A' + 10),
        _ => None,
    }
}

// Bad escapes are kept as written.
fn percent_decode(uri: &str) -> String {
    let bytes = uri.as_bytes();
    let mut result = Vec::with_capacity(bytes.len());
    let mut position = 0;
    while position < bytes.len() {
        if bytes[position] == b'%' && position + 2 < bytes.len() {
            if let (Some(high), Some(low)) = (
                hex_value(bytes[position + 1]),
                hex_value(bytes[position + 2]),
            ) {
                result.push(high << 4 | low);
                position += 3;
                continue;
            }
        }
        result.push(bytes[position]);
        position += 1;
    }
    String::from_utf8_lossy(&result).into_owned()
}

impl<'a> From<&'a str> for Scheme<'a> {
    fn from(uri: &'a str) -> Self {
        match scheme_name(uri) {
            Some(name) if name.eq_ignore_ascii_case("data") => Scheme::Data,
            Some(_) => Scheme::Other(uri),
            None => Scheme::Relative(percent_decode(uri)),
        }
    }
}

impl Scheme<'_> {
    /// Read a relative resource next to the model file. `Ok(None)` when the
    /// archive has no such entry or the URI is not a relative path.
    pub(crate) fn load<A: Archive, P: AsRef<Path>>(
        &self,
        archive: &mut A,
        base: P,
    ) -> Result<Option<Vec<u8>>, A::Error> {
        let Scheme::Relative(path) = self else {
            return Ok(None);
        };
        let path = base.as_ref().join(path);
        let Some(mut entry) = archive.by_path(path)? else {
            return Ok(None);
        };
        entry.unpack().map(Some)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::archive::MemoryArchive;

    #[test]
    fn test_classify() {
        assert!(matches!(
            Scheme::from("data:application/octet-stream;base64,AAAA"),
            Scheme::Data
        ));
        assert!(matches!(Scheme::from("DATA:,x"), Scheme::Data));
        assert!(matches!(
            Scheme::from("https://example.com/a.bin"),
            Scheme::Other(_)
        ));
        assert!(matches!(Scheme::from("file:///tmp/a.bin"), Scheme::Other(_)));
        match Scheme::from("buffers/my%20mesh.bin") {
            Scheme::Relative(path) => assert_eq!(path, "buffers/my mesh.bin"),
            _ => panic!("expected a relative path"),
        }
        // A colon after a path separator does not start a scheme.
        assert!(matches!(Scheme::from("./a:b.bin"), Scheme::Relative(_)));
    }

    #[test]
    fn test_percent_decode() {
        assert_eq!(percent_decode("a%2Fb"), "a/b");
        assert_eq!(percent_decode("100%"), "100%");
        assert_eq!(percent_decode("%zz%4"), "%zz%4");
    }

    #[test]
    fn test_load_relative() {
        let mut archive = MemoryArchive::new().with("models/mesh.bin", vec![1, 2, 3]);
        let data = Scheme::from("mesh.bin").load(&mut archive, "models").unwrap();
        assert_eq!(data, Some(vec![1, 2, 3]));
        let missing = Scheme::from("other.bin").load(&mut archive, "models").unwrap();
        assert_eq!(missing, None);
    }
}
