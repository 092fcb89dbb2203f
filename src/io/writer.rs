//! Re-encoding migrated text back to disk.

use std::path::Path;

use crate::core::{Error, Result};
use crate::io::reader::Encoding;

/// Write `text` to `dest`, restoring the encoding, BOM and line endings
/// detected on read and copying the source file's permission bits.
pub fn write_source(
    source: &Path,
    dest: &Path,
    text: &str,
    encoding: Encoding,
    crlf: bool,
) -> Result<()> {
    let body = if crlf {
        text.replace('\n', "\r\n")
    } else {
        text.to_owned()
    };

    let mut bytes = Vec::with_capacity(body.len() + 3);
    match encoding {
        Encoding::Utf8 => bytes.extend_from_slice(body.as_bytes()),
        Encoding::Utf8Sig => {
            bytes.extend_from_slice(&[0xef, 0xbb, 0xbf]);
            bytes.extend_from_slice(body.as_bytes());
        }
        Encoding::Latin1 => {
            for ch in body.chars() {
                let code = ch as u32;
                if code > 0xff {
                    return Err(Error::decode(
                        dest,
                        format!("character {ch:?} not representable in latin-1"),
                    ));
                }
                bytes.push(code as u8);
            }
        }
    }

    std::fs::write(dest, &bytes).map_err(|e| Error::io(dest, e))?;
    copy_permissions(source, dest)?;
    Ok(())
}

#[cfg(unix)]
fn copy_permissions(source: &Path, dest: &Path) -> Result<()> {
    let meta = std::fs::metadata(source).map_err(|e| Error::io(source, e))?;
    std::fs::set_permissions(dest, meta.permissions()).map_err(|e| Error::io(dest, e))?;
    Ok(())
}

#[cfg(not(unix))]
fn copy_permissions(_source: &Path, _dest: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::reader::read_source;

    #[test]
    fn latin1_roundtrip_preserves_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latin.py");
        let mut bytes = b"# -*- coding: latin-1 -*-\ns = '".to_vec();
        bytes.push(0xe9);
        bytes.extend_from_slice(b"'\n");
        std::fs::write(&path, &bytes).unwrap();

        let src = read_source(&path).unwrap();
        let dest = dir.path().join("out.py");
        write_source(&path, &dest, &src.text(), src.encoding, src.crlf).unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), bytes);
    }

    #[test]
    fn bom_and_crlf_restored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bom.py");
        let mut bytes = vec![0xef, 0xbb, 0xbf];
        bytes.extend_from_slice(b"x = 1\r\n");
        std::fs::write(&path, &bytes).unwrap();

        let src = read_source(&path).unwrap();
        let dest = dir.path().join("out.py");
        write_source(&path, &dest, &src.text(), src.encoding, src.crlf).unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), bytes);
    }

    #[cfg(unix)]
    #[test]
    fn executable_bit_carries_over() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tool.py");
        std::fs::write(&path, "#!/usr/bin/env python\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();

        let dest = dir.path().join("tool_out.py");
        write_source(&path, &dest, "#!/usr/bin/env python\n", Encoding::Utf8, false).unwrap();
        let mode = std::fs::metadata(&dest).unwrap().permissions().mode();
        assert_eq!(mode & 0o111, 0o111);
    }
}
