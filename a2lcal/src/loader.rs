use crate::A2lError;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// read the file at `path` and decode its content to a String
pub(crate) fn load(path: &Path) -> Result<String, A2lError> {
    let mut file = File::open(path).map_err(|ioerror| A2lError::FileOpenError {
        filename: path.to_path_buf(),
        ioerror,
    })?;

    let filedata = read_data(&mut file, path)?;
    let text = decode_raw_bytes(&filedata);

    // a byte order mark is not part of the a2l data
    Ok(match text.strip_prefix('\u{feff}') {
        Some(stripped) => stripped.to_string(),
        None => text,
    })
}

fn read_data(file: &mut File, path: &Path) -> Result<Vec<u8>, A2lError> {
    let read_error = |ioerror| A2lError::FileReadError {
        filename: path.to_path_buf(),
        ioerror,
    };
    let filesize = file.metadata().map_err(read_error)?.len();
    let mut buffer = Vec::with_capacity(usize::try_from(filesize).unwrap_or(usize::MAX));
    file.read_to_end(&mut buffer).map_err(read_error)?;
    Ok(buffer)
}

// An a2l file must start with either a BOM or a character from the basic ASCII set.
// UTF-16 and UTF-32 data can therefore be recognized by the nul bytes in the first character.
fn decode_raw_bytes(filedata: &[u8]) -> String {
    if let Some(text) = decode_utf32(filedata) {
        return text;
    }
    if let Some(text) = decode_utf16(filedata) {
        return text;
    }
    if let Ok(text) = std::str::from_utf8(filedata) {
        return text.to_string();
    }
    // ISO8859-1: every byte sequence is a valid latin-1 string
    filedata.iter().map(|ch| char::from(*ch)).collect()
}

// big endian: 00 00 FE FF (BOM) or 00 00 00 xx; little endian: FF FE 00 00 (BOM) or xx 00 00 00
fn decode_utf32(filedata: &[u8]) -> Option<String> {
    if filedata.len() < 4 || filedata.len() % 4 != 0 {
        return None;
    }
    let conversion: fn([u8; 4]) -> u32 = if filedata[0] == 0 && filedata[1] == 0 && filedata[3] != 0
    {
        u32::from_be_bytes
    } else if filedata[0] != 0 && filedata[2] == 0 && filedata[3] == 0 {
        u32::from_le_bytes
    } else {
        return None;
    };
    filedata
        .chunks_exact(4)
        .map(|chunk| {
            let charbytes: [u8; 4] = chunk.try_into().ok()?;
            char::from_u32(conversion(charbytes))
        })
        .collect()
}

// big endian: FE FF (BOM) or 00 xx; little endian: FF FE (BOM) or xx 00
fn decode_utf16(filedata: &[u8]) -> Option<String> {
    if filedata.len() < 2 || filedata.len() % 2 != 0 {
        return None;
    }
    let conversion: fn([u8; 2]) -> u16 = if (filedata[0] == 0 && filedata[1] != 0)
        || (filedata[0] == 0xfe && filedata[1] == 0xff)
    {
        u16::from_be_bytes
    } else if (filedata[0] != 0 && filedata[1] == 0)
        || (filedata[0] == 0xff && filedata[1] == 0xfe)
    {
        u16::from_le_bytes
    } else {
        return None;
    };
    let units: Vec<u16> = filedata
        .chunks_exact(2)
        .map(|chunk| conversion([chunk[0], chunk[1]]))
        .collect();
    String::from_utf16(&units).ok()
}

/*************************************************************************************************/

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn load_nonexistent_file() {
        let result = load(Path::new("file/does/not/exist"));
        assert!(matches!(result, Err(A2lError::FileOpenError { .. })));
    }

    #[test]
    fn load_with_bom() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bom.a2l");
        std::fs::write(&path, b"\xef\xbb\xbfASAP2_VERSION 1 71").unwrap();
        let text = load(&path).unwrap();
        assert_eq!(text, "ASAP2_VERSION 1 71");
    }

    #[test]
    fn decode_raw_bytes_u32() {
        // big endian
        let data: Vec<u8> = vec![0, 0, 0, 65, 0, 0, 0, 66];
        assert_eq!(decode_raw_bytes(&data), String::from("AB"));
        // big endian, with BOM
        let data: Vec<u8> = vec![0, 0, 0xfe, 0xff, 0, 0, 0, 65, 0, 0, 0, 66];
        assert_eq!(decode_raw_bytes(&data), String::from("\u{feff}AB"));
        // little endian
        let data: Vec<u8> = vec![65, 0, 0, 0, 66, 0, 0, 0];
        assert_eq!(decode_raw_bytes(&data), String::from("AB"));
        // little endian, with BOM
        let data: Vec<u8> = vec![0xff, 0xfe, 0, 0, 65, 0, 0, 0, 66, 0, 0, 0];
        assert_eq!(decode_raw_bytes(&data), String::from("\u{feff}AB"));
        // mixed endian (error)
        let data: Vec<u8> = vec![0, 0, 0, 65, 66, 0, 0, 0];
        assert_ne!(decode_raw_bytes(&data), String::from("AB"));
    }

    #[test]
    fn decode_raw_bytes_u16() {
        // little endian
        let data: Vec<u8> = vec![65, 0, 66, 0, 65, 0, 66, 0];
        assert_eq!(decode_raw_bytes(&data), String::from("ABAB"));
        // little endian, with BOM
        let data: Vec<u8> = vec![0xff, 0xfe, 65, 0, 66, 0, 65, 0, 66, 0];
        assert_eq!(decode_raw_bytes(&data), String::from("\u{feff}ABAB"));
        // big endian
        let data: Vec<u8> = vec![0, 65, 0, 66, 0, 65, 0, 66];
        assert_eq!(decode_raw_bytes(&data), String::from("ABAB"));
        // big endian, with BOM
        let data: Vec<u8> = vec![0xfe, 0xff, 0, 65, 0, 66, 0, 65, 0, 66];
        assert_eq!(decode_raw_bytes(&data), String::from("\u{feff}ABAB"));
    }

    #[test]
    fn decode_raw_bytes_u8() {
        let data: Vec<u8> = vec![65, 66, 65, 66];
        assert_eq!(decode_raw_bytes(&data), String::from("ABAB"));
        let data: Vec<u8> = vec![239, 187, 191, 65, 66];
        assert_eq!(decode_raw_bytes(&data), String::from("\u{feff}AB"));
        // not utf-8, decoded as latin-1
        let data: Vec<u8> = vec![0xa9];
        assert_eq!(decode_raw_bytes(&data), String::from("\u{00a9}"));
    }
}
