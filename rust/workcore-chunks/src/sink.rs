//! Writing pipeline output to files.

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use workcore_common::{Result, error::Error};

/// Writes `parts` back to back into a newly created (or truncated) file at
/// `path`, returning the number of bytes written.
pub fn write_chunks<C: AsRef<[u8]>>(path: impl AsRef<Path>, parts: &[C]) -> Result<u64> {
    let path = path.as_ref();
    let context = || format!("write {}", path.display());

    let file = File::create(path).map_err(|e| Error::io(context(), e))?;
    let mut writer = BufWriter::new(file);
    let mut written = 0u64;
    for part in parts {
        let part = part.as_ref();
        writer.write_all(part).map_err(|e| Error::io(context(), e))?;
        written += part.len() as u64;
    }
    writer.flush().map_err(|e| Error::io(context(), e))?;
    Ok(written)
}

/// Writes a single buffer to `path`.
pub fn write_output(path: impl AsRef<Path>, data: &[u8]) -> Result<u64> {
    write_chunks(path, std::slice::from_ref(&data))
}
