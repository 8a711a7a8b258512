//! Unpacking the tar stream a `docker cp -` copy-out produces, down to the
//! single file the Reproducer actually wants (a jar, a pom, a log).

use std::io::Read;

use tar::Archive;

use bumpbench_util::errors::BumpbenchError;

/// Read the first regular file out of an uncompressed tar stream.
pub fn first_file_bytes(tar_bytes: &[u8]) -> Result<Option<Vec<u8>>, BumpbenchError> {
    let mut archive = Archive::new(tar_bytes);
    read_first_entry(&mut archive)
}

fn read_first_entry<R: Read>(archive: &mut Archive<R>) -> Result<Option<Vec<u8>>, BumpbenchError> {
    let entries = archive.entries().map_err(|e| BumpbenchError::Container {
        message: format!("failed to read tar stream: {e}"),
    })?;

    for entry in entries {
        let mut entry = entry.map_err(|e| BumpbenchError::Container {
            message: format!("failed to read tar entry: {e}"),
        })?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let mut buf = Vec::new();
        entry.read_to_end(&mut buf).map_err(|e| BumpbenchError::Container {
            message: format!("failed to read tar entry contents: {e}"),
        })?;
        return Ok(Some(buf));
    }
    Ok(None)
}
