//! Copying resources to the output tree.
//!
//! The destination is written through a temporary file in the destination
//! directory and renamed into place once fully written, so a reader never
//! sees a partial file and repeated copies of the same resource are
//! harmless.

use std::io::Write;
use std::path::Path;

use gpc_core::{GpcError, GpcResult, SystemId};
use tracing::debug;

use crate::resource::open_system_id;

/// Copy the bytes behind `source` to `dest`, creating missing parent
/// directories. Returns the number of bytes written.
pub fn copy_resource(source: &SystemId, dest: &Path) -> GpcResult<u64> {
    let parent = dest.parent().ok_or_else(|| {
        GpcError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("{} has no parent directory", dest.display()),
        ))
    })?;
    std::fs::create_dir_all(parent)?;

    let mut reader = open_system_id(source)?;
    let mut staged = tempfile::NamedTempFile::new_in(parent)?;
    let bytes = std::io::copy(&mut reader, &mut staged)?;
    staged.flush()?;
    staged.persist(dest).map_err(|e| GpcError::Io(e.error))?;

    debug!(source = %source, dest = %dest.display(), bytes, "materialized resource");
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::tests::write_zip;

    #[test]
    fn creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("a.xsd");
        std::fs::write(&src, b"<xs:schema/>").unwrap();
        let id = SystemId::from_path(&src).unwrap();

        let dest = dir.path().join("out/gc/schemas/a.xsd");
        let bytes = copy_resource(&id, &dest).unwrap();
        assert_eq!(bytes, 12);
        assert_eq!(std::fs::read(&dest).unwrap(), b"<xs:schema/>");
    }

    #[test]
    fn overwrites_existing_destination() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("a.xsd");
        std::fs::write(&src, b"new").unwrap();
        let dest = dir.path().join("out/a.xsd");
        std::fs::create_dir_all(dest.parent().unwrap()).unwrap();
        std::fs::write(&dest, b"old content").unwrap();

        copy_resource(&SystemId::from_path(&src).unwrap(), &dest).unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"new");
    }

    #[test]
    fn copies_archive_entries() {
        let dir = tempfile::tempdir().unwrap();
        let jar = dir.path().join("lib.jar");
        write_zip(&jar, &[("schemas/s.xsd", "<s/>")]);
        let id = SystemId::archive_entry(&jar, "schemas/s.xsd").unwrap();

        let dest = dir.path().join("out/s.xsd");
        copy_resource(&id, &dest).unwrap();
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "<s/>");
    }

    #[test]
    fn missing_source_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out/x.xsd");
        let missing = SystemId::new(
            url::Url::from_file_path(dir.path().join("nope.xsd"))
                .unwrap()
                .to_string(),
        );
        assert!(copy_resource(&missing, &dest).is_err());
        assert!(!dest.exists());
    }
}
