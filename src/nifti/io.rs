//! NIfTI file I/O.
//!
//! Headers of uncompressed templates are memory-mapped; gzipped templates are
//! streamed only as far as the header. Output is written with `create_new`, so
//! an existing dataset is never overwritten.

use super::header::{NiftiHeader, NiftiVersion};
use crate::error::{Error, Result};
use crate::geometry::GridGeometry;
use crate::grid::GridBuffer;
use crate::template::DatasetKind;
use flate2::bufread::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use memmap2::Mmap;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// True if `path` names a gzip-compressed dataset.
pub fn is_gzipped(path: &Path) -> bool {
    path.extension().is_some_and(|e| e == "gz")
}

/// Load only the header from a NIfTI file.
#[allow(unsafe_code)]
pub fn load_header<P: AsRef<Path>>(path: P) -> Result<NiftiHeader> {
    let path = path.as_ref();
    let file = File::open(path)?;

    if is_gzipped(path) {
        let mut decoder = MultiGzDecoder::new(BufReader::new(file));
        let mut header_buf = Vec::with_capacity(NiftiHeader::SIZE_V2);
        decoder
            .by_ref()
            .take(NiftiHeader::SIZE_V2 as u64)
            .read_to_end(&mut header_buf)?;
        NiftiHeader::from_bytes(&header_buf)
    } else {
        // SAFETY: Memory mapping is safe - file just opened, read-only access
        let mmap = unsafe { Mmap::map(&file)? };
        NiftiHeader::from_bytes(&mmap)
    }
}

/// Destination file for an output prefix.
///
/// Prefixes already ending in `.nii` or `.nii.gz` are kept; anything else
/// gets `.nii` appended.
pub fn output_path<P: AsRef<Path>>(prefix: P) -> PathBuf {
    let prefix = prefix.as_ref();
    let name = prefix.to_string_lossy();
    if name.ends_with(".nii") || name.ends_with(".nii.gz") {
        prefix.to_path_buf()
    } else {
        PathBuf::from(format!("{}.nii", name))
    }
}

/// Write a finished grid as a single-frame NIfTI-1 dataset.
///
/// Gzip compression is used when `path` ends in `.gz`. Fails with
/// [`Error::OutputExists`] if `path` already exists.
pub fn save_grid<P: AsRef<Path>>(
    geometry: &GridGeometry,
    grid: &GridBuffer,
    kind: DatasetKind,
    path: P,
) -> Result<()> {
    let path = path.as_ref();
    if grid.dims() != geometry.dims() {
        return Err(Error::InvalidDimensions(format!(
            "grid shape {:?} does not match geometry {:?}",
            grid.dims(),
            geometry.dims()
        )));
    }

    let header = NiftiHeader::for_grid(geometry, grid.datum(), kind)?;
    let header_bytes = header.to_bytes();
    let padding = header.vox_offset as usize - NiftiVersion::Nifti1.header_size();
    let data = grid.to_le_bytes();

    let file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            return Err(Error::OutputExists(path.to_path_buf()))
        }
        Err(e) => return Err(e.into()),
    };
    let writer = BufWriter::with_capacity(1024 * 1024, file);

    if is_gzipped(path) {
        let mut encoder = GzEncoder::new(writer, Compression::default());
        write_dataset(&mut encoder, &header_bytes, padding, &data)?;
        encoder.finish()?.flush()?;
    } else {
        let mut writer = writer;
        write_dataset(&mut writer, &header_bytes, padding, &data)?;
        writer.flush()?;
    }

    Ok(())
}

fn write_dataset<W: Write>(out: &mut W, header: &[u8], padding: usize, data: &[u8]) -> Result<()> {
    out.write_all(header)?;
    // zeroed extension flag plus alignment up to vox_offset
    out.write_all(&vec![0u8; padding])?;
    out.write_all(data)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::DatumType;
    use crate::orientation::OrientationCode;
    use flate2::read::GzDecoder;
    use tempfile::tempdir;

    fn small_grid() -> (GridGeometry, GridBuffer) {
        let geom = GridGeometry::from_dimensions([3, 2, 2], OrientationCode::default()).unwrap();
        let mut grid = GridBuffer::filled(&geom, DatumType::Short, 0.0);
        grid.apply([2, 1, 1], 42.0);
        (geom, grid)
    }

    #[test]
    fn test_output_path() {
        assert_eq!(output_path("undump"), PathBuf::from("undump.nii"));
        assert_eq!(output_path("out/roi.nii"), PathBuf::from("out/roi.nii"));
        assert_eq!(output_path("roi.nii.gz"), PathBuf::from("roi.nii.gz"));
        assert_eq!(output_path("roi.v2"), PathBuf::from("roi.v2.nii"));
    }

    #[test]
    fn test_save_uncompressed_layout() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("grid.nii");
        let (geom, grid) = small_grid();

        save_grid(&geom, &grid, DatasetKind::Functional, &path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(bytes.len(), 352 + 12 * 2);
        assert_eq!(&bytes[348..352], &[0, 0, 0, 0]);
        let last = &bytes[bytes.len() - 2..];
        assert_eq!(i16::from_le_bytes([last[0], last[1]]), 42);

        let header = load_header(&path).unwrap();
        assert_eq!(header.spatial_dims(), [3, 2, 2]);
    }

    #[test]
    fn test_save_gzipped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("grid.nii.gz");
        let (geom, grid) = small_grid();

        save_grid(&geom, &grid, DatasetKind::Anatomical, &path).unwrap();

        let mut decoded = Vec::new();
        GzDecoder::new(File::open(&path).unwrap())
            .read_to_end(&mut decoded)
            .unwrap();
        assert_eq!(decoded.len(), 352 + 24);
        assert_eq!(&decoded[352..], grid.to_le_bytes().as_slice());

        let header = load_header(&path).unwrap();
        assert_eq!(header.descrip, "undump anat");
    }

    #[test]
    fn test_save_refuses_existing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("grid.nii");
        std::fs::write(&path, b"occupied").unwrap();
        let (geom, grid) = small_grid();

        let err = save_grid(&geom, &grid, DatasetKind::Functional, &path).unwrap_err();
        assert!(matches!(err, Error::OutputExists(_)));
        assert_eq!(std::fs::read(&path).unwrap(), b"occupied");
    }

    #[test]
    fn test_load_header_missing_file() {
        let dir = tempdir().unwrap();
        let err = load_header(dir.path().join("absent.nii")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
