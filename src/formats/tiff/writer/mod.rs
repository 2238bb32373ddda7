//! Saving modified trees back to their files
//!
//! [`plan`] decides between patching the original byte regions and
//! regenerating the APP1 segment; [`ExifWriter`] carries the decision out
//! through a temporary file that replaces the original only on success.

pub mod encoder;
pub mod plan;

pub use encoder::{encode, Encoded};
pub use plan::{plan, Patch, PatchSet, RegenerateReason, Strategy};

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::config::WriteOptions;
use crate::error::{Error, Result};
use crate::formats::jpeg;
use crate::formats::tiff::types::{Container, Exif, TiffLocation};

/// What a save did to the file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Nothing to write; the file was not touched
    Unchanged,
    /// Original regions overwritten in place
    Patched { patches: usize },
    /// EXIF segment rebuilt
    Regenerated { reason: RegenerateReason, bytes: usize },
}

/// Writes trees back to disk according to [`WriteOptions`]
#[derive(Debug, Clone, Default)]
pub struct ExifWriter {
    options: WriteOptions,
}

impl ExifWriter {
    pub fn new(options: &WriteOptions) -> Self {
        Self { options: options.clone() }
    }

    /// Saves `exif` into `path`, the file it was read from
    ///
    /// A tree built in memory is spliced into the JPEG at `path`. On
    /// success the tree is re-based on the written layout, so it can be
    /// edited and saved again.
    pub fn save<P: AsRef<Path>>(&self, path: P, exif: &mut Exif) -> Result<SaveOutcome> {
        let path = path.as_ref();

        let outcome = match plan(exif, self.options.prefer_in_place)? {
            Strategy::Unchanged => SaveOutcome::Unchanged,
            Strategy::Patch(set) => {
                let base = exif
                    .location()
                    .map(|l| l.tiff_base)
                    .ok_or_else(|| Error::Unsupported("patch without an original layout".into()))?;
                commit(path, &self.options, |file| apply_patches(path, file, base, &set.patches))?;
                exif.rebase(&set.layout, None);
                SaveOutcome::Patched { patches: set.patches.len() }
            }
            Strategy::Regenerate(reason) => {
                if matches!(exif.location(), Some(TiffLocation { container: Container::Tiff, .. })) {
                    return Err(Error::Unsupported(format!(
                        "regenerating a bare TIFF file ({reason})"
                    )));
                }

                exif.materialize()?;
                let encoded = encode(exif)?;
                let segment = jpeg::build_app1(&encoded.bytes)?;

                let start = commit(path, &self.options, |file| {
                    let mut src = BufReader::new(File::open(path)?);
                    let mut dst = BufWriter::new(file);
                    let start = jpeg::splice_exif(&mut src, &mut dst, &segment)?;
                    dst.flush()?;
                    Ok(start)
                })?;

                let location = TiffLocation {
                    container: Container::Jpeg { segment_start: start, segment_len: segment.len() as u64 },
                    tiff_base: start + jpeg::EXIF_PREFIX_LEN,
                    tiff_len: encoded.bytes.len() as u64,
                };
                exif.rebase(&encoded.layout, Some(location));
                SaveOutcome::Regenerated { reason, bytes: encoded.bytes.len() }
            }
        };

        match outcome {
            SaveOutcome::Unchanged => log::info!("{}: no changes to save", path.display()),
            SaveOutcome::Patched { patches } => {
                log::info!("{}: patched {patches} region(s) in place", path.display())
            }
            SaveOutcome::Regenerated { reason, bytes } => {
                log::info!("{}: regenerated {bytes}-byte EXIF block ({reason})", path.display())
            }
        }
        Ok(outcome)
    }

    /// Streams the JPEG in `src` to `dst` with a freshly encoded EXIF segment
    ///
    /// Returns the offset of the new segment in `dst`. The tree keeps its
    /// original layout.
    pub fn write_jpeg<R: Read, W: Write>(&self, exif: &mut Exif, src: &mut R, dst: &mut W) -> Result<u64> {
        exif.materialize()?;
        let encoded = encode(exif)?;
        let segment = jpeg::build_app1(&encoded.bytes)?;
        jpeg::splice_exif(src, dst, &segment)
    }
}

fn apply_patches(path: &Path, file: &mut File, base: u64, patches: &[Patch]) -> Result<()> {
    io::copy(&mut File::open(path)?, file)?;
    for patch in patches {
        file.seek(SeekFrom::Start(base + patch.offset as u64))?;
        file.write_all(&patch.bytes)?;
        log::debug!("Wrote {} bytes at TIFF offset {}", patch.bytes.len(), patch.offset);
    }
    Ok(())
}

fn backup_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_owned();
    name.push(".bak");
    PathBuf::from(name)
}

/// Fills a temporary file next to `target`, then renames it over `target`
///
/// The temporary file is removed when `fill` or any later step fails.
fn commit<T>(target: &Path, options: &WriteOptions, fill: impl FnOnce(&mut File) -> Result<T>) -> Result<T> {
    let dir = target
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::Builder::new().prefix(".exifkit-").tempfile_in(dir)?;

    let result = fill(tmp.as_file_mut())?;
    tmp.as_file_mut().flush()?;
    if options.sync {
        tmp.as_file().sync_all()?;
    }
    tmp.as_file().set_permissions(fs::metadata(target)?.permissions())?;

    if options.backup_originals {
        let backup = backup_path(target);
        fs::copy(target, &backup)?;
        log::debug!("Backed up {} to {}", target.display(), backup.display());
    }

    tmp.persist(target).map_err(|e| Error::Io(e.error))?;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReadOptions;
    use crate::formats::tiff::entry::Entry;
    use crate::formats::tiff::gps::GpsPosition;
    use crate::formats::tiff::ifd::{Ifd, IfdKind};
    use crate::formats::tiff::value::{FieldType, Value};
    use crate::formats::tiff::{fixtures, tags};
    use crate::io::ByteOrder;
    use crate::types::Rational;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn on_disk(bytes: &[u8]) -> (TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.jpg");
        fs::write(&path, bytes).unwrap();
        (dir, path)
    }

    fn open(path: &Path) -> Exif {
        crate::open(path, &ReadOptions::default()).unwrap().unwrap()
    }

    fn main_entry<'a>(exif: &'a mut Exif, tag: u16) -> &'a mut Entry {
        let main = exif.main_ifd().unwrap();
        exif.ifd_mut(main).unwrap().get_tag_value(tag, true).unwrap().unwrap()
    }

    fn dir_len(dir: &TempDir) -> usize {
        fs::read_dir(dir.path()).unwrap().count()
    }

    #[test]
    fn test_unchanged_tree_leaves_file_alone() {
        let original = fixtures::sample_jpeg(ByteOrder::LittleEndian);
        let (dir, path) = on_disk(&original);
        let mut exif = open(&path);

        let outcome = ExifWriter::default().save(&path, &mut exif).unwrap();
        assert_eq!(outcome, SaveOutcome::Unchanged);
        assert_eq!(fs::read(&path).unwrap(), original);
        assert_eq!(dir_len(&dir), 1);
    }

    #[test]
    fn test_short_patch_changes_only_the_record() {
        let original = fixtures::sample_jpeg(ByteOrder::LittleEndian);
        let (_dir, path) = on_disk(&original);
        let mut exif = open(&path);
        main_entry(&mut exif, tags::ORIENTATION).set_int(6).unwrap();

        let writer = ExifWriter::new(&WriteOptions::default());
        assert_eq!(writer.save(&path, &mut exif).unwrap(), SaveOutcome::Patched { patches: 1 });

        let mut expected = original;
        let value_at = (fixtures::JPEG_TIFF_BASE + fixtures::ORIENTATION_RECORD as u64 + 8) as usize;
        expected[value_at] = 6;
        assert_eq!(fs::read(&path).unwrap(), expected);
        assert!(!exif.has_changes());
    }

    #[test]
    fn test_data_area_patches() {
        let original = fixtures::sample_jpeg(ByteOrder::BigEndian);
        let (_dir, path) = on_disk(&original);
        let mut exif = open(&path);
        main_entry(&mut exif, tags::MAKE).set_text("Sony").unwrap();
        main_entry(&mut exif, tags::X_RESOLUTION).set_rational(Rational::new(300, 1)).unwrap();

        let outcome = ExifWriter::default().save(&path, &mut exif).unwrap();
        assert_eq!(outcome, SaveOutcome::Patched { patches: 4 });
        assert_eq!(fs::metadata(&path).unwrap().len(), original.len() as u64);

        let mut reread = open(&path);
        let main = reread.main_ifd().unwrap();
        assert_eq!(reread.resolve(main, tags::MAKE).unwrap().and_then(Value::as_text), Some("Sony"));
        let resolution = reread.resolve(main, tags::X_RESOLUTION).unwrap().cloned();
        assert_eq!(resolution, Some(Value::Rationals(vec![Rational::new(300, 1)])));
    }

    #[test]
    fn test_grown_value_regenerates_and_keeps_thumbnail() {
        let original = fixtures::sample_jpeg(ByteOrder::LittleEndian);
        let (_dir, path) = on_disk(&original);
        let mut exif = open(&path);
        main_entry(&mut exif, tags::MAKE).set_text("Hasselblad").unwrap();

        let outcome = ExifWriter::default().save(&path, &mut exif).unwrap();
        assert!(matches!(
            outcome,
            SaveOutcome::Regenerated { reason: RegenerateReason::Grown { tag: tags::MAKE, .. }, .. }
        ));

        let saved = fs::read(&path).unwrap();
        assert_eq!(saved[..fixtures::JPEG_EXIF_SEGMENT as usize], original[..fixtures::JPEG_EXIF_SEGMENT as usize]);
        assert!(saved.ends_with(&[0xFF, 0xD9]));

        let mut reread = open(&path);
        reread.materialize().unwrap();
        let main = reread.main_ifd().unwrap();
        assert_eq!(reread.ifd(main).unwrap().text(tags::MAKE), Some("Hasselblad"));
        let ifd1 = reread.find_ifd(IfdKind::Image(1)).unwrap();
        assert_eq!(reread.thumbnail(ifd1).unwrap(), Some(&fixtures::THUMBNAIL[..]));
    }

    #[test]
    fn test_gps_directory_round_trip() {
        let (_dir, path) = on_disk(&fixtures::sample_jpeg(ByteOrder::BigEndian));
        let mut exif = open(&path);
        let position = GpsPosition { latitude: 45.5, longitude: -122.25, altitude: Some(30.0) };
        position.write(&mut exif).unwrap();

        let outcome = ExifWriter::default().save(&path, &mut exif).unwrap();
        assert!(matches!(
            outcome,
            SaveOutcome::Regenerated { reason: RegenerateReason::NewDirectory(IfdKind::Gps), .. }
        ));

        let mut reread = open(&path);
        reread.materialize().unwrap();
        let gps = reread.gps_ifd().unwrap();
        assert_eq!(reread.ifd(gps).unwrap().entry_count(), 7);
        let decoded = GpsPosition::read(&mut reread).unwrap().unwrap();
        assert!((decoded.latitude - 45.5).abs() < 1e-6);
        assert!((decoded.longitude + 122.25).abs() < 1e-6);
        assert_eq!(decoded.altitude, Some(30.0));
    }

    #[test]
    fn test_explicit_gps_entries_round_trip() {
        let (_dir, path) = on_disk(&fixtures::sample_jpeg(ByteOrder::LittleEndian));
        let mut exif = open(&path);
        let main = exif.main_ifd().unwrap();
        let gps = exif.add_ifd(main, Ifd::new(IfdKind::Gps)).unwrap();

        let latitude = vec![Rational::new(45, 1), Rational::new(35, 1), Rational::new(25, 1)];
        let longitude = vec![Rational::new(87, 1), Rational::new(40, 1), Rational::new(30, 1)];
        {
            let ifd = exif.ifd_mut(gps).unwrap();
            ifd.get_tag_value(tags::GPS_LATITUDE_REF, true).unwrap().unwrap().set_text("N").unwrap();
            ifd.get_tag_value(tags::GPS_LATITUDE, true).unwrap().unwrap().set_rationals(latitude.clone()).unwrap();
            ifd.get_tag_value(tags::GPS_LONGITUDE_REF, true).unwrap().unwrap().set_text("W").unwrap();
            ifd.get_tag_value(tags::GPS_LONGITUDE, true).unwrap().unwrap().set_rationals(longitude.clone()).unwrap();
            ifd.get_tag_value(tags::GPS_ALTITUDE_REF, true).unwrap().unwrap().set_int(1).unwrap();
            ifd.get_tag_value(tags::GPS_ALTITUDE, true).unwrap().unwrap().set_rational(Rational::new(100, 1)).unwrap();
        }
        ExifWriter::default().save(&path, &mut exif).unwrap();

        let mut reread = open(&path);
        reread.materialize().unwrap();
        let gps = reread.gps_ifd().unwrap();
        let ifd = reread.ifd(gps).unwrap();
        // GpsPosition::write would also add GPSVersionID, making seven
        assert_eq!(ifd.entry_count(), 6);
        assert_eq!(ifd.text(tags::GPS_LATITUDE_REF), Some("N"));
        assert_eq!(ifd.text(tags::GPS_LONGITUDE_REF), Some("W"));
        assert_eq!(ifd.int(tags::GPS_ALTITUDE_REF), Some(1));
        assert_eq!(ifd.entry(tags::GPS_LATITUDE).and_then(|e| e.value()), Some(&Value::Rationals(latitude)));
        assert_eq!(ifd.entry(tags::GPS_LONGITUDE).and_then(|e| e.value()), Some(&Value::Rationals(longitude)));
        assert_eq!(
            ifd.entry(tags::GPS_ALTITUDE).and_then(|e| e.value()),
            Some(&Value::Rationals(vec![Rational::new(100, 1)]))
        );
        assert!(ifd.entry(tags::GPS_VERSION_ID).is_none());
    }

    #[test]
    fn test_tree_can_be_saved_twice() {
        let (_dir, path) = on_disk(&fixtures::sample_jpeg(ByteOrder::LittleEndian));
        let mut exif = open(&path);
        main_entry(&mut exif, tags::ARTIST).set_text("first").unwrap();
        let writer = ExifWriter::default();
        assert!(matches!(writer.save(&path, &mut exif).unwrap(), SaveOutcome::Regenerated { .. }));

        main_entry(&mut exif, tags::ORIENTATION).set_int(8).unwrap();
        assert_eq!(writer.save(&path, &mut exif).unwrap(), SaveOutcome::Patched { patches: 1 });

        let reread = open(&path);
        let main = reread.ifd(reread.main_ifd().unwrap()).unwrap();
        assert_eq!(main.int(tags::ORIENTATION), Some(8));
    }

    #[test]
    fn test_forced_regeneration() {
        let (_dir, path) = on_disk(&fixtures::sample_jpeg(ByteOrder::LittleEndian));
        let mut exif = open(&path);
        main_entry(&mut exif, tags::ORIENTATION).set_int(3).unwrap();

        let options = WriteOptions { prefer_in_place: false, ..WriteOptions::default() };
        let outcome = ExifWriter::new(&options).save(&path, &mut exif).unwrap();
        assert_eq!(
            outcome,
            SaveOutcome::Regenerated { reason: RegenerateReason::Forced, bytes: fixtures::SAMPLE_TIFF_LEN }
        );
    }

    #[test]
    fn test_bare_tiff_patches_but_never_regenerates() {
        let original = fixtures::sample_tiff(ByteOrder::BigEndian);
        let (_dir, path) = on_disk(&original);

        let mut exif = open(&path);
        main_entry(&mut exif, tags::ORIENTATION).set_int(3).unwrap();
        assert_eq!(ExifWriter::default().save(&path, &mut exif).unwrap(), SaveOutcome::Patched { patches: 1 });

        main_entry(&mut exif, tags::MAKE).set_text("Hasselblad").unwrap();
        let err = ExifWriter::default().save(&path, &mut exif).unwrap_err();
        assert!(matches!(err, Error::Unsupported(_)));
    }

    #[test]
    fn test_oversized_block_leaves_original() {
        let original = fixtures::sample_jpeg(ByteOrder::LittleEndian);
        let (dir, path) = on_disk(&original);
        let mut exif = open(&path);
        let sub = exif.find_ifd(IfdKind::Exif).unwrap();
        let comment = Entry::with_value(tags::USER_COMMENT, FieldType::Undefined, Value::Bytes(vec![0; 70_000])).unwrap();
        exif.ifd_mut(sub).unwrap().set_entry(tags::USER_COMMENT, 0, comment).unwrap();

        let err = ExifWriter::default().save(&path, &mut exif).unwrap_err();
        assert!(matches!(err, Error::SegmentTooLarge(_)));
        assert_eq!(fs::read(&path).unwrap(), original);
        assert_eq!(dir_len(&dir), 1);
    }

    #[test]
    fn test_failed_fill_leaves_original_and_no_temp_file() {
        let original = fixtures::sample_jpeg(ByteOrder::LittleEndian);
        let (dir, path) = on_disk(&original);

        let result: Result<()> = commit(&path, &WriteOptions::default(), |file| {
            file.write_all(b"partial")?;
            Err(io::Error::other("disk full").into())
        });
        assert!(matches!(result, Err(Error::Io(_))));
        assert_eq!(fs::read(&path).unwrap(), original);
        assert_eq!(dir_len(&dir), 1);
    }

    #[test]
    fn test_backup_keeps_original_bytes() {
        let original = fixtures::sample_jpeg(ByteOrder::LittleEndian);
        let (_dir, path) = on_disk(&original);
        let mut exif = open(&path);
        main_entry(&mut exif, tags::ORIENTATION).set_int(6).unwrap();

        let options = WriteOptions { backup_originals: true, sync: false, ..WriteOptions::default() };
        ExifWriter::new(&options).save(&path, &mut exif).unwrap();
        assert_eq!(fs::read(backup_path(&path)).unwrap(), original);
        assert_ne!(fs::read(&path).unwrap(), original);
    }

    #[test]
    fn test_write_jpeg_inserts_segment_after_jfif() {
        let mut exif = Exif::new(ByteOrder::BigEndian);
        main_entry(&mut exif, tags::ORIENTATION).set_int(6).unwrap();

        let mut out = Vec::new();
        let start = ExifWriter::default()
            .write_jpeg(&mut exif, &mut Cursor::new(fixtures::plain_jpeg()), &mut out)
            .unwrap();
        assert_eq!(start, fixtures::JPEG_EXIF_SEGMENT);

        let reread = crate::read_bytes(&out, &ReadOptions::default()).unwrap().unwrap();
        let main = reread.ifd(reread.main_ifd().unwrap()).unwrap();
        assert_eq!(main.int(tags::ORIENTATION), Some(6));
        assert!(exif.location().is_none());
    }

    #[test]
    fn test_in_memory_tree_is_spliced_into_plain_jpeg() {
        let (_dir, path) = on_disk(&fixtures::plain_jpeg());
        let mut exif = Exif::new(ByteOrder::LittleEndian);
        main_entry(&mut exif, tags::SOFTWARE).set_text("exifkit").unwrap();

        let outcome = ExifWriter::default().save(&path, &mut exif).unwrap();
        assert!(matches!(
            outcome,
            SaveOutcome::Regenerated { reason: RegenerateReason::NoOriginalLayout, .. }
        ));
        assert!(matches!(exif.location().map(|l| l.container), Some(Container::Jpeg { .. })));

        let mut reread = open(&path);
        reread.materialize().unwrap();
        let main = reread.ifd(reread.main_ifd().unwrap()).unwrap();
        assert_eq!(main.text(tags::SOFTWARE), Some("exifkit"));
    }
}
