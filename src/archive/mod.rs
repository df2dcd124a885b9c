mod inputs;
pub mod name;

use std::{
    fs::File,
    fs,
    io::{self, BufWriter, IntoInnerError, Read, Write},
    path::{Component, Path, PathBuf},
};

use clap::builder::styling::AnsiColor;
use flate2::{write::GzEncoder, Compression};
use log::debug;
use tar::{Builder, Header};
use tempfile::NamedTempFile;

use crate::{
    error::Result,
    format::{format_path, format_size},
};

pub use self::inputs::ArchiveJob;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ArchiveSummary {
    pub files: u64,
    pub bytes: u64,
}

#[derive(Debug)]
pub struct BuiltArchive {
    pub path: PathBuf,
    pub size: u64,
    pub summary: ArchiveSummary,
}

/// Resolves `job`, writes its files to a temp file in `output_dir` and moves
/// the finished archive to `output_dir/file_name`. The output directory is
/// only created once every input has matched.
pub fn build_archive(job: &ArchiveJob, output_dir: &Path, file_name: &str) -> Result<BuiltArchive> {
    let files = job.resolve()?;
    fs::create_dir_all(output_dir)?;

    let temp = NamedTempFile::new_in(output_dir)?;
    let (writer, summary) = write_archive(&files, BufWriter::new(temp))?;
    let temp = writer.into_inner().map_err(IntoInnerError::into_error)?;
    temp.as_file().sync_all()?;

    let path = output_dir.join(file_name);
    let file = temp.persist(&path)?;
    let size = file.metadata()?.len();

    Ok(BuiltArchive {
        path,
        size,
        summary,
    })
}

pub fn write_archive<W: Write>(files: &[PathBuf], writer: W) -> Result<(W, ArchiveSummary)> {
    let encoder = GzEncoder::new(writer, Compression::default());
    let mut builder = Builder::new(encoder);
    let mut summary = ArchiveSummary::default();

    for path in files {
        summary.bytes += append_file(&mut builder, path)?;
        summary.files += 1;
    }

    let encoder = builder.into_inner()?;
    let writer = encoder.finish()?;
    Ok((writer, summary))
}

fn append_file<W: Write>(builder: &mut Builder<W>, path: &Path) -> Result<u64> {
    let file = File::open(path)?;
    let metadata = file.metadata()?;
    let size = metadata.len();

    let mut header = Header::new_gnu();
    header.set_metadata(&metadata);
    append_entry(builder, &mut header, entry_name(path), file)?;

    let style = AnsiColor::Blue.on_default();
    let size_style = AnsiColor::BrightBlack.on_default();
    debug!(
        "{style}added file{style:#} {} {size_style}({}){size_style:#}",
        format_path(path),
        format_size(size)
    );
    Ok(size)
}

/// Appends `reader` as an entry of `header.size()` bytes. A reader that ends
/// early, such as a file truncated after it was stat'ed, fails with
/// `UnexpectedEof` instead of leaving a zero-padded entry behind.
fn append_entry<W: Write, R: Read>(
    builder: &mut Builder<W>,
    header: &mut Header,
    name: PathBuf,
    reader: R,
) -> Result<()> {
    let size = header.size()?;
    let reader = ExactReader {
        inner: reader.take(size),
        remaining: size,
    };
    builder.append_data(header, name, reader)?;
    Ok(())
}

struct ExactReader<R> {
    inner: R,
    remaining: u64,
}

impl<R: Read> Read for ExactReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 || buf.is_empty() {
            return Ok(0);
        }

        let n = self.inner.read(buf)?;
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("entry ended {} bytes short", self.remaining),
            ));
        }

        self.remaining -= n as u64;
        Ok(n)
    }
}

// Archive entries are always relative: root and `.`/`..` components are dropped.
fn entry_name(path: &Path) -> PathBuf {
    path.components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part),
            _ => None,
        })
        .collect()
}
