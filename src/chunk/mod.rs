
use std::io::Read;

use crate::{
    error::{Error, Result},
    hash::Digest,
};

/// A closed byte range `[begin, end]` of an archive together with its bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilePart {
    pub begin: u64,
    pub end: u64,
    pub data: Vec<u8>,
    pub digest: Digest,
}

impl FilePart {
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn content_range(&self, total: u64) -> String {
        format!("bytes {}-{}/{total}", self.begin, self.end)
    }
}

/// Splits `reader` into parts of `part_size` bytes, reading all of it up
/// front. Use [`parts`] to read one part at a time.
pub fn plan<R: Read>(reader: R, part_size: u64) -> Result<Vec<FilePart>> {
    let parts = parts(reader, part_size)?.collect::<Result<Vec<_>>>()?;
    if parts.is_empty() {
        return Err(Error::EmptyArchive);
    }

    Ok(parts)
}

/// Lazy form of [`plan`]: each `next` reads and hashes a single window, so
/// only the parts still held by the caller are in memory. An empty input
/// yields no parts.
pub fn parts<R: Read>(reader: R, part_size: u64) -> Result<Parts<R>> {
    if part_size == 0 {
        return Err(Error::InvalidPartSize(part_size));
    }

    let capacity = usize::try_from(part_size).map_err(|_| Error::InvalidPartSize(part_size))?;
    Ok(Parts {
        reader,
        part_size,
        capacity,
        offset: 0,
        done: false,
    })
}

pub fn part_count(total: u64, part_size: u64) -> u64 {
    if part_size == 0 {
        0
    } else {
        total.div_ceil(part_size)
    }
}

#[derive(Debug)]
pub struct Parts<R> {
    reader: R,
    part_size: u64,
    capacity: usize,
    offset: u64,
    done: bool,
}

impl<R: Read> Parts<R> {
    fn read_part(&mut self) -> Result<Option<FilePart>> {
        let mut data = Vec::with_capacity(self.capacity);
        let n = self.reader.by_ref().take(self.part_size).read_to_end(&mut data)? as u64;
        if n == 0 {
            return Ok(None);
        }

        let digest = Digest::of(&data);
        let part = FilePart {
            begin: self.offset,
            end: self.offset + n - 1,
            data,
            digest,
        };

        self.offset += n;
        Ok(Some(part))
    }
}

impl<R: Read> Iterator for Parts<R> {
    type Item = Result<FilePart>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let part = self.read_part().transpose();
        if !matches!(part, Some(Ok(_))) {
            self.done = true;
        }
        part
    }
}
