use std::{
    fmt,
    fs::File,
    io::{self, BufReader},
    path::Path,
};

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};
use sha1::{Digest as _, Sha1};

use crate::error::Result;

pub const SIZE: usize = 20;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Digest([u8; SIZE]);

impl Digest {
    pub fn of(bytes: &[u8]) -> Self {
        Digest::from_hasher(Sha1::new_with_prefix(bytes))
    }

    fn from_hasher(hasher: Sha1) -> Self {
        let mut bytes = [0; SIZE];
        bytes.copy_from_slice(&hasher.finalize());
        Digest(bytes)
    }

    pub fn to_base64(&self) -> String {
        BASE64_STANDARD.encode(self.0)
    }

    pub fn header_value(&self) -> String {
        format!("sha={}", self.to_base64())
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }

        Ok(())
    }
}

pub fn file_digest(path: &Path) -> Result<Digest> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut hasher = Sha1::new();
    io::copy(&mut reader, &mut hasher)?;
    Ok(Digest::from_hasher(hasher))
}
