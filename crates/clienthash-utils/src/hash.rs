use std::{
    fs::File,
    io::{self, Read},
    path::Path,
};

use md5::{Digest, Md5};

use crate::error::{HashError, HashResult};

/// Size of the buffer used when feeding a stream into the hasher.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Computes the hex-encoded MD5 digest of everything `reader` yields.
///
/// The reader is consumed in [`CHUNK_SIZE`] pieces, so memory use does not depend on the
/// length of the stream.
///
/// # Example
///
/// ```
/// use clienthash_utils::hash::digest_reader;
///
/// let digest = digest_reader(&mut &b"hello"[..]).unwrap();
/// assert_eq!(digest, "5d41402abc4b2a76b9719d911017c592");
/// ```
pub fn digest_reader<R: Read + ?Sized>(reader: &mut R) -> io::Result<String> {
    let mut hasher = Md5::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];

    loop {
        let n = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        };
        hasher.update(&buffer[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Computes the hex-encoded MD5 digest of a file on disk.
///
/// # Errors
///
/// * [`HashError::ReadFailed`] if the file cannot be opened or read.
pub fn digest_file<P: AsRef<Path>>(file_path: P) -> HashResult<String> {
    let file_path = file_path.as_ref();
    let read_failed = |err| {
        HashError::ReadFailed {
            path: file_path.to_path_buf(),
            source: err,
        }
    };

    let mut file = File::open(file_path).map_err(read_failed)?;
    digest_reader(&mut file).map_err(read_failed)
}

/// Computes the hex-encoded MD5 digest of a UTF-8 string.
pub fn digest_str(value: &str) -> String {
    hex::encode(Md5::digest(value.as_bytes()))
}
