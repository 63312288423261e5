use std::{
    borrow::Cow,
    io::{self, BufRead, BufReader, Read},
};

use clienthash_dl::download::{Download, CHUNK_SIZE};
use clienthash_utils::hash::digest_reader;
use flate2::bufread::DeflateDecoder;
use tracing::{debug, trace};

use super::ExtractStage;
use crate::error::{ErrorContext, ExtractError, Result};

const LOCAL_HEADER_SIGNATURE: u32 = 0x0403_4b50;
const CENTRAL_HEADER_SIGNATURE: u32 = 0x0201_4b50;
const END_OF_CENTRAL_DIRECTORY_SIGNATURE: u32 = 0x0605_4b50;
const ZIP64_END_OF_CENTRAL_DIRECTORY_SIGNATURE: u32 = 0x0606_4b50;
const DATA_DESCRIPTOR_SIGNATURE: u32 = 0x0807_4b50;

const ZIP64_EXTRA_FIELD: u16 = 0x0001;

const FLAG_ENCRYPTED: u16 = 1;
const FLAG_DATA_DESCRIPTOR: u16 = 1 << 3;

const METHOD_STORED: u16 = 0;
const METHOD_DEFLATED: u16 = 8;

/// Fixed part of a local file header, after its signature.
const LOCAL_HEADER_LEN: usize = 26;

/// Streams the zip at `url` and digests `member` without touching the disk.
pub fn digest_zip_member(
    url: &str,
    member: &str,
    on_stage: &dyn Fn(ExtractStage),
) -> Result<Option<String>> {
    on_stage(ExtractStage::Downloading);
    let body = Download::new(url).stream()?;

    on_stage(ExtractStage::Extracting);
    let mut reader = BufReader::with_capacity(CHUNK_SIZE, body);
    let digest = digest_member_from_stream(&mut reader, member)?;

    debug!(url, member, found = digest.is_some(), "zip scan finished");
    Ok(digest)
}

/// Walks the local headers of a zip stream and digests the first entry named `member`.
///
/// Names are compared byte for byte, whatever encoding the archive declares. Entries
/// written with a trailing data descriptor are located by decoding their deflate stream,
/// so archives produced by streaming writers are read without the central directory.
/// Reading stops as soon as the member has been hashed, or at the first central directory
/// header.
pub fn digest_member_from_stream<R: BufRead>(
    reader: &mut R,
    member: &str,
) -> Result<Option<String>> {
    loop {
        match read_signature(reader)? {
            Some(LOCAL_HEADER_SIGNATURE) => {}
            None
            | Some(
                CENTRAL_HEADER_SIGNATURE
                | END_OF_CENTRAL_DIRECTORY_SIGNATURE
                | ZIP64_END_OF_CENTRAL_DIRECTORY_SIGNATURE,
            ) => return Ok(None),
            Some(other) => {
                return Err(ExtractError::InvalidArchive(format!(
                    "unexpected header signature {other:#010x}"
                )))
            }
        }

        let entry = read_local_header(reader)?;
        if !entry.is_dir() && entry.name == member.as_bytes() {
            return digest_entry(reader, &entry, member).map(Some);
        }

        trace!(entry = %entry.display_name(), "skipping zip entry");
        skip_entry(reader, &entry)?;
    }
}

struct LocalEntry {
    name: Vec<u8>,
    flags: u16,
    method: u16,
    compressed_size: u64,
    zip64: bool,
}

impl LocalEntry {
    fn display_name(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.name)
    }

    fn is_dir(&self) -> bool {
        self.name.ends_with(b"/")
    }

    fn is_encrypted(&self) -> bool {
        self.flags & FLAG_ENCRYPTED != 0
    }

    fn has_data_descriptor(&self) -> bool {
        self.flags & FLAG_DATA_DESCRIPTOR != 0
    }
}

fn le_u16(bytes: &[u8]) -> u16 {
    u16::from_le_bytes([bytes[0], bytes[1]])
}

fn le_u32(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

fn le_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[..8]);
    u64::from_le_bytes(buf)
}

/// Reads the next header signature. A stream ending cleanly between entries yields `None`.
fn read_signature<R: Read>(reader: &mut R) -> Result<Option<u32>> {
    let mut buf = [0u8; 4];
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) if filled == 0 => return Ok(None),
            Ok(0) => {
                return Err(ExtractError::InvalidArchive(
                    "stream ends inside a header signature".to_string(),
                ))
            }
            Ok(n) => filled += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => return Err(err).with_context(|| "reading zip header".to_string()),
        }
    }
    Ok(Some(le_u32(&buf)))
}

fn read_local_header<R: Read>(reader: &mut R) -> Result<LocalEntry> {
    let mut fixed = [0u8; LOCAL_HEADER_LEN];
    reader
        .read_exact(&mut fixed)
        .with_context(|| "reading zip local header".to_string())?;

    let flags = le_u16(&fixed[2..4]);
    let method = le_u16(&fixed[4..6]);
    let compressed_size = le_u32(&fixed[14..18]);
    let name_len = le_u16(&fixed[22..24]) as usize;
    let extra_len = le_u16(&fixed[24..26]) as usize;

    let mut name = vec![0u8; name_len];
    reader
        .read_exact(&mut name)
        .with_context(|| "reading zip entry name".to_string())?;
    let mut extra = vec![0u8; extra_len];
    reader
        .read_exact(&mut extra)
        .with_context(|| "reading zip extra field".to_string())?;

    let mut entry = LocalEntry {
        name,
        flags,
        method,
        compressed_size: u64::from(compressed_size),
        zip64: false,
    };

    // Local zip64 records carry the uncompressed size first, then the compressed one.
    if let Some(field) = find_extra_field(&extra, ZIP64_EXTRA_FIELD) {
        entry.zip64 = true;
        if compressed_size == u32::MAX && field.len() >= 16 {
            entry.compressed_size = le_u64(&field[8..16]);
        }
    }

    Ok(entry)
}

fn find_extra_field(mut extra: &[u8], id: u16) -> Option<&[u8]> {
    while extra.len() >= 4 {
        let field_id = le_u16(&extra[0..2]);
        let len = le_u16(&extra[2..4]) as usize;
        let data = extra.get(4..4 + len)?;
        if field_id == id {
            return Some(data);
        }
        extra = &extra[4 + len..];
    }
    None
}

fn unsupported(entry: &LocalEntry, reason: impl Into<String>) -> ExtractError {
    ExtractError::UnsupportedEntry {
        member: entry.display_name().into_owned(),
        reason: reason.into(),
    }
}

fn truncated(entry: &LocalEntry) -> ExtractError {
    ExtractError::InvalidArchive(format!(
        "zip entry {} ends before its recorded size",
        entry.display_name()
    ))
}

fn digest_entry<R: BufRead>(reader: &mut R, entry: &LocalEntry, member: &str) -> Result<String> {
    if entry.is_encrypted() {
        return Err(unsupported(entry, "entry is encrypted"));
    }
    let context = || format!("reading zip member {member}");

    match (entry.method, entry.has_data_descriptor()) {
        (METHOD_STORED, false) => {
            let mut data = reader.by_ref().take(entry.compressed_size);
            let digest = digest_reader(&mut data).with_context(context)?;
            if data.limit() != 0 {
                return Err(truncated(entry));
            }
            Ok(digest)
        }
        (METHOD_DEFLATED, false) => {
            let mut data = reader.by_ref().take(entry.compressed_size);
            let digest =
                digest_reader(&mut DeflateDecoder::new(&mut data)).with_context(context)?;
            if data.limit() != 0 {
                return Err(truncated(entry));
            }
            Ok(digest)
        }
        (METHOD_DEFLATED, true) => {
            let digest =
                digest_reader(&mut DeflateDecoder::new(&mut *reader)).with_context(context)?;
            // A stream cut inside the entry surfaces here, not in the decoder.
            read_data_descriptor(reader, entry)?;
            Ok(digest)
        }
        (METHOD_STORED, true) => Err(unsupported(entry, "stored entry without recorded size")),
        (method, _) => Err(unsupported(entry, format!("compression method {method}"))),
    }
}

fn skip_entry<R: BufRead>(reader: &mut R, entry: &LocalEntry) -> Result<()> {
    let context = || format!("skipping zip entry {}", entry.display_name());

    if !entry.has_data_descriptor() {
        let skipped = io::copy(&mut reader.by_ref().take(entry.compressed_size), &mut io::sink())
            .with_context(context)?;
        if skipped != entry.compressed_size {
            return Err(truncated(entry));
        }
        return Ok(());
    }

    // Without a recorded size the only way past the data is to decode it.
    match entry.method {
        _ if entry.is_encrypted() => return Err(unsupported(entry, "entry is encrypted")),
        METHOD_DEFLATED => {
            io::copy(&mut DeflateDecoder::new(&mut *reader), &mut io::sink())
                .with_context(context)?;
        }
        METHOD_STORED if entry.is_dir() => {}
        METHOD_STORED => return Err(unsupported(entry, "stored entry without recorded size")),
        method => return Err(unsupported(entry, format!("compression method {method}"))),
    }

    read_data_descriptor(reader, entry)
}

/// Consumes the CRC and size record that follows the data of a streamed entry.
fn read_data_descriptor<R: Read>(reader: &mut R, entry: &LocalEntry) -> Result<()> {
    let sizes_len = if entry.zip64 { 16 } else { 8 };
    let context = || format!("reading data descriptor of {}", entry.display_name());

    let mut buf = [0u8; 4 + 4 + 16];
    reader.read_exact(&mut buf[..4]).with_context(context)?;

    // The signature is optional; without it the first word is already the CRC.
    let rest = if le_u32(&buf[..4]) == DATA_DESCRIPTOR_SIGNATURE {
        4 + sizes_len
    } else {
        sizes_len
    };
    reader
        .read_exact(&mut buf[4..4 + rest])
        .with_context(context)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::{
        io::{Cursor, Write as _},
        sync::Mutex,
    };

    use clienthash_utils::hash::digest_str;
    use flate2::{write::DeflateEncoder, Compression, Crc};
    use zip::{write::SimpleFileOptions, CompressionMethod, ZipWriter};

    use super::*;

    fn build_zip_with(entries: &[(&str, &[u8])], method: CompressionMethod) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(method);
        for (name, data) in entries {
            if name.ends_with('/') {
                writer.add_directory(*name, options).unwrap();
            } else {
                writer.start_file(*name, options).unwrap();
                writer.write_all(data).unwrap();
            }
        }
        writer.finish().unwrap().into_inner()
    }

    fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
        build_zip_with(entries, CompressionMethod::Deflated)
    }

    /// Lays entries out the way streaming writers do: the local header carries no CRC or
    /// sizes and a data descriptor follows the deflated data.
    fn build_streamed_zip(entries: &[(&str, &[u8])], signed_descriptor: bool) -> Vec<u8> {
        let mut out = Vec::new();
        for (name, data) in entries {
            let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(data).unwrap();
            let compressed = encoder.finish().unwrap();
            let mut crc = Crc::new();
            crc.update(data);

            out.extend_from_slice(&LOCAL_HEADER_SIGNATURE.to_le_bytes());
            out.extend_from_slice(&20u16.to_le_bytes());
            out.extend_from_slice(&FLAG_DATA_DESCRIPTOR.to_le_bytes());
            out.extend_from_slice(&METHOD_DEFLATED.to_le_bytes());
            out.extend_from_slice(&[0u8; 4]);
            out.extend_from_slice(&[0u8; 12]);
            out.extend_from_slice(&(name.len() as u16).to_le_bytes());
            out.extend_from_slice(&0u16.to_le_bytes());
            out.extend_from_slice(name.as_bytes());
            out.extend_from_slice(&compressed);

            if signed_descriptor {
                out.extend_from_slice(&DATA_DESCRIPTOR_SIGNATURE.to_le_bytes());
            }
            out.extend_from_slice(&crc.sum().to_le_bytes());
            out.extend_from_slice(&(compressed.len() as u32).to_le_bytes());
            out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        }
        out.extend_from_slice(&CENTRAL_HEADER_SIGNATURE.to_le_bytes());
        out
    }

    #[test]
    fn test_digest_member_from_stream() {
        let bytes = build_zip(&[
            ("readme.txt", b"not this one"),
            ("app/", b""),
            ("app/version.txt", b"hello"),
            ("app/other.bin", &[0u8; 4096]),
        ]);

        let digest = digest_member_from_stream(&mut Cursor::new(&bytes), "app/version.txt")
            .unwrap();
        assert_eq!(digest, Some(digest_str("hello")));
    }

    #[test]
    fn test_stored_member() {
        let bytes = build_zip_with(
            &[("skip.bin", &[3u8; 5000]), ("version.txt", b"stored")],
            CompressionMethod::Stored,
        );
        let digest = digest_member_from_stream(&mut Cursor::new(&bytes), "version.txt").unwrap();
        assert_eq!(digest, Some(digest_str("stored")));
    }

    #[test]
    fn test_member_absent() {
        let bytes = build_zip(&[("a.txt", b"a"), ("b.txt", b"b")]);
        let digest = digest_member_from_stream(&mut Cursor::new(&bytes), "c.txt").unwrap();
        assert_eq!(digest, None);
    }

    #[test]
    fn test_directory_entry_is_not_a_member() {
        let bytes = build_zip(&[("app/", b"")]);
        let digest = digest_member_from_stream(&mut Cursor::new(&bytes), "app/").unwrap();
        assert_eq!(digest, None);
    }

    #[test]
    fn test_member_position_does_not_matter() {
        let first = build_zip(&[("version.txt", b"payload"), ("x.bin", &[7u8; 100_000])]);
        let last = build_zip(&[("x.bin", &[7u8; 100_000]), ("version.txt", b"payload")]);

        let a = digest_member_from_stream(&mut Cursor::new(&first), "version.txt").unwrap();
        let b = digest_member_from_stream(&mut Cursor::new(&last), "version.txt").unwrap();
        assert_eq!(a, b);
        assert_eq!(a, Some(digest_str("payload")));
    }

    #[test]
    fn test_empty_stream_yields_none() {
        let digest = digest_member_from_stream(&mut Cursor::new(Vec::new()), "a").unwrap();
        assert_eq!(digest, None);
    }

    #[test]
    fn test_data_descriptor_entries() {
        for signed in [true, false] {
            let bytes = build_streamed_zip(
                &[("other.txt", b"first entry"), ("version.txt", b"hello")],
                signed,
            );
            let digest =
                digest_member_from_stream(&mut Cursor::new(&bytes), "version.txt").unwrap();
            assert_eq!(digest, Some(digest_str("hello")), "signed descriptor: {signed}");
        }
    }

    #[test]
    fn test_data_descriptor_large_entries() {
        let filler: Vec<u8> = (0..300_000u32).map(|i| (i * 7 % 251) as u8).collect();
        let payload: Vec<u8> = (0..200_000u32).map(|i| (i % 13) as u8).collect();
        let bytes = build_streamed_zip(
            &[("assets/blob.bin", &filler), ("bin/app.dll", &payload)],
            false,
        );

        let digest = digest_member_from_stream(&mut Cursor::new(&bytes), "bin/app.dll").unwrap();
        let expected = digest_reader(&mut Cursor::new(&payload)).unwrap();
        assert_eq!(digest, Some(expected));

        let absent = digest_member_from_stream(&mut Cursor::new(&bytes), "missing").unwrap();
        assert_eq!(absent, None);
    }

    #[test]
    fn test_names_match_bytewise() {
        let name = "données/版本.txt";
        let bytes = build_streamed_zip(&[("a.txt", b"a"), (name, b"unicode")], true);
        let digest = digest_member_from_stream(&mut Cursor::new(&bytes), name).unwrap();
        assert_eq!(digest, Some(digest_str("unicode")));
    }

    #[test]
    fn test_truncated_entry_is_an_error() {
        let bytes = build_zip_with(&[("version.txt", &[1u8; 4096])], CompressionMethod::Stored);
        let result = digest_member_from_stream(&mut Cursor::new(&bytes[..200]), "version.txt");
        assert!(matches!(result, Err(ExtractError::InvalidArchive(_))));

        let streamed = build_streamed_zip(&[("version.txt", &[2u8; 4096])], true);
        let cut = &streamed[..streamed.len() - 10];
        assert!(digest_member_from_stream(&mut Cursor::new(cut), "version.txt").is_err());
    }

    #[test]
    fn test_truncated_signature_is_an_error() {
        let result = digest_member_from_stream(&mut Cursor::new(vec![0x50, 0x4b]), "a");
        assert!(matches!(result, Err(ExtractError::InvalidArchive(_))));
    }

    #[test]
    fn test_digest_zip_member_over_http() {
        let bytes = build_zip(&[("bin/", b""), ("bin/app.dll", b"hello")]);
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/app-v2.0.0.zip")
            .with_status(200)
            .with_body(&bytes)
            .expect(2)
            .create();

        let url = format!("{}/app-v2.0.0.zip", server.url());
        let stages = Mutex::new(Vec::new());
        let record = |stage: ExtractStage| stages.lock().unwrap().push(stage);

        let first = digest_zip_member(&url, "bin/app.dll", &record).unwrap();
        let second = digest_zip_member(&url, "bin/app.dll", &record).unwrap();

        assert_eq!(first, Some(digest_str("hello")));
        assert_eq!(first, second);
        assert_eq!(
            stages.into_inner().unwrap(),
            vec![
                ExtractStage::Downloading,
                ExtractStage::Extracting,
                ExtractStage::Downloading,
                ExtractStage::Extracting,
            ]
        );
        mock.assert();
    }

    #[test]
    fn test_digest_zip_member_http_failure() {
        let mut server = mockito::Server::new();
        let _mock = server.mock("GET", "/gone.zip").with_status(404).create();

        let url = format!("{}/gone.zip", server.url());
        let result = digest_zip_member(&url, "a", &|_| {});
        assert!(matches!(result, Err(ExtractError::Download(_))));
    }
}
