//! Test fixtures for release payloads, archives and checksum manifests
//!
//! These builders produce exactly what the release provider would serve, so
//! tests can drive the updater end to end against a mock HTTP server.

use serde_json::{Value, json};
use sha2::{Digest, Sha256};
use std::io::{Cursor, Write};

/// A file to place inside a test archive.
#[derive(Clone, Debug)]
pub struct ArchiveEntry {
    pub path: String,
    pub contents: Vec<u8>,
    pub mode: u32,
}

impl ArchiveEntry {
    /// Executable file (`0o755`)
    pub fn executable(path: &str, contents: &[u8]) -> Self {
        Self {
            path: path.to_string(),
            contents: contents.to_vec(),
            mode: 0o755,
        }
    }

    /// Regular file (`0o644`)
    pub fn file(path: &str, contents: &[u8]) -> Self {
        Self {
            path: path.to_string(),
            contents: contents.to_vec(),
            mode: 0o644,
        }
    }
}

/// Build a gzip-compressed tarball in memory.
pub fn tar_gz(entries: &[ArchiveEntry]) -> Vec<u8> {
    let encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for entry in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(entry.contents.len() as u64);
        header.set_mode(entry.mode);
        header.set_entry_type(tar::EntryType::Regular);
        builder
            .append_data(&mut header, &entry.path, entry.contents.as_slice())
            .expect("append tar entry");
    }
    let encoder = builder.into_inner().expect("finish tar");
    encoder.finish().expect("finish gzip")
}

/// Build a zip archive in memory.
pub fn zip(entries: &[ArchiveEntry]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for entry in entries {
        let options = zip::write::SimpleFileOptions::default().unix_permissions(entry.mode);
        writer.start_file(entry.path.as_str(), options).expect("start zip entry");
        writer.write_all(&entry.contents).expect("write zip entry");
    }
    writer.finish().expect("finish zip").into_inner()
}

/// Lowercase hex SHA-256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// `checksums.txt` content covering each `(file name, contents)` pair.
pub fn checksum_manifest(files: &[(&str, &[u8])]) -> String {
    let mut manifest = String::from("# SHA-256 checksums\n");
    for (name, contents) in files {
        manifest.push_str(&format!("{}  {}\n", sha256_hex(contents), name));
    }
    manifest
}

/// Builder for provider release JSON.
#[derive(Clone, Debug)]
pub struct ReleaseFixture {
    tag_name: String,
    name: String,
    prerelease: bool,
    draft: bool,
    published_at: Option<String>,
    assets: Vec<(String, String)>,
}

impl ReleaseFixture {
    /// Tagged stable release
    pub fn stable(tag: &str) -> Self {
        Self {
            tag_name: tag.to_string(),
            name: tag.to_string(),
            prerelease: false,
            draft: false,
            published_at: Some("2026-01-01T00:00:00Z".to_string()),
            assets: Vec::new(),
        }
    }

    /// Dev pre-release; `build` is the display name, e.g. `dev-11-20260215-bbbbbbb`
    pub fn dev(build: &str) -> Self {
        Self {
            tag_name: "dev".to_string(),
            name: build.to_string(),
            prerelease: true,
            draft: false,
            published_at: Some("2026-01-01T00:00:00Z".to_string()),
            assets: Vec::new(),
        }
    }

    pub fn published(mut self, timestamp: &str) -> Self {
        self.published_at = Some(timestamp.to_string());
        self
    }

    pub fn unpublished(mut self) -> Self {
        self.published_at = None;
        self
    }

    pub fn draft(mut self) -> Self {
        self.draft = true;
        self
    }

    pub fn asset(mut self, name: &str, url: &str) -> Self {
        self.assets.push((name.to_string(), url.to_string()));
        self
    }

    pub fn to_json(&self) -> Value {
        let assets: Vec<Value> = self
            .assets
            .iter()
            .map(|(name, url)| json!({ "name": name, "browser_download_url": url }))
            .collect();
        json!({
            "tag_name": self.tag_name,
            "name": self.name,
            "prerelease": self.prerelease,
            "draft": self.draft,
            "published_at": self.published_at,
            "assets": assets,
        })
    }
}
