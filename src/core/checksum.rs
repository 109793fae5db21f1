//! Artifact digests (SHA-256 + SHA-512) over a single streamed download
//!
//! Both hashers are fed from the same buffer in one pass, so the two digests
//! always describe the same bytes even if the remote resource changes
//! between runs. Nothing is returned unless the whole body was read.

use crate::core::error::{ChecksumError, PostrelResult};
use sha2::{Digest, Sha256, Sha512};
use std::io::{self, Read};
use std::time::Duration;
use tracing::debug;

const BUF_SIZE: usize = 64 * 1024;

/// Hex-encoded SHA-256 and SHA-512 of one byte stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumPair {
  pub sha256: String,
  pub sha512: String,
}

/// Anything that can produce the digest pair for an artifact URL
pub trait ChecksumSource {
  fn checksums(&self, url: &str) -> PostrelResult<ChecksumPair>;
}

/// Hash a reader to completion with both algorithms in one pass
pub fn checksum_reader<R: Read>(mut reader: R) -> io::Result<ChecksumPair> {
  let mut sha256 = Sha256::new();
  let mut sha512 = Sha512::new();
  let mut buf = vec![0u8; BUF_SIZE];

  loop {
    let n = match reader.read(&mut buf) {
      Ok(0) => break,
      Ok(n) => n,
      Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
      Err(e) => return Err(e),
    };
    sha256.update(&buf[..n]);
    sha512.update(&buf[..n]);
  }

  Ok(ChecksumPair {
    sha256: hex::encode(sha256.finalize()),
    sha512: hex::encode(sha512.finalize()),
  })
}

/// Blocking HTTP checksum service
pub struct HttpChecksums {
  client: reqwest::blocking::Client,
}

impl HttpChecksums {
  pub fn new() -> PostrelResult<Self> {
    let client = reqwest::blocking::Client::builder()
      .user_agent(concat!("postrel/", env!("CARGO_PKG_VERSION")))
      // release tarballs outlive the blocking client's 30s default
      .timeout(None::<Duration>)
      .build()
      .map_err(|e| ChecksumError::Fetch {
        url: String::new(),
        reason: format!("failed to build HTTP client: {}", e),
      })?;
    Ok(Self { client })
  }

  /// Use a preconfigured client
  #[cfg(test)]
  pub fn with_client(client: reqwest::blocking::Client) -> Self {
    Self { client }
  }
}

impl ChecksumSource for HttpChecksums {
  fn checksums(&self, url: &str) -> PostrelResult<ChecksumPair> {
    debug!(url, "fetching artifact for checksums");

    let response = self.client.get(url).send().map_err(|e| ChecksumError::Fetch {
      url: url.to_string(),
      reason: e.to_string(),
    })?;

    let status = response.status();
    if !status.is_success() {
      return Err(
        ChecksumError::Fetch {
          url: url.to_string(),
          reason: format!("HTTP {}", status),
        }
        .into(),
      );
    }

    let pair = checksum_reader(response).map_err(|e| ChecksumError::Read {
      url: url.to_string(),
      reason: e.to_string(),
    })?;

    debug!(url, sha256 = %pair.sha256, "computed checksums");
    Ok(pair)
  }
}
