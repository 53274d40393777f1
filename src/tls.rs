//! Client certificate material and the process-wide trust-anchor set.

// std
use std::path::Path;
// self
use crate::{_prelude::*, error::StorageError};

static CERTIFICATE_AUTHORITIES: RwLock<Vec<Vec<u8>>> = RwLock::new(Vec::new());

/// Appends a PEM-encoded certificate authority to the process-wide trust set.
///
/// The accumulated set is consumed as the default trust store by every transport build; growth is
/// append-only until [`clear_cas`] resets it.
pub fn add_ca(pem: impl Into<Vec<u8>>) {
	CERTIFICATE_AUTHORITIES.write().push(pem.into());
}

/// Reads a PEM file from disk and appends it to the process-wide trust set.
pub fn add_ca_from_file(path: impl AsRef<Path>) -> Result<()> {
	let path = path.as_ref();
	let pem = read_material(path)?;

	add_ca(pem);

	Ok(())
}

/// Removes every accumulated trust anchor.
pub fn clear_cas() {
	CERTIFICATE_AUTHORITIES.write().clear();
}

/// Number of trust anchors currently accumulated.
pub fn ca_count() -> usize {
	CERTIFICATE_AUTHORITIES.read().len()
}

/// Snapshot of the accumulated trust anchors for a single transport build.
pub(crate) fn ca_pems() -> Vec<Vec<u8>> {
	CERTIFICATE_AUTHORITIES.read().clone()
}

/// Client certificate material handed opaquely to the transport layer.
#[derive(Clone)]
pub enum ClientIdentity {
	/// PEM certificate plus its private key.
	Pem {
		/// PEM-encoded certificate (or chain).
		certificate: Vec<u8>,
		/// PEM-encoded private key.
		key: Vec<u8>,
	},
	/// PKCS#12 archive bundling certificate and key.
	Pkcs12 {
		/// DER-encoded PKCS#12 archive.
		archive: Vec<u8>,
	},
}
impl ClientIdentity {
	/// Wraps in-memory PEM certificate and key material.
	pub fn from_pem(certificate: impl Into<Vec<u8>>, key: impl Into<Vec<u8>>) -> Self {
		Self::Pem { certificate: certificate.into(), key: key.into() }
	}

	/// Wraps an in-memory PKCS#12 archive.
	pub fn from_pkcs12(archive: impl Into<Vec<u8>>) -> Self {
		Self::Pkcs12 { archive: archive.into() }
	}

	/// Reads PEM certificate and key files from disk.
	pub fn from_pem_files(
		certificate_path: impl AsRef<Path>,
		key_path: impl AsRef<Path>,
	) -> Result<Self> {
		let certificate = read_material(certificate_path.as_ref())?;
		let key = read_material(key_path.as_ref())?;

		Ok(Self::Pem { certificate, key })
	}

	/// Reads a PKCS#12 archive from disk.
	pub fn from_pkcs12_file(path: impl AsRef<Path>) -> Result<Self> {
		Ok(Self::Pkcs12 { archive: read_material(path.as_ref())? })
	}

	/// Fails fast when the wrapped material is empty, with a distinct error per part.
	pub(crate) fn validate(&self) -> Result<()> {
		match self {
			Self::Pem { certificate, key } => {
				if certificate.is_empty() {
					return Err(crate::error::ValidationError::MissingCertificate.into());
				}
				if key.is_empty() {
					return Err(crate::error::ValidationError::MissingCertificateKey.into());
				}
			},
			Self::Pkcs12 { archive } =>
				if archive.is_empty() {
					return Err(crate::error::ValidationError::MissingCertificate.into());
				},
		}

		Ok(())
	}
}
impl Debug for ClientIdentity {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Pem { .. } => f.debug_struct("ClientIdentity::Pem").finish_non_exhaustive(),
			Self::Pkcs12 { .. } =>
				f.debug_struct("ClientIdentity::Pkcs12").finish_non_exhaustive(),
		}
	}
}

/// Client certificate material plus its passphrase, pinned into one transport build.
///
/// Certificate and A2A flows carry a context so the identity and the accumulated trust anchors
/// apply to that call only, leaving the default transport untouched.
#[derive(Clone, Debug)]
pub struct TransportContext {
	identity: ClientIdentity,
	passphrase: String,
}
impl TransportContext {
	/// Pins `identity` and its passphrase for a flow's transport.
	pub fn new(identity: ClientIdentity, passphrase: impl Into<String>) -> Self {
		Self { identity, passphrase: passphrase.into() }
	}

	pub(crate) fn identity(&self) -> &ClientIdentity {
		&self.identity
	}

	pub(crate) fn passphrase(&self) -> &str {
		&self.passphrase
	}
}

fn read_material(path: &Path) -> Result<Vec<u8>> {
	std::fs::read(path)
		.map_err(|e| {
			StorageError::Backend { message: format!("Failed to read {}: {e}", path.display()) }
				.into()
		})
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::error::{Error, ValidationError};

	#[test]
	fn identity_validation_distinguishes_missing_parts() {
		let no_cert = ClientIdentity::from_pem(Vec::new(), b"key".to_vec());
		let no_key = ClientIdentity::from_pem(b"cert".to_vec(), Vec::new());
		let no_archive = ClientIdentity::from_pkcs12(Vec::new());

		assert!(matches!(
			no_cert.validate(),
			Err(Error::Validation(ValidationError::MissingCertificate))
		));
		assert!(matches!(
			no_key.validate(),
			Err(Error::Validation(ValidationError::MissingCertificateKey))
		));
		assert!(matches!(
			no_archive.validate(),
			Err(Error::Validation(ValidationError::MissingCertificate))
		));

		ClientIdentity::from_pem(b"cert".to_vec(), b"key".to_vec())
			.validate()
			.expect("Populated PEM identity should validate.");
	}

	#[test]
	fn identity_debug_redacts_material() {
		let identity = ClientIdentity::from_pem(b"cert".to_vec(), b"key".to_vec());
		let rendered = format!("{identity:?}");

		assert!(!rendered.contains("cert"));
		assert!(!rendered.contains("key"));
	}
}
