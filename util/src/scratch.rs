use std::path::{Path, PathBuf};

/// The working directory for short-lived per-identifier artifacts.
#[derive(Clone, Debug)]
pub struct ScratchDir(PathBuf);
impl ScratchDir {
	/// Opens the directory, creating it if it does not exist yet.
	pub fn create(path: impl Into<PathBuf>) -> Result<Self, std::io::Error> {
		let path = path.into();
		if !path.is_dir() {
			std::fs::create_dir_all(&path)?;
			log::info!("Temp directory created at {}", path.display());
		}
		Ok(ScratchDir(path))
	}

	#[inline]
	pub fn path(&self) -> &Path {
		&self.0
	}

	/// Reserves `<dir>/<identifier>_<purpose>.<ext>`.
	///
	/// The file is removed when the returned guard is dropped, whether or not anything was written to it.
	pub fn file(&self, identifier: &str, purpose: &str, ext: &str) -> ScratchFile {
		ScratchFile(self.0.join(format!("{}_{purpose}.{ext}", sanitise(identifier))))
	}
}

// Identifiers are opaque, so anything that could escape the directory is flattened
fn sanitise(identifier: &str) -> String {
	identifier
		.chars()
		.map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '.' { c } else { '_' })
		.collect()
}

#[derive(Debug)]
pub struct ScratchFile(PathBuf);
impl ScratchFile {
	#[inline]
	pub fn path(&self) -> &Path {
		&self.0
	}
}
impl Drop for ScratchFile {
	fn drop(&mut self) {
		match std::fs::remove_file(&self.0) {
			Ok(()) => {},
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => {},
			Err(err) => log::warn!("Failed to remove scratch file {}: {err}", self.0.display()),
		}
	}
}

#[test]
fn test_scratch_file_removed_on_drop() {
	let dir = tempfile::tempdir().unwrap();
	let scratch = ScratchDir::create(dir.path().join("nested")).unwrap();
	assert!(scratch.path().is_dir());

	let path = {
		let file = scratch.file("device/1", "inventory", "png");
		std::fs::write(file.path(), b"x").unwrap();
		assert!(file.path().is_file());
		file.path().to_owned()
	};

	assert_eq!(path.file_name().unwrap(), "device_1_inventory.png");
	assert!(!path.exists());
}

#[test]
fn test_scratch_file_never_written() {
	let dir = tempfile::tempdir().unwrap();
	let scratch = ScratchDir::create(dir.path()).unwrap();
	drop(scratch.file("a", "b", "png"));
}
