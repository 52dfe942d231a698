use crate::{tsv, OcrEngine, OcrError, OcrOptions, OcrResult};
use std::{
	io::Read,
	process::{Command, Stdio},
};
use sw_util::*;
use wait_timeout::ChildExt;

/// The `tesseract` command line program.
#[derive(Debug, Clone)]
pub struct TesseractCli {
	binary: PathBuf,
	language: Option<String>,
}
impl TesseractCli {
	/// Finds `tesseract` on the `PATH`.
	pub fn locate() -> Result<Self, OcrError> {
		let binary = which::which("tesseract").map_err(|_| OcrError::NotInstalled)?;
		log::info!("Using tesseract at {}", binary.display());
		Ok(Self::with_binary(binary))
	}

	pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
		Self {
			binary: binary.into(),
			language: None,
		}
	}

	pub fn language(mut self, language: impl Into<String>) -> Self {
		self.language = Some(language.into());
		self
	}

	fn command(&self, image: &Path, options: &OcrOptions) -> Command {
		let mut cmd = Command::new(&self.binary);
		cmd.arg(image).arg("stdout");
		if let Some(language) = &self.language {
			cmd.arg("-l").arg(language);
		}
		if let Some(dpi) = options.dpi {
			cmd.arg("--dpi").arg(dpi.to_string());
		}
		cmd.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());
		cmd
	}
}
impl OcrEngine for TesseractCli {
	fn recognise(&self, image: &Path, options: &OcrOptions) -> Result<OcrResult, OcrError> {
		let mut cmd = self.command(image, options);
		cmd.arg("tsv");
		let stdout = run(cmd, options.timeout)?;
		tsv::parse(&stdout)
	}

	fn recognise_text(&self, image: &Path, options: &OcrOptions) -> Result<String, OcrError> {
		run(self.command(image, options), options.timeout)
	}
}

fn run(mut cmd: Command, timeout: Duration) -> Result<String, OcrError> {
	let mut child = cmd.spawn().map_err(|err| match err.kind() {
		std::io::ErrorKind::NotFound => OcrError::NotInstalled,
		_ => OcrError::Spawn(err),
	})?;

	// Drain both pipes while we wait, otherwise a chatty child blocks on a full pipe
	let stdout = drain(child.stdout.take());
	let stderr = drain(child.stderr.take());

	let status = match child.wait_timeout(timeout)? {
		Some(status) => status,
		None => {
			let _ = child.kill();
			let _ = child.wait();
			return Err(OcrError::Timeout(timeout));
		}
	};

	let stdout = stdout.join().unwrap_or_else(|_| Ok(String::new()))?;
	let stderr = stderr.join().unwrap_or_else(|_| Ok(String::new()))?;

	if !status.success() {
		return Err(OcrError::Failed {
			status,
			stderr: stderr.trim().to_owned().into_boxed_str(),
		});
	}

	Ok(stdout)
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> std::thread::JoinHandle<Result<String, std::io::Error>> {
	std::thread::spawn(move || {
		let mut buf = String::new();
		if let Some(mut pipe) = pipe {
			pipe.read_to_string(&mut buf)?;
		}
		Ok(buf)
	})
}

#[test]
fn test_missing_binary() {
	let tesseract = TesseractCli::with_binary("/nonexistent/tesseract");
	let result = tesseract.recognise(Path::new("whatever.png"), &OcrOptions::default());
	assert!(matches!(result, Err(OcrError::NotInstalled)));
}

#[cfg(unix)]
#[test]
fn test_timeout_kills_child() {
	let sleep = match which::which("sleep") {
		Ok(sleep) => sleep,
		Err(_) => {
			println!("sleep not found, skipping test");
			return;
		}
	};

	let mut cmd = Command::new(&sleep);
	cmd.arg("5").stdout(Stdio::piped()).stderr(Stdio::piped());

	let started = Instant::now();
	let result = run(cmd, Duration::from_millis(100));
	assert!(matches!(result, Err(OcrError::Timeout(_))));
	assert!(started.elapsed() < Duration::from_secs(4));
}

#[cfg(unix)]
#[test]
fn test_failed_exit_status() {
	let sh = match which::which("sh") {
		Ok(sh) => sh,
		Err(_) => {
			println!("sh not found, skipping test");
			return;
		}
	};

	let mut cmd = Command::new(&sh);
	cmd.arg("-c").arg("echo broken >&2; exit 3").stdout(Stdio::piped()).stderr(Stdio::piped());

	match run(cmd, Duration::from_secs(10)) {
		Err(OcrError::Failed { stderr, .. }) => assert_eq!(&*stderr, "broken"),
		other => panic!("unexpected {other:?}"),
	}
}
