use crate::prelude::*;
use std::panic::AssertUnwindSafe;

/// Fixed-size pool running analysis jobs off the caller's thread.
pub struct WorkerPool {
	threads: rayon::ThreadPool,
}
impl WorkerPool {
	pub fn new(threads: usize) -> Result<Self, Error> {
		let threads = rayon::ThreadPoolBuilder::new()
			.num_threads(threads.max(1))
			.thread_name(|i| format!("screenwatch-worker-{i}"))
			.panic_handler(|panic| log::error!("Worker thread panicked: {}", panic_message(&*panic)))
			.build()
			.map_err(|err| Error::Config(format!("failed to start worker pool: {err}").into_boxed_str()))?;

		log::info!("Started {} analysis workers", threads.current_num_threads());

		Ok(WorkerPool { threads })
	}

	#[inline]
	pub fn size(&self) -> usize {
		self.threads.current_num_threads()
	}

	/// Queues `job` and returns a handle to its result. A job that panics resolves to [`Error::WorkerLost`].
	pub fn submit<T, F>(&self, job: F) -> Pending<T>
	where
		T: Send + 'static,
		F: FnOnce() -> Result<T, Error> + Send + 'static,
	{
		let (tx, rx) = crossbeam::bounded(1);
		self.threads.spawn(move || {
			let result = std::panic::catch_unwind(AssertUnwindSafe(job)).unwrap_or_else(|panic| Err(Error::WorkerLost(panic_message(&*panic).into())));
			tx.send(result).ok();
		});
		Pending(rx)
	}
}

/// The result of a job that may not have finished yet.
#[must_use]
pub struct Pending<T>(crossbeam::Receiver<Result<T, Error>>);
impl<T> Pending<T> {
	/// Blocks until the job has finished.
	pub fn wait(self) -> Result<T, Error> {
		self.0.recv().unwrap_or_else(|_| Err(Error::WorkerLost("job was dropped before it finished".into())))
	}
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
	if let Some(msg) = panic.downcast_ref::<&'static str>() {
		msg.to_string()
	} else if let Some(msg) = panic.downcast_ref::<String>() {
		msg.clone()
	} else {
		"unknown panic".to_string()
	}
}

#[test]
fn test_submit_and_wait() {
	let pool = WorkerPool::new(2).unwrap();
	assert_eq!(pool.size(), 2);

	let pending = (0..8u32).map(|i| pool.submit(move || Ok(i * i))).collect::<Vec<_>>();
	let results = pending.into_iter().map(|pending| pending.wait().unwrap()).collect::<Vec<_>>();
	assert_eq!(results, [0, 1, 4, 9, 16, 25, 36, 49]);
}

#[test]
fn test_errors_pass_through() {
	let pool = WorkerPool::new(1).unwrap();
	let result = pool.submit(|| Err::<(), _>(Error::MissingInput("nope.png".into()))).wait();
	assert!(matches!(result, Err(Error::MissingInput(_))));
}

#[test]
fn test_panicking_job_is_lost() {
	let pool = WorkerPool::new(1).unwrap();
	let result = pool.submit(|| -> Result<(), Error> { panic!("detector exploded") }).wait();
	match result {
		Err(Error::WorkerLost(msg)) => assert_eq!(&*msg, "detector exploded"),
		_ => panic!("expected WorkerLost"),
	}

	// the worker survives
	assert_eq!(pool.submit(|| Ok(1)).wait().unwrap(), 1);
}
