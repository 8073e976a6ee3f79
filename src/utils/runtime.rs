use anyhow::Result;

/// Everything in timeflow runs on one cooperative thread: store calls, the api latency and
/// the timer's frame task.
pub fn single_thread_runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}
