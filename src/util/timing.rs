use std::future::Future;
use std::time::Instant;
use tracing::debug;

/// Run one remote round trip and log how long it took.
///
/// Only successful calls are logged; errors travel back to the caller
/// untouched.
pub async fn timed<F, T, E>(operation: &str, key: &str, future: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
{
    let start = Instant::now();
    let result = future.await;
    if result.is_ok() {
        let dur = start.elapsed();
        debug!("{} | key={}, took={}", operation, key, dur.as_millis());
    }
    result
}
