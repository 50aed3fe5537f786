use crate::ProviderError;
use std::time::Duration;

const PER_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_ATTEMPTS: u32 = 3;
const BACKOFF: Duration = Duration::from_secs(2);

/// GET `url` with a per-attempt timeout, retrying up to `MAX_ATTEMPTS` times
/// with a fixed backoff. Exhaustion yields a structured error, never an
/// exception propagated to the caller.
pub async fn fetch_with_retry(http: &reqwest::Client, url: &str) -> Result<String, ProviderError> {
    let mut last_err = String::new();

    for attempt in 1..=MAX_ATTEMPTS {
        let result = http.get(url).timeout(PER_ATTEMPT_TIMEOUT).send().await;
        match result {
            Ok(resp) => match resp.error_for_status() {
                Ok(resp) => match resp.text().await {
                    Ok(body) => return Ok(body),
                    Err(e) => last_err = e.to_string(),
                },
                Err(e) => last_err = e.to_string(),
            },
            Err(e) => last_err = e.to_string(),
        }

        if attempt < MAX_ATTEMPTS {
            tokio::time::sleep(BACKOFF).await;
        }
    }

    Err(ProviderError::Transport(format!(
        "exhausted {MAX_ATTEMPTS} attempts against {url}: {last_err}"
    )))
}
