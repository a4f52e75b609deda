use crate::common::error::FetchError;

/// Blocking HTTP access to the portal. One call is one request; implementations
/// never retry.
pub trait Fetcher {
    fn get(&self, url: &str) -> Result<Vec<u8>, FetchError>;

    /// POST `fields` as an urlencoded form.
    fn post_form(&self, url: &str, fields: &[(&str, &str)]) -> Result<Vec<u8>, FetchError>;
}

impl<F: Fetcher + ?Sized> Fetcher for &F {
    fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        (**self).get(url)
    }

    fn post_form(&self, url: &str, fields: &[(&str, &str)]) -> Result<Vec<u8>, FetchError> {
        (**self).post_form(url, fields)
    }
}

/// Street-address line standardization (Road -> Rd.).
pub trait AddressNormalizer {
    /// Returns `None` when the input degenerates to nothing usable (for example a
    /// lone "."); callers store an empty string in that case.
    fn normalize_line(&self, line: &str) -> Option<String>;
}

/// Observer for long-running crawl phases.
pub trait Progress {
    /// Called at the start with the total number of units, when known.
    fn begin(&mut self, _total: usize) {}

    /// Called when unit `done` (1-based) of the announced total completes.
    fn advance(&mut self, _done: usize) {}

    /// Called at the end, successful or not.
    fn finish(&mut self) {}
}

/// A no-op progress sink.
pub struct NullProgress;

impl Progress for NullProgress {}
