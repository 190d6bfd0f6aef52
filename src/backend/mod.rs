//! The contract with the search backend.
//!
//! The backend is reached through a [`Transport`], which the embedding application supplies
//! (an XHR/fetch wrapper in a browser, an HTTP client elsewhere). This module builds the
//! [`Request`] for each endpoint and decodes the JSON that comes back. All three failure modes
//! (the transport failing, the backend replying with `{"error": ...}`, and a reply that can't be
//! parsed) come back as an [`Error`][crate::Error] the caller can show to the user; nothing is
//! retried.

mod client;
mod request;
mod response;

pub use self::client::*;
pub use self::request::*;
pub use self::response::*;

use crate::error::Result;

/// Delivers requests to the backend.
///
/// Implementations return the raw response body on success. Anything that keeps a response from
/// arriving (connection failures, non-success HTTP statuses) should be reported as
/// [`Error::NetworkFailure`][crate::Error::NetworkFailure].
pub trait Transport {
    fn send(&self, request: &Request) -> Result<String>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send(&self, request: &Request) -> Result<String> {
        (**self).send(request)
    }
}
