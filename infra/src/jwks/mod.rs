//! Identity provider key sets
//!
//! [`JwksFetcher`] loads a provider's published JWKS document over HTTP and
//! keeps it in a [`KeySetCache`](tg_core::KeySetCache) so repeated lookups
//! within the TTL never reach the provider.

mod fetcher;

pub use fetcher::{JwksError, JwksFetcher, JwksFetcherConfig};
