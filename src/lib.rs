//! OAuth 2.0 Authorization Code + PKCE handshake against a marketplace seller API—build the
//! authorize URL, validate the redirect, exchange the code, and fetch the seller profile.
//!
//! The crate is a library: route wiring and HTML rendering are the caller's concern. The
//! [`flows::Handshake`] coordinator hands back plain data objects ([`session::PendingAuthAttempt`],
//! [`flows::SessionOutcome`]) for a presentation layer to consume.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod config;
pub mod error;
pub mod flows;
pub mod http;
pub mod pkce;
pub mod session;
pub mod token;

mod _prelude {
	pub use std::{
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		sync::Arc,
	};

	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _, tokio as _};
