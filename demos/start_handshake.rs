//! Walks through starting an Authorization Code + PKCE attempt against the marketplace
//! and validating a simulated redirect, without any network traffic.
//!
//! Run with the client id in the environment: `API_KEY=your-key cargo run --example
//! start_handshake`.

// crates.io
use color_eyre::Result;
// self
use pkce_handshake::{config::ClientConfig, flows::Handshake, session::CallbackQuery};

fn main() -> Result<()> {
	color_eyre::install()?;

	let config = ClientConfig::from_env()?;
	let handshake = Handshake::new(config)?;
	let attempt = handshake.start_authorization();

	println!("Send your user to {}.", &attempt.authorize_url);
	println!(
		"PKCE challenge ({:?}): {}.",
		attempt.code_challenge_method(),
		attempt.code_challenge()
	);

	// Simulate the provider redirecting back with the state it was given.
	let callback = CallbackQuery { code: "demo-code".into(), state: attempt.state.clone() };

	attempt.validate_state(&callback.state)?;
	println!("State validated; pass this attempt to Handshake::run_callback in your redirect route.");

	Ok(())
}
