//! Unistream Client SDK.
//!
//! A typed client for the unistream HTTP API, for bots, overlays and
//! companion apps that act on behalf of a signed-in user.
//!
//! # Example
//!
//! ```no_run
//! use unistream_client::UnistreamClient;
//! use unistream_core::{GiftId, UserId};
//!
//! # async fn example(streamer: UserId) -> Result<(), unistream_client::ClientError> {
//! let client = UnistreamClient::new("http://localhost:8080")?;
//! let session = client.login("ana@ulima.edu.pe", "correct-horse").await?;
//! let client = client.with_token(session.token);
//!
//! let receipt = client.send_gift(&streamer, GiftId(4)).await?;
//! println!("{} ({} coins left)", receipt.message, receipt.coins);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod client;
mod error;
mod types;

pub use client::{ClientOptions, UnistreamClient};
pub use error::ClientError;
pub use types::*;
