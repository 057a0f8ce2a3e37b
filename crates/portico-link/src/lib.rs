//! # portico-link
//!
//! Client driver for the portico gateway. Speaks the same protocol as the
//! server, symmetrically: requests are serialized with the configured
//! translator (textual or binary), POSTed to the gateway, and the paired
//! response is decoded from the body. Result sets page transparently
//! through `fetch` as the client iterates.
//!
//! ## Example
//!
//! ```rust,no_run
//! use portico_link::GatewayClient;
//!
//! # async fn example() -> portico_link::Result<()> {
//! let client = GatewayClient::builder()
//!     .base_url("http://localhost:8765")
//!     .build()?;
//!
//! let mut conn = client.connect().await?;
//! let mut stmt = conn.create_statement().await?;
//! if let portico_link::StatementResult::ResultSet(mut rs) =
//!     stmt.execute_sql("select * from emp").await?
//! {
//!     while let Some(row) = rs.next().await? {
//!         println!("{:?}", row);
//!     }
//! }
//! conn.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod connection;
pub mod error;

pub use client::{GatewayClient, GatewayClientBuilder, Serialization};
pub use connection::{RemoteConnection, RemoteResultSet, RemoteStatement, StatementResult};
pub use error::{LinkError, Result};
