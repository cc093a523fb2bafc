//! # panel-auth
//!
//! Authorization primitives shared by the panel services.
//!
//! ## Components
//!
//! - **Scopes:** Permission tags and per-request effective scope sets.
//! - **Tokens:** Bearer token claims and JWT validation.
//! - **Service token:** The cached credential this process uses towards the
//!   authorization server.
//! - **SFTP:** Password-grant validation of SFTP logins, binding each login to
//!   a single server.

pub mod clock;
pub mod config;
pub mod scope;
pub mod service_token;
pub mod sftp;
pub mod token;

pub use crate::clock::{Clock, ManualClock, SystemClock};
pub use crate::config::AuthServerConfig;
pub use crate::scope::{Scope, ScopeSet};
pub use crate::service_token::{ServiceTokenCache, ServiceTokenError};
pub use crate::sftp::{SftpAuthError, SftpAuthorization, SftpGrant};
pub use crate::token::{JwtTokenParser, TokenClaims, TokenError, TokenParser};
