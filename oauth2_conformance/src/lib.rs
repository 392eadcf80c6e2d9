//! oauth2_conformance - Scripted user agent for OAuth2 Authorization Code grant servers
//!
//! This crate drives an authorization server through the
//! authorize → login → consent → redirect → token sequence with one
//! cookie-bearing session per test user, and reports whether codes, tokens,
//! scopes and error responses follow the grant's contract.

mod config;
mod flow;
mod session;
mod suite;
mod utils;

pub use config::{OAuthProperties, ServerProperties};

pub use flow::{
    AccessTokenDetails, AccessTokenFetcher, AccessTokenResponse, AccountDirectory,
    AuthorizationCodeDetails, AuthorizationCodeFlow, AuthorizationCodeTokenFetcher,
    AuthorizationOptions, AuthorizeParam, AuthorizeQuery, Client, ClientRegistry,
    ConformanceError, ConsentStrategy, FlowCapabilities, FlowResponse, FlowState,
    FormConsentStrategy, FormLoginStrategy, LoginStrategy, ProtocolError, RegisteredUser,
    TokenExchange, UserAccount, extract_authorization_code, extract_error, extract_scopes,
    follow_redirect, verify_scopes,
};

pub use session::{RedirectMode, Session, SessionConfig, SessionError, SessionStore};

pub use suite::{Check, CheckOutcome, ConformanceSuite, SuiteReport};

pub use utils::{UtilError, gen_random_string};
