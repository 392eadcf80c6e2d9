mod errors;
mod executor;
mod extract;
mod query;
mod redirect;
mod scope;
mod strategy;
mod token;
mod types;
mod user;

pub use errors::ConformanceError;
pub use executor::{AuthorizationCodeFlow, FlowState};
pub use extract::{extract_authorization_code, extract_error, extract_scopes};
pub use query::{AuthorizeParam, AuthorizeQuery};
pub use redirect::follow_redirect;
pub use scope::verify_scopes;
pub use strategy::{
    AccountDirectory, ClientRegistry, ConsentStrategy, FlowCapabilities, FormConsentStrategy,
    FormLoginStrategy, LoginStrategy,
};
pub use token::{AccessTokenFetcher, AuthorizationCodeTokenFetcher};
pub use types::{
    AccessTokenDetails, AccessTokenResponse, AuthorizationCodeDetails, AuthorizationOptions,
    Client, FlowResponse, ProtocolError, TokenExchange, UserAccount,
};
pub use user::RegisteredUser;
