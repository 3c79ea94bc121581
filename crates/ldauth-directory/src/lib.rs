//! Directory authentication for ldauth
//!
//! Validates end-user credentials against an LDAP directory with a
//! three-step protocol: bind as a service account, search the subtree for
//! the user's DN, then rebind the same connection as that DN with the
//! user's password. The directory server itself is the only judge of the
//! password; no local comparison ever happens.

mod client;
mod flow;
mod link;
mod types;

pub use client::{LdapAuthenticator, LdapConnector, LdapLink, LdapSettings};
pub use flow::{authenticate_via_directory, user_filter};
pub use link::{DirectoryConnector, DirectoryLink, UserAuthenticator};
pub use types::*;
