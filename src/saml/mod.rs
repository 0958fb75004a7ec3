//! SAML realm core.
//!
//! Advanced protocol options and their form validation, group authorities
//! with regex rewriting, assertion condition checks, and principal
//! derivation.

pub mod advanced;
pub mod assertion;
pub mod authn_request;
pub mod authority;
pub mod config;
pub mod error;
pub mod mapper;
pub mod principal;
pub mod realm;
pub mod validation;

pub use advanced::{AdvancedConfiguration, AdvancedConfigurationJson};
pub use assertion::{AssertionValidator, ParsedAssertion};
pub use authn_request::AuthnRequest;
pub use authority::{Authority, GroupAuthority};
pub use config::{SamlConfig, SamlConfigJson};
pub use error::{AssertionError, ValidationErrorKind};
pub use mapper::GroupRegexMapper;
pub use principal::SamlPrincipal;
pub use realm::SamlRealm;
pub use validation::{
    AdvancedConfigurationDescriptor, DependentFieldCheck, Descriptor, FieldCheck, FieldValidator,
    FormValidation,
};
