//! SAML security realm core.
//!
//! Advanced SAML options with their form validators, group authorities
//! rewritten by a configurable regex, assertion condition checks and the
//! authenticated principal built from them.

pub mod saml;
