//! SP-initiated AuthnRequest for the HTTP-Redirect binding.

use anyhow::{anyhow, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::Utc;
use tracing::debug;

use super::config::SamlConfig;

/// Authentication context comparison used for the requested class.
const AUTHN_CONTEXT_COMPARISON: &str = "exact";

/// An AuthnRequest ready to be sent to the IdP.
#[derive(Debug, Clone)]
pub struct AuthnRequest {
    /// Request ID (echoed by the IdP as InResponseTo).
    pub id: String,
    /// Request XML.
    pub xml: String,
}

impl AuthnRequest {
    /// Build an AuthnRequest honoring the advanced options.
    pub fn build(config: &SamlConfig) -> Result<Self> {
        let idp_sso_url = config
            .idp_sso_url
            .as_ref()
            .ok_or_else(|| anyhow!("IdP SSO URL not configured"))?;

        let id = format!("_id{}", uuid::Uuid::new_v4());
        let issue_instant = Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();
        let advanced = config.advanced.as_ref();

        let force_authn = if advanced.is_some_and(|a| a.force_authn()) {
            "\n                ForceAuthn=\"true\""
        } else {
            ""
        };

        let requested_context = advanced
            .and_then(|a| a.authn_context_class_ref())
            .map(|class_ref| {
                format!(
                    r#"
                <samlp:RequestedAuthnContext Comparison="{}">
                    <saml:AuthnContextClassRef>{}</saml:AuthnContextClassRef>
                </samlp:RequestedAuthnContext>"#,
                    AUTHN_CONTEXT_COMPARISON,
                    xml_escape(class_ref)
                )
            })
            .unwrap_or_default();

        let xml = format!(
            r#"<samlp:AuthnRequest xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol"
                xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion"
                ID="{}"
                Version="2.0"
                IssueInstant="{}"
                Destination="{}"
                AssertionConsumerServiceURL="{}"{}>
                <saml:Issuer>{}</saml:Issuer>{}
            </samlp:AuthnRequest>"#,
            id,
            issue_instant,
            xml_escape(idp_sso_url),
            xml_escape(&config.acs_url),
            force_authn,
            xml_escape(config.sp_entity_id()),
            requested_context
        );

        Ok(Self { id, xml })
    }

    /// Redirect URL carrying the deflated, encoded request.
    pub fn redirect_url(&self, config: &SamlConfig, relay_state: Option<&str>) -> Result<String> {
        let idp_sso_url = config
            .idp_sso_url
            .as_ref()
            .ok_or_else(|| anyhow!("IdP SSO URL not configured"))?;

        let encoded = deflate_and_encode(&self.xml)?;

        let mut url = format!(
            "{}{}SAMLRequest={}",
            idp_sso_url,
            if idp_sso_url.contains('?') { "&" } else { "?" },
            urlencoding::encode(&encoded)
        );

        if let Some(state) = relay_state {
            url.push_str(&format!("&RelayState={}", urlencoding::encode(state)));
        }

        debug!(request_id = %self.id, url = %url, "Created SAML AuthnRequest redirect");
        Ok(url)
    }
}

/// Deflate and base64 encode for SAML redirect binding.
fn deflate_and_encode(xml: &str) -> Result<String> {
    use std::io::Write;

    let mut encoder =
        flate2::write::DeflateEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(xml.as_bytes())?;
    let compressed = encoder.finish()?;
    Ok(BASE64.encode(compressed))
}

fn xml_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
