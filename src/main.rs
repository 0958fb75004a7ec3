//! SAML realm command line tool
//!
//! Loads a realm configuration, reports advanced-option field errors the way
//! a configuration form would, and optionally authenticates a decoded
//! assertion or prints the IdP login redirect.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use saml_realm::saml::{
    AdvancedConfigurationDescriptor, Descriptor, FieldValidator, ParsedAssertion, SamlConfig,
    SamlConfigJson, SamlRealm,
};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "saml-realm")]
#[command(about = "Validate SAML realm configuration and derive principals from assertions")]
struct Args {
    /// Path to the realm configuration (JSON)
    #[arg(long, env = "SAML_REALM_CONFIG")]
    config: PathBuf,

    /// Decoded assertion (JSON) to authenticate
    #[arg(long)]
    assertion: Option<PathBuf>,

    /// Print the IdP login redirect URL
    #[arg(long)]
    login: bool,

    /// RelayState to attach to the login redirect
    #[arg(long)]
    relay_state: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, env = "SAML_REALM_VERBOSE")]
    verbose: bool,
}

/// Read a realm configuration file, returning the raw form and the merged config.
fn load_config(path: &Path) -> Result<(SamlConfigJson, SamlConfig)> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read SAML config: {:?}", path))?;
    let json: SamlConfigJson =
        serde_json::from_str(&text).context("Failed to parse SAML config")?;

    let mut config = SamlConfig::default();
    json.apply_to(&mut config);
    Ok((json, config))
}

/// Log every advanced-option field that a form would flag. Returns the count.
fn report_field_errors(json: &SamlConfigJson) -> usize {
    let Some(ref form) = json.advanced else {
        return 0;
    };

    let section = AdvancedConfigurationDescriptor.display_name();
    let errors = FieldValidator::check_form(form);
    for (field, kind) in &errors {
        warn!(section = %section, field = %field, code = kind.code(), "{}", kind.message());
    }
    errors.len()
}

fn load_assertion(path: &Path) -> Result<ParsedAssertion> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read assertion: {:?}", path))?;
    serde_json::from_str(&text).context("Failed to parse assertion")
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize tracing
    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(format!("{}={}", env!("CARGO_CRATE_NAME"), log_level))
        .with_writer(std::io::stderr)
        .json()
        .init();

    let (json, config) = load_config(&args.config)?;

    let field_errors = report_field_errors(&json);
    if field_errors > 0 {
        return Err(anyhow!("{} invalid advanced configuration field(s)", field_errors));
    }

    info!(
        enabled = config.enabled,
        sp_entity_id = %config.sp_entity_id(),
        advanced = %config
            .advanced
            .as_ref()
            .map(|a| a.to_string())
            .unwrap_or_else(|| "none".to_string()),
        "Configuration loaded"
    );

    let realm = SamlRealm::new(config)?;

    if args.login {
        let url = realm.login_redirect(args.relay_state.as_deref())?;
        println!("{}", url);
    }

    if let Some(ref path) = args.assertion {
        let assertion = load_assertion(path)?;
        debug!(assertion_id = %assertion.id, "Assertion loaded");
        let principal = realm.authenticate(&assertion)?;
        println!(
            "{}",
            serde_json::to_string_pretty(&principal).context("Failed to serialize principal")?
        );
    }

    Ok(())
}
