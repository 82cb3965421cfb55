//! Command-line interface definitions for Briefit.
//!
//! Every credential can be given as a flag or an environment variable (a
//! `.env` file is loaded first when present).

use crate::api;
use crate::outputs::email;
use clap::Parser;

/// Command-line arguments for the Briefit weekly digest.
///
/// # Examples
///
/// ```sh
/// # Collect, summarize and email the digest
/// briefit
///
/// # Print the digest instead of sending it
/// briefit --dry-run
///
/// # Only check the email configuration
/// briefit --test-email me@example.com
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML file with per-source settings
    #[arg(short, long)]
    pub config: Option<String>,

    /// OpenAI API key (without it the digest is a plain listing)
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// Chat model used for the summary
    #[arg(long, env = "OPENAI_MODEL", default_value = api::DEFAULT_MODEL)]
    pub openai_model: String,

    /// Chat-completions endpoint
    #[arg(long, env = "OPENAI_ENDPOINT", default_value = api::DEFAULT_ENDPOINT)]
    pub openai_endpoint: String,

    /// Resend API key
    #[arg(long, env = "RESEND_API_KEY", hide_env_values = true)]
    pub resend_api_key: Option<String>,

    /// Sender address
    #[arg(long, env = "EMAIL_FROM", default_value = email::DEFAULT_FROM)]
    pub email_from: String,

    /// Comma separated recipient addresses
    #[arg(long, env = "EMAIL_TO", default_value = "")]
    pub email_to: String,

    /// Medium `sid` cookie for member-only listings
    #[arg(long, env = "MEDIUM_SESSION_ID", hide_env_values = true)]
    pub medium_session_id: Option<String>,

    /// Print the digest instead of emailing it
    #[arg(long)]
    pub dry_run: bool,

    /// Only send a configuration test email, to ADDR or the first recipient
    #[arg(long, value_name = "ADDR", num_args = 0..=1, default_missing_value = "")]
    pub test_email: Option<String>,
}
