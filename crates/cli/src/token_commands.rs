use std::{path::Path, sync::Arc, time::Duration};

use {
    anyhow::Result,
    clap::Subcommand,
    quotabot_config::QuotabotConfig,
    quotabot_purespectrum::{PureSpectrumClient, StoredAuth, SurveyProvider, TokenStore},
};

#[derive(Subcommand)]
pub enum TokenAction {
    /// Save an access token to the auth file.
    Set {
        /// Token copied from the PureSpectrum web app.
        token: String,
        #[arg(long)]
        user_id: Option<String>,
        #[arg(long)]
        company_id: Option<String>,
    },
    /// Check the configured token against the PureSpectrum API.
    Check,
    /// Explain how to copy a token out of the browser.
    Help,
}

pub async fn handle_token(action: TokenAction, config: &QuotabotConfig) -> Result<()> {
    let auth_file = &config.purespectrum.auth_file;
    match action {
        TokenAction::Set {
            token,
            user_id,
            company_id,
        } => {
            save_token(auth_file, token, user_id, company_id)?;
            println!("Saved PureSpectrum token to {}", auth_file.display());
            Ok(())
        },
        TokenAction::Check => check(config).await,
        TokenAction::Help => {
            print!("{}", extraction_help(auth_file));
            Ok(())
        },
    }
}

fn save_token(
    path: &Path,
    token: String,
    user_id: Option<String>,
    company_id: Option<String>,
) -> Result<()> {
    let token = token.trim().to_string();
    anyhow::ensure!(!token.is_empty(), "token must not be empty");
    TokenStore::with_path(path.to_path_buf()).save(&StoredAuth {
        token,
        user_id,
        company_id,
    })?;
    Ok(())
}

async fn check(config: &QuotabotConfig) -> Result<()> {
    let ps = &config.purespectrum;
    let (token, source) = match ps.token.clone() {
        Some(token) => (Some(token), "config/environment".to_string()),
        None => (
            TokenStore::with_path(ps.auth_file.clone()).token(),
            ps.auth_file.display().to_string(),
        ),
    };
    let client: Arc<dyn SurveyProvider> = Arc::new(PureSpectrumClient::new(
        &ps.api_base,
        token,
        Duration::from_secs(ps.request_timeout_secs),
    )?);

    match client.check_auth().await {
        Ok(()) => {
            println!("✅ Token from {source} is valid");
            Ok(())
        },
        Err(e) => {
            println!("❌ Token from {source} was rejected: {e}");
            println!("Run `quotabot token help` for instructions on getting a new one.");
            Err(e.into())
        },
    }
}

fn extraction_help(auth_file: &Path) -> String {
    let rule = "=".repeat(80);
    let inner = "=".repeat(70);
    format!(
        "{rule}
HOW TO EXTRACT AUTH TOKEN FROM YOUR BROWSER
{rule}

1. Log in to https://platform.purespectrum.com/login in your browser

2. Press F12 to open Developer Tools

3. Go to the 'Console' tab

4. Paste this JavaScript command and press Enter:

   {inner}
   JSON.parse(localStorage.getItem('authStateStorage')).token
   {inner}

5. Copy the token (long string starting with 'eyJ...')

6. Save it with:

   quotabot token set <TOKEN> --user-id <ID> --company-id <ID>

   or write {} yourself:

   {{
     \"token\": \"PASTE_YOUR_TOKEN_HERE\",
     \"user_id\": \"26340\",
     \"company_id\": \"1853\"
   }}

{rule}
",
        auth_file.display()
    )
}
