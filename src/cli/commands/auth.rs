use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::{output_json, output_success, resolve_password};
use crate::cli::OutputFormat;
use crate::client::{peek_access_claims, ApiClient};

#[derive(Subcommand)]
pub enum AuthCommands {
    #[command(about = "Register a new account")]
    Register {
        #[arg(help = "Username")]
        username: String,
        #[arg(help = "Email address")]
        email: String,
        #[arg(long, help = "First name")]
        first_name: String,
        #[arg(long, help = "Last name")]
        last_name: String,
        #[arg(long, help = "Password (will prompt if not provided)")]
        password: Option<String>,
    },

    #[command(about = "Log in and store session credentials")]
    Login {
        #[arg(help = "Username")]
        username: String,
        #[arg(long, help = "Password (will prompt if not provided)")]
        password: Option<String>,
    },

    #[command(about = "Log out and clear stored credentials")]
    Logout,

    #[command(about = "Show current authentication status")]
    Status,

    #[command(about = "Show the current user profile")]
    Whoami,

    #[command(about = "Exchange the refresh token for a new access token")]
    Refresh,
}

pub async fn handle(
    cmd: AuthCommands,
    client: &ApiClient,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    match cmd {
        AuthCommands::Register {
            username,
            email,
            first_name,
            last_name,
            password,
        } => {
            let password = resolve_password(password)?;
            let registration = json!({
                "username": username,
                "email": email,
                "password": password,
                "password2": password,
                "first_name": first_name,
                "last_name": last_name,
            });

            let user = client.register(&registration).await?;
            output_success(
                &output_format,
                &format!("Registered user '{}'", username),
                Some(json!({ "user": user })),
            )
        }

        AuthCommands::Login { username, password } => {
            let password = resolve_password(password)?;
            client.login(&username, &password).await?;
            output_success(&output_format, &format!("Logged in as '{}'", username), None)
        }

        AuthCommands::Logout => {
            client.logout()?;
            output_success(&output_format, "Logged out", None)
        }

        AuthCommands::Status => {
            let credentials = client.store().credentials()?;

            match credentials.access.as_deref() {
                Some(token) => {
                    let claims = peek_access_claims(token);
                    let expires_at = claims.as_ref().and_then(|c| {
                        chrono::DateTime::from_timestamp(c.exp, 0)
                            .map(|dt| dt.to_rfc3339())
                    });

                    match output_format {
                        OutputFormat::Json => output_json(&json!({
                            "authenticated": true,
                            "expires_at": expires_at,
                            "user_id": claims.as_ref().and_then(|c| c.user_id),
                            "refresh_token_present": credentials.refresh.is_some(),
                        })),
                        OutputFormat::Text => {
                            println!("Logged in");
                            if let Some(expires_at) = expires_at {
                                println!("Access token expires at {}", expires_at);
                            }
                            if credentials.refresh.is_none() {
                                println!("No refresh token stored; session will not auto-renew");
                            }
                            Ok(())
                        }
                    }
                }
                None => match output_format {
                    OutputFormat::Json => output_json(&json!({ "authenticated": false })),
                    OutputFormat::Text => {
                        println!("Not logged in");
                        Ok(())
                    }
                },
            }
        }

        AuthCommands::Whoami => {
            let profile = client.profile().await?;
            match output_format {
                OutputFormat::Json => output_json(&profile),
                OutputFormat::Text => {
                    println!("{} <{}>", profile.username, profile.email);
                    if !profile.first_name.is_empty() || !profile.last_name.is_empty() {
                        println!("{} {}", profile.first_name, profile.last_name);
                    }
                    Ok(())
                }
            }
        }

        AuthCommands::Refresh => {
            client.refresh_now().await?;
            output_success(&output_format, "Access token refreshed", None)
        }
    }
}
