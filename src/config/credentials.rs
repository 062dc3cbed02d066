//! Credential lookup: config file, then OS keyring, then interactive prompt.

use std::fmt;
use std::io::{self, BufRead, Write};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::Config;
use crate::api::auth::keyring_password;
use crate::api::error::{ApiError, Result};

/// A `[credentials."<server>"]` table in the config file.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CredentialEntry {
    /// The login name.
    pub username: String,
    /// The password; looked up in the keyring when absent.
    #[serde(default)]
    pub password: Option<String>,
}

impl fmt::Debug for CredentialEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialEntry")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

/// A username and password pair.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// Resolve credentials for `server`.
///
/// Blocks on terminal input when falling back to the prompt.
pub fn resolve_credentials(config: Option<&Config>, server: &str) -> Result<Credentials> {
    let entry = config.and_then(|c| c.credentials_for(server));
    resolve_with(entry, || keyring_password(server), prompt_credentials)
}

fn resolve_with<K, P>(entry: Option<&CredentialEntry>, keyring: K, prompt: P) -> Result<Credentials>
where
    K: FnOnce() -> Result<String>,
    P: FnOnce(Option<&str>) -> Result<Credentials>,
{
    let Some(entry) = entry else {
        info!("No credentials configured, asking user");
        return prompt(None);
    };

    if let Some(password) = &entry.password {
        debug!(username = %entry.username, "Using credentials from config file");
        return Ok(Credentials {
            username: entry.username.clone(),
            password: password.clone(),
        });
    }

    match keyring() {
        Ok(password) => {
            debug!(username = %entry.username, "Using password from keyring");
            Ok(Credentials {
                username: entry.username.clone(),
                password,
            })
        }
        Err(e) => {
            warn!("{}; asking user", e);
            prompt(Some(&entry.username))
        }
    }
}

/// Ask for credentials on the terminal. The password is not echoed.
///
/// A known username is not asked again.
pub fn prompt_credentials(username: Option<&str>) -> Result<Credentials> {
    let username = match username {
        Some(name) => name.to_string(),
        None => read_line("input username: ")
            .map_err(|e| ApiError::Credentials(format!("failed to read username: {}", e)))?,
    };

    let password = read_password("input password: ")
        .map_err(|e| ApiError::Credentials(format!("failed to read password: {}", e)))?;

    Ok(Credentials { username, password })
}

/// Prompts go to stderr; stdout carries result lines only.
fn read_line(prompt: &str) -> io::Result<String> {
    read_line_with(prompt, &mut io::stderr(), &mut io::stdin().lock())
}

fn read_line_with(prompt: &str, out: &mut impl Write, input: &mut impl BufRead) -> io::Result<String> {
    write!(out, "{}", prompt)?;
    out.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn read_password(prompt: &str) -> io::Result<String> {
    let mut stderr = io::stderr();
    write!(stderr, "{}", prompt)?;
    stderr.flush()?;

    terminal::enable_raw_mode()?;
    let result = read_hidden();
    terminal::disable_raw_mode()?;
    writeln!(stderr)?;

    result
}

/// Collect key presses until Enter while the terminal is in raw mode.
fn read_hidden() -> io::Result<String> {
    let mut password = String::new();

    loop {
        let Event::Key(KeyEvent {
            code,
            modifiers,
            kind,
            ..
        }) = event::read()?
        else {
            continue;
        };
        if kind != KeyEventKind::Press {
            continue;
        }

        match code {
            KeyCode::Enter => return Ok(password),
            KeyCode::Backspace => {
                password.pop();
            }
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                return Err(io::Error::new(
                    io::ErrorKind::Interrupted,
                    "password entry cancelled",
                ));
            }
            KeyCode::Char(c) => password.push(c),
            _ => {}
        }
    }
}
