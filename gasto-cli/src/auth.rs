use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};

use crate::state::ensure_gasto_home;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthState {
    pub api_token: Option<String>,
}

fn auth_path() -> Result<std::path::PathBuf> {
    Ok(ensure_gasto_home()?.join("auth.json"))
}

pub fn load_auth() -> Result<AuthState> {
    let p = auth_path()?;
    if !p.exists() {
        return Ok(AuthState::default());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    Ok(serde_json::from_str(&s)?)
}

pub fn save_auth(auth: &AuthState) -> Result<()> {
    let p = auth_path()?;
    let s = serde_json::to_string_pretty(auth)?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

fn prompt_secret(label: &str) -> Result<String> {
    // Minimal portable secret prompt: just stdin.
    print!("{}: ", label);
    io::stdout().flush().ok();
    let mut s = String::new();
    io::stdin().read_line(&mut s)?;
    Ok(s.trim().to_string())
}

pub fn paste_token() -> Result<()> {
    let mut auth = load_auth()?;
    let token = prompt_secret("Paste API bearer token")?;
    if token.is_empty() {
        bail!("no token given");
    }
    auth.api_token = Some(token);
    save_auth(&auth)?;
    println!("Saved token to ~/.gasto/auth.json");
    Ok(())
}

pub fn clear_token() -> Result<()> {
    let mut auth = load_auth()?;
    if auth.api_token.take().is_none() {
        println!("No token stored.");
        return Ok(());
    }
    save_auth(&auth)?;
    println!("Token removed.");
    Ok(())
}

pub fn status() -> Result<()> {
    let auth = load_auth()?;
    match auth.api_token {
        Some(_) => println!("Token stored in ~/.gasto/auth.json"),
        None => println!("No token stored. Run: gasto auth paste-token"),
    }
    Ok(())
}
