use std::io::BufRead;

use anyhow::{Context, Result};
use indicators::CredentialStore;

/// Store a token, reading it from stdin when not given on the command line.
pub fn set(credentials: &CredentialStore, token: Option<String>) -> Result<()> {
    let token = match token {
        Some(token) => token,
        None => {
            eprintln!("Paste a GitHub token and press enter:");
            let mut line = String::new();
            std::io::stdin()
                .lock()
                .read_line(&mut line)
                .context("failed to read token from stdin")?;
            line
        }
    };

    credentials.store(&token)?;
    println!("Token saved.");
    Ok(())
}

pub fn get(credentials: &CredentialStore, reveal: bool) -> Result<()> {
    match credentials.retrieve()? {
        Some(token) if reveal => println!("{token}"),
        Some(token) => println!("{}", mask(&token)),
        None => println!("No token stored."),
    }
    Ok(())
}

pub fn delete(credentials: &CredentialStore) -> Result<()> {
    credentials.erase()?;
    println!("Token removed.");
    Ok(())
}

fn mask(token: &str) -> String {
    let visible: String = token.chars().take(4).collect();
    if token.chars().count() <= 8 {
        return "*".repeat(token.chars().count());
    }
    format!("{visible}{}", "*".repeat(8))
}
