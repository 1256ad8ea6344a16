//! User-interactivity helpers: yes/no prompts, overwrite confirmation, password entry.
//!
//! Grounded on the teacher's `cli::prompt`.

use std::io::{self, stdin, Write};

use anyhow::{Context, Result};
use zeroize::Zeroize;

use maus_core::protected::Protected;

use crate::global::states::{ForceMode, PasswordState};

pub fn get_answer(prompt: &str, default: bool, force: ForceMode) -> Result<bool> {
    if force == ForceMode::Force {
        return Ok(true);
    }

    let switch = if default { "(Y/n)" } else { "(y/N)" };

    let answer = loop {
        paris::info!("{prompt} {switch}: ");
        io::stdout().flush().context("Unable to flush stdout")?;

        let mut answer = String::new();
        stdin().read_line(&mut answer).context("Unable to read from stdin")?;

        let first_char = answer.to_lowercase().chars().next().unwrap_or('\n');
        break match first_char {
            '\n' | '\r' => default,
            'y' => true,
            'n' => false,
            _ => {
                paris::warn!("Unrecognised answer - please try again");
                continue;
            }
        };
    };
    Ok(answer)
}

pub fn overwrite_check(name: &str, force: ForceMode) -> Result<bool> {
    if std::fs::metadata(name).is_ok() {
        get_answer(&format!("{name} already exists, would you like to overwrite?"), true, force)
    } else {
        Ok(true)
    }
}

pub fn get_password(pass_state: &PasswordState) -> Result<Protected<Vec<u8>>> {
    Ok(loop {
        let input = rpassword::prompt_password("Password: ").context("Unable to read password")?;
        if pass_state == &PasswordState::Direct {
            return Ok(Protected::new(input.into_bytes()));
        }

        let mut confirmation =
            rpassword::prompt_password("Confirm password: ").context("Unable to read password")?;

        if input == confirmation && !input.is_empty() {
            confirmation.zeroize();
            break Protected::new(input.into_bytes());
        } else if input.is_empty() {
            paris::warn!("Password cannot be empty, please try again.");
        } else {
            paris::warn!("The passwords aren't the same, please try again.");
        }
    })
}
