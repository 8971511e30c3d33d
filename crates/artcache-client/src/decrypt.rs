//! Recovers `(url, token)` from an encrypted test fixture.
//!
//! The fixture is produced with `openssl enc -aes-256-cbc -a -A -salt -md sha256`.
//! OpenSSL's password-based key derivation is not reproduced here; the
//! external `openssl` binary does the decryption. Only test environments use this.

use std::io::{self, Write};
use std::process::{Command, Output, Stdio};

use crate::error::ConfigError;

const PASSWORD_VAR: &str = "ARTCACHE_DECRYPT_PW";
const SEPARATOR: &str = ":::";

/// Decrypt `encrypted` with `password`, returning `(url, token)`.
pub(crate) fn decrypt_token(encrypted: &str, password: &str) -> Result<(String, String), ConfigError> {
    let pass_arg = format!("env:{PASSWORD_VAR}");
    let mut command = Command::new("openssl");
    command
        .args([
            "enc",
            "-d",
            "-aes-256-cbc",
            "-a",
            "-A",
            "-salt",
            "-md",
            "sha256",
            "-pass",
            pass_arg.as_str(),
        ])
        .env(PASSWORD_VAR, password);

    let output = run_piped(&mut command, encrypted.as_bytes())
        .map_err(|e| ConfigError::Decrypt(format!("failed to run openssl: {e}")))?;
    if !output.status.success() {
        return Err(ConfigError::Decrypt(format!("openssl exited with {}", output.status)));
    }

    split_plaintext(&output.stdout)
}

/// Run `command` with `input` on stdin, collecting stdout.
///
/// Stdin is fed from a separate thread while stdout is drained, so neither
/// pipe can fill up and stall the other.
fn run_piped(command: &mut Command, input: &[u8]) -> io::Result<Output> {
    let mut child = command
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .spawn()?;
    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| io::Error::other("child stdin not captured"))?;

    std::thread::scope(|scope| {
        // Dropping `stdin` at the end of the writer closes the pipe.
        let writer = scope.spawn(move || stdin.write_all(input));
        let output = child.wait_with_output()?;
        let written = writer
            .join()
            .unwrap_or_else(|_| Err(io::Error::other("stdin writer panicked")));
        // A child that exits early breaks the pipe; its status tells why.
        match written {
            Err(e) if output.status.success() => Err(e),
            _ => Ok(output),
        }
    })
}

/// Split decrypted `url:::token` contents. The token is trimmed.
fn split_plaintext(plain: &[u8]) -> Result<(String, String), ConfigError> {
    let text = String::from_utf8_lossy(plain);
    match text.split_once(SEPARATOR) {
        Some((url, token)) => Ok((url.to_string(), token.trim().to_string())),
        None => Err(ConfigError::Decrypt(
            "invalid decrypt contents: missing separator".into(),
        )),
    }
}
