use anyhow::{bail, Result};
use hja_core::{normalize_corporate_number, NumberCheck};

/// Print the normalized form and validity. Exits non-zero when malformed.
pub fn run(raw: &str) -> Result<()> {
    match normalize_corporate_number(raw) {
        NumberCheck::Valid(n) => {
            println!("normalized={}", n.as_str());
            println!("check_digit={}", n.check_digit());
            println!("valid=true");
            Ok(())
        }
        NumberCheck::Malformed { candidate, reason } => {
            println!("normalized={candidate}");
            println!("valid=false");
            println!("reason={}", reason.code());
            bail!("MALFORMED: {reason}")
        }
    }
}
