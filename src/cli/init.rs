use colored::Colorize;

use crate::error::{AppError, Result};
use crate::settings::{load_settings, save_settings, shellexpand_path};

pub fn run(data_dir: Option<&str>, encoding: Option<String>) -> Result<()> {
    let mut settings = load_settings();
    if let Some(dir) = data_dir {
        settings.data_dir = shellexpand_path(dir);
    }
    if let Some(enc) = encoding {
        if encoding_rs::Encoding::for_label(enc.trim().as_bytes()).is_none() {
            return Err(AppError::Settings(format!("unknown encoding {enc:?}")));
        }
        settings.encoding = enc.trim().to_string();
    }

    save_settings(&settings)?;

    println!("Data directory: {}", settings.data_dir);
    println!("Encoding:       {}", settings.encoding);
    for path in [settings.monthly_path(), settings.yearly_path()] {
        if path.exists() {
            println!("  {} {}", "found".green(), path.display());
        } else {
            println!("  {} {}", "missing".yellow(), path.display());
        }
    }
    Ok(())
}
