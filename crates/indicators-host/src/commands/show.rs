use anyhow::{Result, bail};
use indicators::IndicatorStorage;

/// Print one installed file, pretty-printing it when it parses as JSON.
pub fn run(storage: &dyn IndicatorStorage, relative_path: &str, raw: bool) -> Result<()> {
    let Some(content) = storage.read_file(relative_path)? else {
        bail!("Indicator not found: {relative_path}");
    };

    if raw {
        print!("{content}");
        return Ok(());
    }

    match serde_json::from_str::<serde_json::Value>(&content) {
        Ok(value) => println!("{}", serde_json::to_string_pretty(&value)?),
        Err(_) => print!("{content}"),
    }

    Ok(())
}
