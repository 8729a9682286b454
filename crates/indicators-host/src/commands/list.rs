use anyhow::Result;
use indicators::IndicatorStorage;

pub fn run(storage: &dyn IndicatorStorage) -> Result<()> {
    let files = storage.list_installed_files()?;

    if files.is_empty() {
        println!("No indicators installed in {}.", storage.directory().display());
        return Ok(());
    }

    for file in &files {
        println!("{file}");
    }
    eprintln!("{} indicator(s)", files.len());

    Ok(())
}
