use std::fs;
use std::path::Path;
use types::Error;

pub(crate) fn create_dir(dirname: &Path) -> Result<(), Error> {
    fs::create_dir_all(dirname).map_err(|e| {
        Error::IoFailure(format!(
            "cannot create option directory '{}': {e}",
            dirname.display()
        ))
    })
}

/// One value per file, newline-terminated.
pub fn save_value(filename: &Path, value: &str) -> Result<(), Error> {
    fs::write(filename, format!("{value}\n")).map_err(|e| {
        Error::IoFailure(format!("cannot save '{}': {e}", filename.display()))
    })
}

/// None when the file does not exist (the "use default" contract); an error
/// only on a real read failure.
pub fn load_value(filename: &Path) -> Result<Option<String>, Error> {
    match fs::read_to_string(filename) {
        Ok(text) => Ok(Some(text.trim().to_string())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::IoFailure(format!(
            "cannot read '{}': {e}",
            filename.display()
        ))),
    }
}
