use super::{ConfigError, CONFIG_FILENAME, SHREDDIT_TEMPLATE};
use std::{
    fs::write,
    path::{Path, PathBuf},
};

pub const PRAW_FILENAME: &str = "praw.ini";
pub const PRAW_TEMPLATE: &str = include_str!("../../templates/praw.ini.example");

/// The example files written by `--generate-configs`.
pub const TEMPLATES: [(&str, &str); 2] = [
    (CONFIG_FILENAME, SHREDDIT_TEMPLATE),
    (PRAW_FILENAME, PRAW_TEMPLATE),
];

/// Writes each example file that does not exist in `dir` yet. Returns the paths written.
pub fn generate_configs(dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let mut written = vec![];
    for (name, template) in TEMPLATES {
        let path = dir.join(name);
        if path.is_file() {
            continue;
        }
        println!("Writing {name} file...");
        write(&path, template).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::read_to_string;
    use tempfile::TempDir;

    #[test]
    fn writes_both_templates_into_an_empty_dir() {
        let temp = TempDir::new().unwrap();

        let written = generate_configs(temp.path()).unwrap();

        assert_eq!(written, vec![temp.path().join("shreddit.yml"), temp.path().join("praw.ini")]);
        assert_eq!(read_to_string(temp.path().join("shreddit.yml")).unwrap(), SHREDDIT_TEMPLATE);
        assert_eq!(read_to_string(temp.path().join("praw.ini")).unwrap(), PRAW_TEMPLATE);
    }

    #[test]
    fn existing_files_are_left_alone() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("praw.ini"), "[mine]\n").unwrap();

        let written = generate_configs(temp.path()).unwrap();

        assert_eq!(written, vec![temp.path().join("shreddit.yml")]);
        assert_eq!(read_to_string(temp.path().join("praw.ini")).unwrap(), "[mine]\n");
        assert!(generate_configs(temp.path()).unwrap().is_empty());
    }
}
