pub use anyhow::{Context as _, Result as Fallible, bail, ensure};
pub use tracing::{debug, error, info, info_span, trace, warn};

#[derive(Default)]
pub struct TomlLoader {
    buf: String,
}

impl TomlLoader {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn load<T>(&mut self, path: &std::path::Path) -> Fallible<T>
    where
        T: serde::de::DeserializeOwned,
    {
        use std::io::Read;

        self.buf.clear();
        std::io::BufReader::new(std::fs::File::open(path)?).read_to_string(&mut self.buf)?;
        Ok(toml::from_str(&self.buf)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[derive(serde::Deserialize)]
    struct Doc {
        name: String,
    }

    #[test]
    fn toml_loader_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"name = \"bot\"\n").unwrap();
        drop(file);

        let doc = TomlLoader::new().load::<Doc>(&path).unwrap();
        assert_eq!(doc.name, "bot");
    }

    #[test]
    fn toml_loader_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(
            TomlLoader::new()
                .load::<Doc>(&dir.path().join("nothing.toml"))
                .is_err()
        );
    }
}
