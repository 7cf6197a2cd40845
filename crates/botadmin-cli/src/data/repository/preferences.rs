/*
 * Copyright 2026 sukawasatoru
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

use crate::model::Settings;
use botadmin::prelude::*;
use std::io::prelude::*;
use std::path::PathBuf;

pub trait PreferencesRepository {
    fn load_settings(&self) -> Fallible<Settings>;
    fn save_settings(&self, settings: &Settings) -> Fallible<()>;
}

pub trait GetPreferencesRepository {
    type Repo: PreferencesRepository;

    fn get_prefs_repo(&self) -> &Self::Repo;
}

pub struct PreferencesRepositoryImpl {
    config_dir_path: PathBuf,
}

impl PreferencesRepositoryImpl {
    pub fn create_with_path(config_dir_path: PathBuf) -> Self {
        Self { config_dir_path }
    }

    fn create_file_path(&self) -> PathBuf {
        self.config_dir_path.join("settings.toml")
    }
}

impl PreferencesRepository for PreferencesRepositoryImpl {
    fn load_settings(&self) -> Fallible<Settings> {
        let file_path = self.create_file_path();
        if !file_path.exists() {
            return Ok(Settings::default());
        }

        TomlLoader::new().load(&file_path)
    }

    fn save_settings(&self, settings: &Settings) -> Fallible<()> {
        if !self.config_dir_path.exists() {
            std::fs::create_dir_all(&self.config_dir_path)?;
        }

        let mut buf = std::io::BufWriter::new(std::fs::File::create(self.create_file_path())?);
        buf.write_all(toml::to_string(settings)?.as_bytes())?;
        buf.flush()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_without_file_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let repo = PreferencesRepositoryImpl::create_with_path(dir.path().to_owned());

        let settings = repo.load_settings().unwrap();
        assert!(settings.base_url.is_none());
        assert!(settings.default_bot.is_none());
        assert!(settings.page_size.is_none());
        assert!(settings.timeout_seconds.is_none());
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let repo = PreferencesRepositoryImpl::create_with_path(dir.path().join("conf"));

        repo.save_settings(&Settings {
            base_url: Some("http://localhost:18080".into()),
            default_bot: Some("42".into()),
            page_size: Some(25),
            timeout_seconds: None,
        })
        .unwrap();

        let settings = repo.load_settings().unwrap();
        assert_eq!(settings.base_url.as_deref(), Some("http://localhost:18080"));
        assert_eq!(settings.default_bot.as_deref(), Some("42"));
        assert_eq!(settings.page_size, Some(25));
        assert_eq!(settings.timeout_seconds, None);
    }
}
