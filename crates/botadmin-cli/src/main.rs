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

use crate::data::api::{GetBotApi, HttpBotApi};
use crate::data::repository::{
    GetPreferencesRepository, PreferencesRepository, PreferencesRepositoryImpl,
};
use crate::feature::{get_setting, list_settings, run_chat, run_records, set_setting};
use crate::model::Settings;
use botadmin::prelude::*;
use clap::{Parser, Subcommand, ValueEnum};
use std::fmt::{Display, Formatter};

mod data;
mod feature;
mod functions;
mod model;

/// Admin console for the bot platform backend.
#[derive(Parser)]
struct Opt {
    /// Base URL of the platform backend, e.g. http://localhost:18080
    #[arg(long, env = "BOTADMIN_BASE_URL")]
    base_url: Option<String>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Browse and insert question/answer records of a bot.
    #[command()]
    Records {
        /// Bot id to open on startup.
        #[arg(long, env = "BOTADMIN_BOT_ID")]
        bot: Option<String>,

        /// Records per page.
        #[arg(long)]
        page_size: Option<u64>,
    },

    /// Talk to a bot and watch the reply stream in.
    #[command()]
    Chat {
        /// Bot id to open on startup.
        #[arg(long, env = "BOTADMIN_BOT_ID")]
        bot: Option<String>,
    },

    /// Inspect or edit stored settings.
    #[command(subcommand)]
    Settings(SettingsCommand),
}

#[derive(Subcommand)]
enum SettingsCommand {
    /// List current settings.
    #[command()]
    List,

    /// Get current setting.
    #[command()]
    Get {
        /// Key to get the setting.
        key: SettingsKey,
    },

    /// Set setting.
    #[command()]
    Set {
        /// Key to set the setting.
        key: SettingsKey,

        /// Value to set the setting.
        value: String,
    },
}

#[derive(Clone, ValueEnum)]
pub enum SettingsKey {
    #[value(name = "base_url")]
    BaseUrl,
    #[value(name = "default_bot")]
    DefaultBot,
    #[value(name = "page_size")]
    PageSize,
    #[value(name = "timeout_seconds")]
    TimeoutSeconds,
}

impl Display for SettingsKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingsKey::BaseUrl => f.write_str("base_url"),
            SettingsKey::DefaultBot => f.write_str("default_bot"),
            SettingsKey::PageSize => f.write_str("page_size"),
            SettingsKey::TimeoutSeconds => f.write_str("timeout_seconds"),
        }
    }
}

struct SettingsContext {
    prefs_repo: PreferencesRepositoryImpl,
}

impl GetPreferencesRepository for SettingsContext {
    type Repo = PreferencesRepositoryImpl;

    fn get_prefs_repo(&self) -> &Self::Repo {
        &self.prefs_repo
    }
}

struct ConsoleContext {
    api: HttpBotApi,
}

impl GetBotApi for ConsoleContext {
    type Api = HttpBotApi;

    fn get_bot_api(&self) -> &Self::Api {
        &self.api
    }
}

fn main() -> Fallible<()> {
    dotenv::dotenv().ok();

    if cfg!(target_os = "macos") {
        let log_dir_path = directories::UserDirs::new()
            .context("no valid home directory")?
            .home_dir()
            .join("Library/Logs/com.sukawasatoru.Bot Admin CLI");
        let (non_blocking, guard) = tracing_appender::non_blocking(
            tracing_appender::rolling::hourly(log_dir_path, "botadmin-cli"),
        );
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_writer(non_blocking)
            .init();

        std::mem::forget(guard);
    } else {
        tracing_subscriber::fmt::init();
    };

    info!("hello");

    let project_dir = directories::ProjectDirs::from("com", "sukawasatoru", "Bot Admin CLI")
        .context("no valid home directory")?;
    let prefs_repo =
        PreferencesRepositoryImpl::create_with_path(project_dir.config_dir().to_owned());

    let opt = Opt::parse();

    match opt.cmd {
        Command::Records { bot, page_size } => {
            let settings = prefs_repo.load_settings()?;
            let context = create_console_context(opt.base_url, &settings)?;
            let bot = bot.or_else(|| settings.default_bot.clone());
            let page_size = page_size.or(settings.page_size).unwrap_or(10);
            run_records(context, bot, page_size)?;
        }
        Command::Chat { bot } => {
            let settings = prefs_repo.load_settings()?;
            let context = create_console_context(opt.base_url, &settings)?;
            let bot = bot.or_else(|| settings.default_bot.clone());
            run_chat(context, bot)?;
        }
        Command::Settings(cmd) => {
            let context = SettingsContext { prefs_repo };
            match cmd {
                SettingsCommand::List => list_settings(context)?,
                SettingsCommand::Get { key } => get_setting(context, &key)?,
                SettingsCommand::Set { key, value } => set_setting(context, &key, value)?,
            }
        }
    }

    info!("bye");

    Ok(())
}

fn create_console_context(
    arg_base_url: Option<String>,
    settings: &Settings,
) -> Fallible<ConsoleContext> {
    let base_url = match arg_base_url.or_else(|| settings.base_url.clone()) {
        Some(data) => data,
        None => bail!("need base_url"),
    };

    Ok(ConsoleContext {
        api: HttpBotApi::new(&base_url, settings.timeout_seconds.unwrap_or(300))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Opt::command().debug_assert();
    }

    #[test]
    fn create_console_context_needs_base_url() {
        let ret = create_console_context(None, &Settings::default());
        assert!(ret.is_err());
    }

    #[test]
    fn create_console_context_prefers_argument() {
        let settings = Settings {
            base_url: Some("http://settings:1".into()),
            ..Default::default()
        };
        assert!(create_console_context(Some("http://arg:1".into()), &settings).is_ok());
    }

    #[ignore]
    #[test]
    fn opt_help() {
        Opt::command().print_help().unwrap();
    }
}
