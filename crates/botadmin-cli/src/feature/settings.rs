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

use crate::SettingsKey;
use crate::data::repository::{GetPreferencesRepository, PreferencesRepository};
use botadmin::prelude::*;

pub fn list_settings<Ctx>(context: Ctx) -> Fallible<()>
where
    Ctx: GetPreferencesRepository,
{
    let settings = context.get_prefs_repo().load_settings()?;

    print_setting(&SettingsKey::BaseUrl, &settings.base_url);
    print_setting(&SettingsKey::DefaultBot, &settings.default_bot);
    print_setting(
        &SettingsKey::PageSize,
        &settings.page_size.map(|data| data.to_string()),
    );
    print_setting(
        &SettingsKey::TimeoutSeconds,
        &settings.timeout_seconds.map(|data| data.to_string()),
    );

    Ok(())
}

pub fn get_setting<Ctx>(context: Ctx, key: &SettingsKey) -> Fallible<()>
where
    Ctx: GetPreferencesRepository,
{
    let settings = context.get_prefs_repo().load_settings()?;

    match *key {
        SettingsKey::BaseUrl => print_setting(&SettingsKey::BaseUrl, &settings.base_url),
        SettingsKey::DefaultBot => print_setting(&SettingsKey::DefaultBot, &settings.default_bot),
        SettingsKey::PageSize => print_setting(
            &SettingsKey::PageSize,
            &settings.page_size.map(|data| data.to_string()),
        ),
        SettingsKey::TimeoutSeconds => print_setting(
            &SettingsKey::TimeoutSeconds,
            &settings.timeout_seconds.map(|data| data.to_string()),
        ),
    }

    Ok(())
}

pub fn set_setting<Ctx>(context: Ctx, key: &SettingsKey, value: String) -> Fallible<()>
where
    Ctx: GetPreferencesRepository,
{
    let repo = context.get_prefs_repo();
    let mut settings = repo.load_settings()?;

    match *key {
        SettingsKey::BaseUrl => {
            settings.base_url = Some(value);
        }
        SettingsKey::DefaultBot => {
            settings.default_bot = Some(value);
        }
        SettingsKey::PageSize => {
            settings.page_size =
                Some(value.parse().with_context(|| format!("invalid page_size: {value}"))?);
        }
        SettingsKey::TimeoutSeconds => {
            settings.timeout_seconds = Some(
                value
                    .parse()
                    .with_context(|| format!("invalid timeout_seconds: {value}"))?,
            );
        }
    }

    repo.save_settings(&settings)?;

    Ok(())
}

fn print_setting(key: &SettingsKey, value: &Option<String>) {
    println!(
        "{key}: {}",
        value.as_ref().map(|data| data.as_str()).unwrap_or("(none)"),
    );
}
