// Copyright (C) 2026 Brian Johnson
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

//! Measurement plan settings the device reads from `setting_<plan>.csv`

use std::path::{Path, PathBuf};
use tracing::debug;
use crate::error::SettingsError;

pub const FIRST_PLAN: u8 = 1;
pub const LAST_PLAN: u8 = 4;

const CSV_HEADER: &str = "current,sample rate,duration,min temp,max temp";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanSettings {
    pub plan: u8,
    pub current: i32,
    pub sample_rate: i32,
    pub duration: i32,
    pub min_temp: i32,
    pub max_temp: i32,
}

impl PlanSettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if !(FIRST_PLAN..=LAST_PLAN).contains(&self.plan) {
            return Err(SettingsError::PlanOutOfRange { plan: self.plan, first: FIRST_PLAN, last: LAST_PLAN });
        }
        if self.min_temp > self.max_temp {
            return Err(SettingsError::TemperatureRange { min: self.min_temp, max: self.max_temp });
        }
        Ok(())
    }

    pub fn filename(&self) -> String {
        filename_for(self.plan)
    }

    /// Header line plus one value row, no trailing newline
    pub fn to_csv(&self) -> String {
        format!(
            "{}\n{},{},{},{},{}",
            CSV_HEADER, self.current, self.sample_rate, self.duration, self.min_temp, self.max_temp
        )
    }
}

pub fn filename_for(plan: u8) -> String {
    format!("setting_{}.csv", plan)
}

/// File index carried by a `setting_N.csv` name
pub fn index_from_filename(name: &str) -> Option<u8> {
    let digits = name.strip_prefix("setting_")?.strip_suffix(".csv")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok().filter(|index| *index != 0)
}

/// Settings files present in `dir`, by plan
pub fn discover(dir: &Path) -> Vec<(u8, PathBuf)> {
    (FIRST_PLAN..=LAST_PLAN)
        .map(|plan| (plan, dir.join(filename_for(plan))))
        .filter(|(_, path)| {
            let found = path.is_file();
            debug!("{}: {}", path.display(), if found { "found" } else { "missing" });
            found
        })
        .collect()
}
