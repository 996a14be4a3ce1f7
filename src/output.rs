// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Rendering and writing of the system profile.

use std::io::Write as _;
use std::path::Path;

use log::info;
use stream_ingest::{IngestError, IngestResult, SystemProfile};

use crate::cli::OutputFormat;

const RULE_WIDTH: usize = 80;

/// Render `profile` in the requested format.
pub fn render(profile: &SystemProfile, format: OutputFormat) -> IngestResult<String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(profile).map_err(IngestError::Encode),
        OutputFormat::Text => Ok(render_text(profile)),
    }
}

fn render_text(profile: &SystemProfile) -> String {
    let mut lines = vec![
        format!("System: {}", profile.system_id),
        format!("Total Talkgroups: {}", profile.total_channels),
        format!("Total Streams: {}", profile.total_streams),
        format!("Generated: {}", profile.generated_at),
        String::new(),
        "Available Streams:".to_string(),
        "=".repeat(RULE_WIDTH),
    ];

    for stream in &profile.streams {
        lines.push(String::new());
        lines.push(format!("Stream ID: {}", stream.stream_id));
        lines.push(format!("Name: {}", stream.name));
        lines.push(format!("Description: {}", stream.description));
        lines.push(format!("Audio URL: {}", stream.audio_url));
        if let Some(wallet) = &stream.wallet {
            lines.push(format!("Wallet: {} ({})", wallet.address, wallet.mode));
        }
        lines.push("-".repeat(RULE_WIDTH));
    }

    lines.join("\n")
}

/// Write rendered output to `path`, or to stdout when no path is given.
pub fn write_output(path: Option<&Path>, rendered: &str) -> IngestResult<()> {
    if let Some(path) = path {
        std::fs::write(path, rendered).map_err(|e| IngestError::io(path, e))?;
        info!("Output written to {}", path.display());
        return Ok(());
    }

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "{rendered}").map_err(|e| IngestError::io("<stdout>", e))
}
