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

//! Command line arguments.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use stream_ingest::{CallFilter, IngestResult};

const EXAMPLES: &str = "\
Examples:
  openmhz-ingest --system rhode-island
  openmhz-ingest --system rhode-island --talkgroups 3344,3408
  openmhz-ingest --system rhode-island --group fire --format text
  openmhz-ingest --system rhode-island --wallets --save --registry streams.json";

/// How the system profile is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON
    Json,
    /// Human-readable stream listing
    Text,
}

#[derive(Parser, Debug)]
#[command(name = "openmhz-ingest")]
#[command(about = "Ingest recent OpenMHz radio calls as streams")]
#[command(version, after_help = EXAMPLES)]
pub struct Args {
    /// System short name (e.g. rhode-island)
    #[arg(short, long)]
    pub system: String,

    /// Comma-separated talkgroup ids to filter on
    #[arg(short = 't', long = "talkgroups", value_name = "IDS")]
    pub talkgroups: Option<String>,

    /// Talkgroup group id to filter on
    #[arg(short, long)]
    pub group: Option<String>,

    /// Assign a wallet to every stream through the collaborator
    #[arg(short = 'w', long = "wallets")]
    pub assign_wallets: bool,

    /// Merge the result into the stream registry
    #[arg(long)]
    pub save: bool,

    /// Registry file (overrides the configured location)
    #[arg(long, value_name = "PATH")]
    pub registry: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Write output to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    pub debug: bool,
}

impl Args {
    /// Turn `--talkgroups` / `--group` into a call filter.
    pub fn call_filter(&self) -> IngestResult<CallFilter> {
        let channels = self
            .talkgroups
            .as_deref()
            .map(CallFilter::parse_channel_list)
            .transpose()?;
        CallFilter::from_parts(channels, self.group.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stream_ingest::IngestError;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("openmhz-ingest").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn test_system_is_required() {
        assert!(Args::try_parse_from(["openmhz-ingest"]).is_err());
    }

    #[test]
    fn test_defaults() {
        let args = parse(&["-s", "rhode-island"]);
        assert_eq!(args.system, "rhode-island");
        assert_eq!(args.format, OutputFormat::Json);
        assert!(!args.assign_wallets);
        assert!(!args.save);
        assert_eq!(args.call_filter().unwrap(), CallFilter::All);
    }

    #[test]
    fn test_talkgroup_filter() {
        let args = parse(&["--system", "ri", "--talkgroups", "3344, 3408"]);
        assert_eq!(
            args.call_filter().unwrap(),
            CallFilter::Channels(vec![3344, 3408])
        );
    }

    #[test]
    fn test_group_filter_and_text_format() {
        let args = parse(&["-s", "ri", "-g", "fire", "-f", "text", "-o", "out.txt"]);
        assert_eq!(args.call_filter().unwrap(), CallFilter::Group("fire".into()));
        assert_eq!(args.format, OutputFormat::Text);
        assert_eq!(args.output, Some(PathBuf::from("out.txt")));
    }

    #[test]
    fn test_both_filters_rejected() {
        let args = parse(&["-s", "ri", "-t", "3344", "-g", "fire"]);
        assert!(matches!(args.call_filter(), Err(IngestError::Validation(_))));
    }

    #[test]
    fn test_bad_talkgroup_rejected() {
        let args = parse(&["-s", "ri", "-t", "3344,police"]);
        assert!(matches!(args.call_filter(), Err(IngestError::Validation(_))));
    }

    #[test]
    fn test_wallet_and_registry_flags() {
        let args = parse(&["-s", "ri", "--wallets", "--save", "--registry", "reg.json"]);
        assert!(args.assign_wallets);
        assert!(args.save);
        assert_eq!(args.registry, Some(PathBuf::from("reg.json")));
    }
}
