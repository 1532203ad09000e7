use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use esp3_eep::{FieldInput, ProfileId, ProfileRegistry};
use esp3_packet::Address;

use crate::exit::{eep_error, CliError, CliResult};
use crate::output::OutputFormat;

pub mod crc;
pub mod decode;
pub mod encode;
pub mod profiles;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Decode frames given as hex strings, a capture file or stdin lines.
    Decode(DecodeArgs),
    /// Build a radio telegram from profile field values.
    Encode(EncodeArgs),
    /// Compute the frame CRC-8 of hex bytes.
    Crc(CrcArgs),
    /// List bundled and loaded profiles, or show one.
    Profiles(ProfilesArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Decode(args) => decode::run(args, format),
        Command::Encode(args) => encode::run(args, format),
        Command::Crc(args) => crc::run(args, format),
        Command::Profiles(args) => profiles::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Hex-encoded bytes; frames may span arguments.
    #[arg(conflicts_with = "file")]
    pub frames: Vec<String>,
    /// Read a binary capture instead.
    #[arg(long)]
    pub file: Option<PathBuf>,
    /// Decode telegrams of SENDER with EEP (e.g. 04:20:58:A5=D1079-01-00).
    #[arg(long, value_name = "SENDER=EEP")]
    pub bind: Vec<String>,
    /// Bind senders to the profile announced in their teach-in telegrams.
    #[arg(long)]
    pub learn: bool,
    /// Directory of additional profile documents.
    #[arg(long, value_name = "DIR", env = "ESP3_PROFILES")]
    pub profiles: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Profile of the telegram (e.g. A5-02-05, D1079-01-00).
    pub eep: ProfileId,
    #[arg(long)]
    pub sender: Option<Address>,
    #[arg(long)]
    pub destination: Option<Address>,
    /// Command selecting the data block (VLD and manufacturer profiles).
    #[arg(long)]
    pub command: Option<u8>,
    #[arg(long)]
    pub direction: Option<u8>,
    /// Build a teach-in telegram.
    #[arg(long)]
    pub learn: bool,
    /// Field value as SHORTCUT=VALUE. Numbers are engineering values,
    /// `raw:N` a raw integer, true/false a flag, anything else an enum label.
    #[arg(long, value_name = "SHORTCUT=VALUE")]
    pub set: Vec<String>,
    /// Directory of additional profile documents.
    #[arg(long, value_name = "DIR", env = "ESP3_PROFILES")]
    pub profiles: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct CrcArgs {
    /// Hex-encoded bytes.
    pub data: String,
}

#[derive(Args, Debug)]
pub struct ProfilesArgs {
    /// Profile to show; all profiles are listed when omitted.
    pub eep: Option<ProfileId>,
    /// Directory of additional profile documents.
    #[arg(long, value_name = "DIR", env = "ESP3_PROFILES")]
    pub profiles: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show build details.
    #[arg(long)]
    pub extended: bool,
}

/// Bundled profiles plus the documents of `dir`.
pub(crate) fn load_catalog(dir: Option<&Path>) -> CliResult<ProfileRegistry> {
    let mut registry =
        ProfileRegistry::builtin().map_err(|err| eep_error("bundled profiles", err))?;
    if let Some(dir) = dir {
        registry
            .load_directory(dir)
            .map_err(|err| eep_error("loading profiles failed", err))?;
    }
    Ok(registry)
}

/// Hex bytes, ignoring whitespace, `:` separators and a `0x` prefix.
pub(crate) fn parse_hex(input: &str) -> CliResult<Vec<u8>> {
    let trimmed = input.trim();
    let digits: String = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed)
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':')
        .collect();
    hex::decode(&digits).map_err(|err| CliError::usage(format!("invalid hex {input:?}: {err}")))
}

pub(crate) fn parse_binding(input: &str) -> CliResult<(Address, ProfileId)> {
    let (sender, eep) = input
        .split_once('=')
        .ok_or_else(|| CliError::usage(format!("binding {input:?} must be SENDER=EEP")))?;
    let sender = sender
        .parse()
        .map_err(|err| CliError::usage(format!("binding {input:?}: {err}")))?;
    let eep = eep
        .parse()
        .map_err(|err| CliError::usage(format!("binding {input:?}: {err}")))?;
    Ok((sender, eep))
}

pub(crate) fn parse_assignment(input: &str) -> CliResult<(String, FieldInput)> {
    let (shortcut, value) = input
        .split_once('=')
        .ok_or_else(|| CliError::usage(format!("value {input:?} must be SHORTCUT=VALUE")))?;
    let value = value.trim();
    let value = if let Some(raw) = value.strip_prefix("raw:") {
        FieldInput::Raw(
            raw.parse()
                .map_err(|_| CliError::usage(format!("invalid raw value in {input:?}")))?,
        )
    } else if let Ok(flag) = value.parse::<bool>() {
        FieldInput::Flag(flag)
    } else if let Ok(number) = value.parse::<f64>() {
        FieldInput::Scaled(number)
    } else {
        FieldInput::Label(value.to_string())
    };
    Ok((shortcut.trim().to_string(), value))
}
