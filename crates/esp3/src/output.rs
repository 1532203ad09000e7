use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use esp3_eep::{DecodedField, FieldKind, FieldValue, Profile};
use esp3_frame::packet_type_name;
use esp3_packet::rorg::rorg_name;
use esp3_packet::{Address, ChainedInfo, Decoded, Packet, PacketKind, RadioInfo, TeachInInfo};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct CodeOutput {
    code: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'static str>,
    data: String,
}

#[derive(Serialize)]
struct PacketOutput<'a> {
    kind: &'static str,
    packet_type: u8,
    packet_type_name: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    rorg: Option<&'static str>,
    data: String,
    optional: String,
    status: u8,
    repeater_count: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    radio: Option<&'a RadioInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    teach_in: Option<&'a TeachInInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    chain: Option<&'a ChainedInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response: Option<CodeOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    event: Option<CodeOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    profile: Option<String>,
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    fields: &'a [DecodedField],
}

impl<'a> PacketOutput<'a> {
    fn new(packet: &'a Packet) -> Self {
        let (mut radio, mut teach_in, mut chain, mut response, mut event) =
            (None, None, None, None, None);
        match &packet.kind {
            PacketKind::Radio(info) | PacketKind::Msc(info) => radio = Some(info),
            PacketKind::TeachIn(info) => teach_in = Some(info),
            PacketKind::Chained(info) => chain = Some(info),
            PacketKind::Response(info) => {
                response = Some(CodeOutput {
                    code: info.return_code,
                    name: Some(info.name()),
                    data: hex::encode_upper(&info.data),
                })
            }
            PacketKind::Event(info) => {
                event = Some(CodeOutput {
                    code: info.code,
                    name: None,
                    data: hex::encode_upper(&info.data),
                })
            }
            PacketKind::Generic => {}
        }

        Self {
            kind: packet.kind.name(),
            packet_type: packet.packet_type,
            packet_type_name: packet_type_name(packet.packet_type),
            rorg: packet.radio().map(|_| rorg_name(packet.rorg)),
            data: hex::encode_upper(&packet.data),
            optional: hex::encode_upper(&packet.optional),
            status: packet.status,
            repeater_count: packet.repeater_count,
            radio,
            teach_in,
            chain,
            response,
            event,
            profile: packet.profile.map(|id| id.to_string()),
            fields: &packet.fields,
        }
    }
}

#[derive(Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum ChainOutput {
    ChainPending {
        sender: Address,
        sequence: u8,
        received: usize,
        declared_len: usize,
    },
    ChainOrphaned {
        sender: Address,
        sequence: u8,
        index: u8,
    },
}

/// Prints decode outcomes. Table output is collected and printed by
/// [`PacketPrinter::finish`].
pub struct PacketPrinter {
    format: OutputFormat,
    rows: Vec<Vec<String>>,
}

impl PacketPrinter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            rows: Vec::new(),
        }
    }

    pub fn print(&mut self, decoded: &Decoded) {
        match decoded {
            Decoded::Packet(packet) => self.print_packet(packet),
            Decoded::ChainPending {
                sender,
                sequence,
                received,
                declared_len,
            } => self.print_chain(
                ChainOutput::ChainPending {
                    sender: *sender,
                    sequence: *sequence,
                    received: *received,
                    declared_len: *declared_len,
                },
                format!("{sender} seq={sequence} pending {received}/{declared_len} bytes"),
            ),
            Decoded::ChainOrphaned {
                sender,
                sequence,
                index,
            } => self.print_chain(
                ChainOutput::ChainOrphaned {
                    sender: *sender,
                    sequence: *sequence,
                    index: *index,
                },
                format!("{sender} seq={sequence} index={index} orphaned"),
            ),
        }
    }

    fn print_packet(&mut self, packet: &Packet) {
        match self.format {
            OutputFormat::Json => print_json(&PacketOutput::new(packet)),
            OutputFormat::Table => self.rows.push(vec![
                packet.kind.name().to_string(),
                packet
                    .radio()
                    .map(|_| rorg_name(packet.rorg))
                    .unwrap_or(packet_type_name(packet.packet_type))
                    .to_string(),
                packet.sender().map(|s| s.to_string()).unwrap_or_default(),
                packet.dbm().map(|d| d.to_string()).unwrap_or_default(),
                packet.profile.map(|id| id.to_string()).unwrap_or_default(),
                fields_summary(&packet.fields),
            ]),
            OutputFormat::Pretty => println!("{}", packet_line(packet)),
            OutputFormat::Raw => {
                if let Ok(bytes) = packet.to_bytes() {
                    print_raw(&bytes);
                }
            }
        }
    }

    fn print_chain(&mut self, event: ChainOutput, line: String) {
        match self.format {
            OutputFormat::Json => print_json(&event),
            OutputFormat::Table => {
                let (kind, sender) = match &event {
                    ChainOutput::ChainPending { sender, .. } => ("chain_pending", sender),
                    ChainOutput::ChainOrphaned { sender, .. } => ("chain_orphaned", sender),
                };
                self.rows.push(vec![
                    kind.to_string(),
                    String::new(),
                    sender.to_string(),
                    String::new(),
                    String::new(),
                    line,
                ]);
            }
            OutputFormat::Pretty => println!("chain {line}"),
            OutputFormat::Raw => {}
        }
    }

    pub fn finish(self) {
        if !matches!(self.format, OutputFormat::Table) || self.rows.is_empty() {
            return;
        }
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec!["KIND", "RORG", "SENDER", "DBM", "PROFILE", "FIELDS"]);
        for row in self.rows {
            table.add_row(row);
        }
        println!("{table}");
    }
}

#[derive(Serialize)]
struct EncodedOutput<'a> {
    frame: String,
    packet: PacketOutput<'a>,
}

pub fn print_encoded(packet: &Packet, wire: &[u8], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&EncodedOutput {
            frame: hex::encode_upper(wire),
            packet: PacketOutput::new(packet),
        }),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FIELD", "RAW", "VALUE"]);
            for field in &packet.fields {
                table.add_row(vec![
                    field.shortcut.clone(),
                    field.raw_value.to_string(),
                    field_value(field),
                ]);
            }
            println!("{}", hex::encode_upper(wire));
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("{}", hex::encode_upper(wire));
            println!("{}", packet_line(packet));
        }
        OutputFormat::Raw => print_raw(wire),
    }
}

#[derive(Serialize)]
struct CrcOutput {
    length: usize,
    crc: String,
}

pub fn print_crc(length: usize, crc: u8, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&CrcOutput {
            length,
            crc: format!("0x{crc:02X}"),
        }),
        OutputFormat::Raw => print_raw(&[crc]),
        OutputFormat::Table | OutputFormat::Pretty => println!("0x{crc:02X}"),
    }
}

#[derive(Serialize)]
struct ProfileSummary<'a> {
    eep: String,
    description: &'a str,
    blocks: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    commands: Vec<u8>,
}

impl<'a> ProfileSummary<'a> {
    fn new(profile: &'a Profile) -> Self {
        Self {
            eep: profile.id.to_string(),
            description: &profile.description,
            blocks: profile.blocks.len(),
            commands: profile.blocks.iter().filter_map(|b| b.command).collect(),
        }
    }
}

pub fn print_profiles<'a>(profiles: impl Iterator<Item = &'a Profile>, format: OutputFormat) {
    let summaries: Vec<ProfileSummary<'_>> = profiles.map(ProfileSummary::new).collect();
    match format {
        OutputFormat::Json | OutputFormat::Raw => {
            for summary in &summaries {
                print_json(summary);
            }
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["EEP", "BLOCKS", "COMMANDS", "DESCRIPTION"]);
            for summary in &summaries {
                table.add_row(vec![
                    summary.eep.clone(),
                    summary.blocks.to_string(),
                    join(&summary.commands),
                    summary.description.to_string(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for summary in &summaries {
                println!("{}  {}", summary.eep, summary.description);
            }
        }
    }
}

pub fn print_profile(profile: &Profile, format: OutputFormat) {
    match format {
        OutputFormat::Json | OutputFormat::Raw => print_json(profile),
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("{}  {}", profile.id, profile.description);
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec![
                    "CMD", "DIR", "FIELD", "KIND", "OFFSET", "SIZE", "UNIT", "DESCRIPTION",
                ]);
            for block in &profile.blocks {
                for field in &block.fields {
                    table.add_row(vec![
                        block.command.map(|c| c.to_string()).unwrap_or_default(),
                        block.direction.map(|d| d.to_string()).unwrap_or_default(),
                        field.shortcut.clone(),
                        kind_name(field.kind).to_string(),
                        field.offset.to_string(),
                        field.size.to_string(),
                        field.unit.clone().unwrap_or_default(),
                        field.description.clone(),
                    ]);
                }
            }
            println!("{table}");
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn packet_line(packet: &Packet) -> String {
    let mut line = packet.kind.name().to_string();
    if packet.radio().is_some() {
        line.push_str(&format!(" {}", rorg_name(packet.rorg)));
    }
    if let Some(sender) = packet.sender() {
        line.push_str(&format!(" {sender}"));
    }
    if let Some(dbm) = packet.dbm() {
        line.push_str(&format!(" {dbm}dBm"));
    }
    match &packet.kind {
        PacketKind::Response(info) => line.push_str(&format!(" {}", info.name())),
        PacketKind::Event(info) => line.push_str(&format!(" code={}", info.code)),
        PacketKind::TeachIn(info) => line.push_str(&format!(" announces {}", info.eep)),
        _ => {}
    }
    if let Some(profile) = packet.profile {
        line.push_str(&format!(" [{profile}]"));
    }
    let fields = fields_summary(&packet.fields);
    if !fields.is_empty() {
        line.push(' ');
        line.push_str(&fields);
    }
    line
}

fn fields_summary(fields: &[DecodedField]) -> String {
    fields
        .iter()
        .map(|field| format!("{}={}", field.shortcut, field_value(field)))
        .collect::<Vec<_>>()
        .join(", ")
}

fn field_value(field: &DecodedField) -> String {
    let value = match &field.value {
        FieldValue::Label(label) => return label.clone(),
        FieldValue::Flag(flag) => return flag.to_string(),
        FieldValue::Scaled(value) if value.fract() == 0.0 => format!("{value:.0}"),
        FieldValue::Scaled(value) => format!("{value:.2}"),
    };
    match &field.unit {
        Some(unit) => format!("{value} {unit}"),
        None => value,
    }
}

fn kind_name(kind: FieldKind) -> &'static str {
    match kind {
        FieldKind::Value => "value",
        FieldKind::Enum => "enum",
        FieldKind::Status => "status",
    }
}

fn join(values: &[u8]) -> String {
    values
        .iter()
        .map(u8::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use esp3_frame::{Frame, RADIO_ERP1};

    use super::*;

    #[test]
    fn field_values_render_with_units() {
        let field = DecodedField {
            shortcut: "TMP".into(),
            description: "Temperature".into(),
            unit: Some("°C".into()),
            raw_value: 0x80,
            value: FieldValue::Scaled(19.921_568),
        };
        assert_eq!(field_value(&field), "19.92 °C");

        let field = DecodedField {
            value: FieldValue::Scaled(4.0),
            unit: None,
            ..field
        };
        assert_eq!(field_value(&field), "4");
    }

    #[test]
    fn packet_output_serializes_radio_attributes() {
        let frame = Frame::new(
            RADIO_ERP1,
            vec![0xF6, 0x50, 0xFE, 0xFE, 0x8A, 0x01, 0x30],
            vec![0x01, 0xFF, 0xFF, 0xFF, 0xFF, 0x2D, 0x00],
        );
        let packet = Packet::parse(&frame);
        let json = serde_json::to_value(PacketOutput::new(&packet)).unwrap();

        assert_eq!(json["kind"], "radio");
        assert_eq!(json["rorg"], "RPS");
        assert_eq!(json["data"], "F650FEFE8A0130");
        assert_eq!(json["radio"]["sender"], "FE:FE:8A:01");
        assert_eq!(json["radio"]["dbm"], -45);
        assert!(json.get("fields").is_none());
        assert_eq!(packet_line(&packet), "radio RPS FE:FE:8A:01 -45dBm");
    }

    #[test]
    fn chain_events_are_tagged() {
        let json = serde_json::to_string(&ChainOutput::ChainOrphaned {
            sender: Address([0x04, 0x20, 0x58, 0xA5]),
            sequence: 4,
            index: 1,
        })
        .unwrap();
        assert_eq!(
            json,
            r#"{"event":"chain_orphaned","sender":"04:20:58:A5","sequence":4,"index":1}"#
        );
    }
}
