use std::fs::File;
use std::io::{BufRead, BufReader};
use std::sync::Arc;

use bytes::BytesMut;
use esp3_frame::{FrameError, FrameReader};
use esp3_packet::{DecoderConfig, PacketDecoder, PacketError};

use crate::cmd::{load_catalog, parse_binding, parse_hex, DecodeArgs};
use crate::exit::{frame_error, io_error, packet_error, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{OutputFormat, PacketPrinter};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let catalog = load_catalog(args.profiles.as_deref())?;
    let mut decoder = PacketDecoder::with_config(
        Some(Arc::new(catalog)),
        DecoderConfig {
            learn_from_teach_in: args.learn,
            ..DecoderConfig::default()
        },
    );
    for binding in &args.bind {
        let (sender, profile) = parse_binding(binding)?;
        decoder.bind(sender, profile);
    }

    let mut printer = PacketPrinter::new(format);
    let damaged = match &args.file {
        Some(path) => {
            let file = File::open(path)
                .map_err(|err| io_error(&format!("failed opening {}", path.display()), err))?;
            decode_capture(&mut decoder, file, &mut printer)?
        }
        None if args.frames.is_empty() => {
            let mut lines = Vec::new();
            for line in std::io::stdin().lock().lines() {
                lines.push(line.map_err(|err| io_error("failed reading stdin", err))?);
            }
            decode_hex(&mut decoder, &lines, &mut printer)?
        }
        None => decode_hex(&mut decoder, &args.frames, &mut printer)?,
    };
    printer.finish();

    if damaged > 0 {
        tracing::warn!(damaged, "frames dropped on checksum mismatch");
        return Ok(DATA_INVALID);
    }
    Ok(SUCCESS)
}

/// Decode hex inputs as one continuous byte stream. Returns the number of
/// frames dropped on checksum mismatch.
fn decode_hex(
    decoder: &mut PacketDecoder,
    inputs: &[String],
    printer: &mut PacketPrinter,
) -> CliResult<usize> {
    let mut buf = BytesMut::new();
    let mut damaged = 0usize;
    for input in inputs.iter().filter(|input| !input.trim().is_empty()) {
        buf.extend_from_slice(&parse_hex(input)?);
        loop {
            match decoder.decode(&mut buf) {
                Ok(Some(decoded)) => printer.print(&decoded),
                Ok(None) => break,
                Err(PacketError::Frame(FrameError::ChecksumMismatch { .. })) => damaged += 1,
                Err(err) => return Err(packet_error("decode failed", err)),
            }
        }
    }
    if !buf.is_empty() {
        tracing::warn!(remaining = buf.len(), "input ends inside a frame");
    }
    Ok(damaged)
}

fn decode_capture(
    decoder: &mut PacketDecoder,
    file: File,
    printer: &mut PacketPrinter,
) -> CliResult<usize> {
    let mut reader = FrameReader::new(BufReader::new(file));
    let mut damaged = 0usize;
    loop {
        match reader.read_frame() {
            Ok(frame) => printer.print(&decoder.decode_packet(&frame)),
            Err(FrameError::ConnectionClosed) => break,
            Err(FrameError::ChecksumMismatch { .. }) => damaged += 1,
            Err(err) => return Err(frame_error("read failed", err)),
        }
    }
    if reader.buffered() > 0 {
        tracing::warn!(remaining = reader.buffered(), "capture ends inside a frame");
    }
    Ok(damaged)
}
