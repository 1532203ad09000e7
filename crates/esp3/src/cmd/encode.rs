use esp3_eep::ProfileId;
use esp3_packet::rorg::MSC;
use esp3_packet::{MscBuilder, Packet, RadioBuilder};

use crate::cmd::{load_catalog, parse_assignment, EncodeArgs};
use crate::exit::{packet_error, CliError, CliResult, SUCCESS};
use crate::output::{print_encoded, OutputFormat};

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let catalog = load_catalog(args.profiles.as_deref())?;
    let values = args
        .set
        .iter()
        .map(|input| parse_assignment(input))
        .collect::<CliResult<Vec<_>>>()?;

    let packet = if args.eep.rorg > 0xFF {
        build_msc(&args, &catalog, values)?
    } else {
        let rorg = u8::try_from(args.eep.rorg)
            .map_err(|_| CliError::usage(format!("invalid profile {}", args.eep)))?;
        let mut builder =
            RadioBuilder::new(&catalog, rorg, args.eep.func, args.eep.type_).learn(args.learn);
        if let Some(sender) = args.sender {
            builder = builder.sender(sender);
        }
        if let Some(destination) = args.destination {
            builder = builder.destination(destination);
        }
        if let Some(command) = args.command {
            builder = builder.command(command);
        }
        if let Some(direction) = args.direction {
            builder = builder.direction(direction);
        }
        for (shortcut, value) in values {
            builder = builder.value(&shortcut, value);
        }
        builder
            .build()
            .map_err(|err| packet_error("encode failed", err))?
    };

    let wire = packet
        .to_bytes()
        .map_err(|err| packet_error("encode failed", err))?;
    print_encoded(&packet, &wire, format);
    Ok(SUCCESS)
}

fn build_msc(
    args: &EncodeArgs,
    catalog: &esp3_eep::ProfileRegistry,
    values: Vec<(String, esp3_eep::FieldInput)>,
) -> CliResult<Packet> {
    let ProfileId { rorg, func, type_ } = args.eep;
    if rorg >> 12 != u32::from(MSC) {
        return Err(CliError::usage(format!("invalid profile {}", args.eep)));
    }
    let command = args
        .command
        .ok_or_else(|| CliError::usage("--command is required for manufacturer profiles"))?;
    let sender = args
        .sender
        .ok_or_else(|| CliError::usage("--sender is required for manufacturer profiles"))?;

    let mut builder = MscBuilder::new((rorg & 0xFFF) as u16, command)
        .sender(sender)
        .profile(catalog, func, type_);
    if let Some(destination) = args.destination {
        builder = builder.destination(destination);
    }
    for (shortcut, value) in values {
        builder = builder.value(&shortcut, value);
    }
    builder
        .build()
        .map_err(|err| packet_error("encode failed", err))
}
