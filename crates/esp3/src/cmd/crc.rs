use esp3_frame::crc8;

use crate::cmd::{parse_hex, CrcArgs};
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_crc, OutputFormat};

pub fn run(args: CrcArgs, format: OutputFormat) -> CliResult<i32> {
    let data = parse_hex(&args.data)?;
    print_crc(data.len(), crc8(&data), format);
    Ok(SUCCESS)
}
