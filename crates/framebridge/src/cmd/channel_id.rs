use framebridge_message::generate_channel_id;
use serde::Serialize;

use crate::cmd::ChannelIdArgs;
use crate::exit::{CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_json, print_table, OutputFormat};

const MAX_COUNT: usize = 1000;

#[derive(Serialize)]
struct ChannelIdOutput<'a> {
    prefix: &'a str,
    ids: Vec<String>,
}

pub fn run(args: ChannelIdArgs, format: OutputFormat) -> CliResult<i32> {
    let prefix = args.prefix.trim();
    if prefix.is_empty() {
        return Err(CliError::new(USAGE, "--prefix must not be empty"));
    }
    if args.count == 0 || args.count > MAX_COUNT {
        return Err(CliError::new(
            USAGE,
            format!("--count must be between 1 and {MAX_COUNT}"),
        ));
    }

    let ids: Vec<String> = (0..args.count).map(|_| generate_channel_id(prefix)).collect();

    match format {
        OutputFormat::Json => print_json(&ChannelIdOutput { prefix, ids }),
        OutputFormat::Table => print_table(
            &["#", "CHANNEL ID"],
            ids.into_iter()
                .enumerate()
                .map(|(index, id)| vec![(index + 1).to_string(), id])
                .collect(),
        ),
        OutputFormat::Pretty => {
            for id in ids {
                println!("{id}");
            }
        }
    }

    Ok(SUCCESS)
}
