use std::fs;
use std::io::Read;

use framebridge_message::{decode_str, Message, MAX_ENCODED_LEN};

use crate::cmd::InspectArgs;
use crate::exit::{io_error, message_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_json, print_pairs, print_table, MessageSummary, OutputFormat};

pub fn run(args: InspectArgs, format: OutputFormat) -> CliResult<i32> {
    let text = read_input(&args)?;
    let message = parse(&text)?;
    let summary = MessageSummary::from(&message);
    tracing::debug!(kind = summary.kind, channel_id = %summary.channel_id, "message decoded");

    match format {
        OutputFormat::Json => print_json(&summary),
        OutputFormat::Table => print_table(
            &["FIELD", "VALUE"],
            summary
                .fields()
                .into_iter()
                .map(|(key, value)| vec![key.to_string(), value])
                .collect(),
        ),
        OutputFormat::Pretty => print_pairs("Message", &summary.fields()),
    }

    Ok(SUCCESS)
}

fn parse(text: &str) -> CliResult<Message> {
    let text = text.trim();
    if text.is_empty() {
        return Err(CliError::new(DATA_INVALID, "no message given"));
    }
    decode_str(text).map_err(|err| message_error("malformed message", err))
}

fn read_input(args: &InspectArgs) -> CliResult<String> {
    if let Some(json) = &args.json {
        return Ok(json.clone());
    }
    if let Some(path) = &args.file {
        return fs::read_to_string(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
    }

    // One byte past the limit so an oversized message still fails decoding.
    let mut text = String::new();
    std::io::stdin()
        .lock()
        .take(MAX_ENCODED_LEN as u64 + 1)
        .read_to_string(&mut text)
        .map_err(|err| io_error("failed reading stdin", err))?;
    Ok(text)
}
