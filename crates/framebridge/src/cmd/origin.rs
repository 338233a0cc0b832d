use framebridge_peer::is_valid_origin;
use framebridge_transport::{Origin, WILDCARD};
use serde::Serialize;

use crate::cmd::OriginArgs;
use crate::exit::{transport_error, CliResult, FAILURE, SUCCESS};
use crate::output::{print_json, print_pairs, print_table, OutputFormat};

#[derive(Debug, Serialize)]
struct OriginOutput {
    base: String,
    target: String,
    resolved: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    declared: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    accepted: Option<bool>,
}

pub fn run(args: OriginArgs, format: OutputFormat) -> CliResult<i32> {
    let out = evaluate(&args)?;

    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => print_table(
            &["FIELD", "VALUE"],
            pairs(&out)
                .into_iter()
                .map(|(key, value)| vec![key.to_uppercase(), value])
                .collect(),
        ),
        OutputFormat::Pretty => print_pairs("Origin", &pairs(&out)),
    }

    match out.accepted {
        Some(false) => Ok(FAILURE),
        _ => Ok(SUCCESS),
    }
}

fn evaluate(args: &OriginArgs) -> CliResult<OriginOutput> {
    let base = Origin::parse(&args.base).map_err(|err| transport_error("invalid --base", err))?;
    let resolved = match args.target.trim() {
        WILDCARD => WILDCARD.to_string(),
        target => Origin::resolve(target, &base)
            .map_err(|err| transport_error("invalid target", err))?
            .serialize(),
    };

    let accepted = args
        .check
        .as_deref()
        .map(|declared| is_valid_origin(declared, &resolved, &base));

    Ok(OriginOutput {
        base: base.serialize(),
        target: args.target.clone(),
        resolved,
        declared: args.check.clone(),
        accepted,
    })
}

fn pairs(out: &OriginOutput) -> Vec<(&'static str, String)> {
    let mut pairs = vec![
        ("base", out.base.clone()),
        ("target", out.target.clone()),
        ("resolved", out.resolved.clone()),
    ];
    if let (Some(declared), Some(accepted)) = (&out.declared, out.accepted) {
        pairs.push(("declared", declared.clone()));
        pairs.push(("accepted", accepted.to_string()));
    }
    pairs
}
