use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("framebridge {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: framebridge");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("FRAMEBRIDGE_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("git_hash: {}", option_env!("GIT_HASH").unwrap_or("unknown"));
    println!(
        "features: peer={}, schema={}, cli=true",
        cfg!(feature = "peer"),
        cfg!(feature = "schema"),
    );
    println!(
        "wire: max_message_bytes={}, default_request_timeout_ms={}",
        framebridge_message::MAX_ENCODED_LEN,
        framebridge_peer::DEFAULT_REQUEST_TIMEOUT.as_millis()
    );

    Ok(SUCCESS)
}
