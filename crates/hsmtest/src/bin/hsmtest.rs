// Copyright 2021-2024 SecureDNA Stiftung (SecureDNA Foundation) <licensing@securedna.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

use clap::{CommandFactory, FromArgMatches};
use tracing::{error, Level};
use tracing_subscriber::FmtSubscriber;

use hsmtest::Arguments;

#[tokio::main]
async fn main() -> ! {
    let cmd = Arguments::command();
    let after_help = format!(
        "{}Examples:{}
# draw 1024 random bytes from the HSM
hsmtest --access-token \"$(gcloud auth print-access-token)\" \\
    projects/my-project/locations/us-east1 rand-reader

# generate an ECDSA P-256 key and print its public key
hsmtest projects/my-project/locations/us-east1 \\
    generate-ecdsa --key-ring hsm-test ecdsa-1

# sign a file with version 1 of that key, one-line output
hsmtest -z projects/my-project/locations/us-east1 \\
    sign --key-ring hsm-test ecdsa-1 --message-file ./payload.bin
",
        cmd.get_styles().get_header().render(),
        cmd.get_styles().get_header().render_reset()
    );
    let mut cmd = cmd.after_help(after_help);
    cmd.build();

    let mut matches = cmd.get_matches();
    let args = match Arguments::from_arg_matches_mut(&mut matches) {
        Ok(args) => args,
        Err(e) => {
            let e = e.format(&mut Arguments::command());
            e.exit();
        }
    };

    let subscriber = FmtSubscriber::builder()
        .with_writer(std::io::stdout)
        .with_max_level(match (args.quiet, args.verbose) {
            (true, _) => Level::WARN,
            (false, 0) => Level::INFO,
            (false, 1) => Level::DEBUG,
            (false, _) => Level::TRACE,
        })
        .finish();
    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("hsmtest: setting up logging: {err}");
        std::process::exit(2);
    }

    let config = match args.build_config() {
        Ok(config) => config,
        Err(err) => {
            error!("{err:#}");
            std::process::exit(2);
        }
    };

    if let Err(err) = hsmtest::operations::run(&config).await {
        error!("{err:#}");
        std::process::exit(1);
    } else {
        std::process::exit(0);
    }
}
